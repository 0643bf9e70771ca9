//! Request interception: CSRF header injection and 401 recovery.
//!
//! A 401 moves the client from [`RefreshState::Idle`] to
//! [`RefreshState::Refreshing`]. The first failing request starts the
//! refresh; every request that fails while it runs awaits the same
//! in-flight future instead of starting another one. Each waiting request
//! is replayed once the refresh resolves.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use reqwest::Method;
use reqwest::header::HeaderValue;

use crate::csrf::CSRF_HEADER;

/// Outcome shared by every request waiting on a refresh.
pub type RefreshOutcome = std::result::Result<(), String>;

type InFlight = Shared<BoxFuture<'static, RefreshOutcome>>;

/// Observable interceptor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Refreshing,
}

/// Methods that change server state and therefore carry a CSRF token.
pub fn is_mutating(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::DELETE | Method::PATCH
    )
}

/// Attach `token` to a mutating request unless it already has the header.
pub(crate) fn attach_csrf(request: &mut reqwest::Request, token: Option<&str>) {
    if !is_mutating(request.method()) || request.headers().contains_key(CSRF_HEADER) {
        return;
    }
    if let Some(token) = token
        && let Ok(value) = HeaderValue::from_str(token)
    {
        request.headers_mut().insert(CSRF_HEADER, value);
    }
}

/// Single-slot cache for the in-flight session refresh.
#[derive(Default)]
pub struct RefreshCoordinator {
    slot: Arc<Mutex<Option<InFlight>>>,
    started: AtomicU64,
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("state", &self.state())
            .field("started", &self.refresh_count())
            .finish()
    }
}

impl RefreshCoordinator {
    /// Create a coordinator with no refresh in flight.
    pub fn new() -> Self {
        Self::default()
    }

    /// `Refreshing` while a refresh task holds the slot.
    pub fn state(&self) -> RefreshState {
        if self.slot.lock().is_some() {
            RefreshState::Refreshing
        } else {
            RefreshState::Idle
        }
    }

    /// Number of refreshes actually started.
    pub fn refresh_count(&self) -> u64 {
        self.started.load(Ordering::SeqCst)
    }

    /// Await the in-flight refresh, starting one with `start` if none runs.
    ///
    /// `start` is only invoked by the caller that finds the slot empty. The
    /// refresh runs on its own task and clears the slot when it resolves, so
    /// it completes even if every waiter is cancelled.
    pub async fn run<F, Fut>(&self, start: F) -> RefreshOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RefreshOutcome> + Send + 'static,
    {
        let in_flight = {
            let mut slot = self.slot.lock();
            match slot.as_ref() {
                Some(existing) => {
                    tracing::debug!("Waiting on in-flight session refresh");
                    existing.clone()
                }
                None => {
                    self.started.fetch_add(1, Ordering::SeqCst);
                    let refresh = start();
                    let slot_handle = Arc::clone(&self.slot);
                    // The slot lock is held until `slot` is set below, so the
                    // task cannot clear it before it is filled.
                    let task = tokio::spawn(async move {
                        let outcome = refresh.await;
                        slot_handle.lock().take();
                        outcome
                    });
                    let shared = async move {
                        match task.await {
                            Ok(outcome) => outcome,
                            Err(e) => Err(format!("session refresh task failed: {}", e)),
                        }
                    }
                    .boxed()
                    .shared();
                    *slot = Some(shared.clone());
                    shared
                }
            }
        };

        in_flight.await
    }
}
