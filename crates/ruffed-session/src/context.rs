//! Owned session context: current user plus lifecycle events.

use tokio::sync::{broadcast, watch};

use crate::error::Result;
use crate::store::SharedSessionStore;
use crate::user::UserInfo;

/// Buffered lifecycle events per subscriber before lagging.
const EVENT_CAPACITY: usize = 32;

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    /// The user asked to log out.
    UserRequested,
    /// No qualifying activity within the idle window.
    IdleTimeout,
    /// The server refused to refresh the session.
    RefreshFailed,
}

impl std::fmt::Display for LogoutReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogoutReason::UserRequested => write!(f, "logged out"),
            LogoutReason::IdleTimeout => write!(f, "logged out after inactivity"),
            LogoutReason::RefreshFailed => write!(f, "session expired"),
        }
    }
}

/// Session lifecycle notifications.
///
/// The embedding UI reacts to these, e.g. by showing the login screen on
/// [`SessionEvent::LoggedOut`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn(UserInfo),
    Refreshed,
    LoggedOut { reason: LogoutReason },
}

/// Holder of the authenticated user for one client.
///
/// Starts empty when the client is built; a stored user only becomes current
/// through [`begin`](Self::begin) or [`resume`](Self::resume). Reads never
/// touch the store.
#[derive(Debug)]
pub struct SessionContext {
    store: SharedSessionStore,
    current: watch::Sender<Option<UserInfo>>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionContext {
    /// Create an empty context backed by `store`.
    pub fn new(store: SharedSessionStore) -> Self {
        let (current, _) = watch::channel(None);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            current,
            events,
        }
    }

    pub fn store(&self) -> &SharedSessionStore {
        &self.store
    }

    /// Start a session for `user`: persist, publish, announce.
    pub fn begin(&self, user: UserInfo) -> Result<()> {
        self.store.set_user(&user)?;
        tracing::info!(user = %user.username, "Session started");
        self.current.send_replace(Some(user.clone()));
        self.emit(SessionEvent::LoggedIn(user));
        Ok(())
    }

    /// Publish a user persisted by an earlier run. Nothing is written and no
    /// login is announced.
    pub fn resume(&self, user: UserInfo) {
        self.current.send_replace(Some(user));
    }

    /// Replace the user of a running session without announcing a login.
    pub fn update_user(&self, user: UserInfo) -> Result<()> {
        self.store.set_user(&user)?;
        self.current.send_replace(Some(user));
        Ok(())
    }

    /// End the session. Storage failures are logged, never returned.
    pub fn end(&self, reason: LogoutReason) {
        if let Err(e) = self.store.clear_user_data() {
            tracing::warn!(error = %e, "Failed to clear stored session");
        }
        let previous = self.current.send_replace(None);
        tracing::info!(
            user = previous.as_ref().map(|u| u.username.as_str()).unwrap_or("-"),
            %reason,
            "Session ended"
        );
        self.emit(SessionEvent::LoggedOut { reason });
    }

    /// Broadcast an event; having no subscribers is not an error.
    pub fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    pub fn current_user(&self) -> Option<UserInfo> {
        self.current.borrow().clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.current.borrow().is_some()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.current
            .borrow()
            .as_ref()
            .is_some_and(|u| u.has_role(role))
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.current
            .borrow()
            .as_ref()
            .is_some_and(|u| u.has_permission(permission))
    }

    /// Watch the current user (the latest value is always available).
    pub fn subscribe_user(&self) -> watch::Receiver<Option<UserInfo>> {
        self.current.subscribe()
    }

    /// Receive lifecycle events emitted after this call.
    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}
