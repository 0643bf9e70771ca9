//! Anti-forgery token cache.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use reqwest::Method;

use crate::client::RuffedClient;
use crate::error::Result;
use crate::types::CsrfTokenResponse;

/// Header carrying the anti-forgery token on mutating requests.
pub const CSRF_HEADER: &str = "X-CSRF-TOKEN";

pub(crate) const CSRF_PATH: &str = "auth/csrf-token";

/// Holds the most recently fetched CSRF token.
///
/// No expiry is tracked: callers fetch a fresh token immediately before
/// each mutating call, and the cached value only backs requests that did
/// not set the header themselves.
#[derive(Debug, Default)]
pub struct CsrfTokenProvider {
    token: RwLock<Option<String>>,
    fetches: AtomicU64,
}

impl CsrfTokenProvider {
    /// Create a provider with no token cached.
    pub fn new() -> Self {
        Self::default()
    }

    /// `GET /auth/csrf-token`, cache the result and return it.
    ///
    /// Failures propagate unchanged; there is no retry.
    pub async fn get_csrf_token(&self, client: &RuffedClient) -> Result<String> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let request = client.request(Method::GET, CSRF_PATH)?;
        let response = client.send_raw(request).await?;
        if !response.status().is_success() {
            return Err(client.extract_error(response).await);
        }

        let body: CsrfTokenResponse = response.json().await?;
        *self.token.write() = Some(body.token.clone());
        tracing::debug!("CSRF token refreshed");
        Ok(body.token)
    }

    /// The last fetched token, if any.
    pub fn cached(&self) -> Option<String> {
        self.token.read().clone()
    }

    /// Forget the cached token (on logout).
    pub fn clear(&self) {
        *self.token.write() = None;
    }

    /// Number of token fetches issued so far.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::SeqCst)
    }
}
