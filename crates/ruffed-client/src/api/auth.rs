//! Authentication API.

use reqwest::Method;
use ruffed_session::{LogoutReason, SessionEvent, UserInfo};

use crate::client::{RuffedClient, read_error};
use crate::csrf::CSRF_HEADER;
use crate::error::{Error, Result};
use crate::sso;
use crate::types::{
    AuthResponse, LoginCredentials, RefreshResponse, RegisterRequest, SsoCallbackRequest,
    SsoProviderConfig, SsoRedirect,
};

const LOGIN_PATH: &str = "auth/login";
const LOGOUT_PATH: &str = "auth/logout";
const REFRESH_PATH: &str = "auth/refresh";
const REGISTER_PATH: &str = "auth/register";
const ME_PATH: &str = "auth/me";
const SSO_CALLBACK_PATH: &str = "auth/sso/callback";

const INVALID_CREDENTIALS: &str = "Invalid username or password";
const SSO_FAILED: &str = "SSO authentication failed";

/// Session lifecycle: login, logout, silent refresh and SSO.
///
/// Every endpoint here is sent around the interceptor, so a 401 from an
/// auth call is reported as-is and never starts a refresh.
pub struct AuthApi {
    client: RuffedClient,
}

impl AuthApi {
    pub(crate) fn new(client: RuffedClient) -> Self {
        Self { client }
    }

    /// Log in with username and password.
    ///
    /// On success the session cookies are kept in the client's jar, the
    /// returned user is stored and published, and the idle timer is armed.
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<UserInfo> {
        let token = self.client.get_csrf_token().await?;
        let request = self
            .client
            .request(Method::POST, LOGIN_PATH)?
            .header(CSRF_HEADER, token)
            .json(credentials);

        let response = self.client.send_raw(request).await?;
        if !response.status().is_success() {
            let (status, _, message) = read_error(response).await;
            tracing::warn!(status, username = %credentials.username, "Login rejected");
            return Err(Error::client(
                message.unwrap_or_else(|| INVALID_CREDENTIALS.to_string()),
            ));
        }

        let body: AuthResponse = response.json().await?;
        self.start_session(body.user)
    }

    /// Log out at the user's request.
    pub async fn logout(&self) {
        self.end_session(LogoutReason::UserRequested).await;
    }

    /// Tear down the session. The server is told best-effort; local state is
    /// always cleared.
    pub(crate) async fn end_session(&self, reason: LogoutReason) {
        let inner = self.client.inner();
        inner.idle.stop();

        if let Err(e) = self.notify_logout().await {
            tracing::warn!(error = %e, "Server logout failed");
        }

        inner.csrf.clear();
        inner.pending_sso_state.lock().take();
        inner.session.end(reason);
    }

    async fn notify_logout(&self) -> Result<()> {
        let token = self.client.get_csrf_token().await?;
        let request = self
            .client
            .request(Method::POST, LOGOUT_PATH)?
            .header(CSRF_HEADER, token);
        let response = self.client.send_raw(request).await?;
        if !response.status().is_success() {
            return Err(self.client.extract_error(response).await);
        }
        Ok(())
    }

    /// Exchange the refresh cookie for a new session.
    ///
    /// Returns false when the server refuses; the session has then been
    /// ended with [`LogoutReason::RefreshFailed`].
    pub async fn silent_refresh(&self) -> bool {
        match self.try_refresh().await {
            Ok(()) => {
                tracing::info!("Session refreshed");
                self.client.session().emit(SessionEvent::Refreshed);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Session refresh failed");
                self.end_session(LogoutReason::RefreshFailed).await;
                false
            }
        }
    }

    async fn try_refresh(&self) -> Result<()> {
        let request = self.client.request(Method::POST, REFRESH_PATH)?;
        let response = self.client.send_raw(request).await?;
        if !response.status().is_success() {
            return Err(self.client.extract_error(response).await);
        }

        // The body is optional; anything unparsable counts as "no user".
        let body = response.bytes().await?;
        let refreshed: RefreshResponse = serde_json::from_slice(&body).unwrap_or_default();
        if let Some(user) = refreshed.user
            && let Err(e) = self.client.session().update_user(user)
        {
            tracing::warn!(error = %e, "Failed to store refreshed user");
        }
        Ok(())
    }

    /// Create an account. Does not log in.
    pub async fn register(&self, request: &RegisterRequest) -> Result<()> {
        let token = self.client.get_csrf_token().await?;
        let builder = self
            .client
            .request(Method::POST, REGISTER_PATH)?
            .header(CSRF_HEADER, token)
            .json(request);

        let response = self.client.send_raw(builder).await?;
        if !response.status().is_success() {
            return Err(self.client.extract_error(response).await);
        }
        tracing::info!(username = %request.username, "Account registered");
        Ok(())
    }

    /// Fetch the provider settings and build the authorization URL.
    ///
    /// The generated state is remembered and checked by
    /// [`handle_sso_callback`](Self::handle_sso_callback).
    pub async fn initiate_sso_login(&self, provider: &str) -> Result<SsoRedirect> {
        let config = self.sso_config(provider).await?;
        let state = sso::generate_state();
        let url = sso::build_authorization_url(&config, &state);

        *self.client.inner().pending_sso_state.lock() = Some(state.clone());
        tracing::debug!(provider, "SSO login initiated");
        Ok(SsoRedirect { url, state })
    }

    /// `GET /auth/sso/{provider}/config`.
    pub async fn sso_config(&self, provider: &str) -> Result<SsoProviderConfig> {
        let path = format!("auth/sso/{}/config", urlencoding::encode(provider));
        let request = self.client.request(Method::GET, &path)?;
        let response = self.client.send_raw(request).await?;
        if !response.status().is_success() {
            return Err(self.client.extract_error(response).await);
        }
        Ok(response.json().await?)
    }

    /// Complete an SSO login with the code and state from the provider.
    pub async fn handle_sso_callback(&self, code: &str, state: &str) -> Result<UserInfo> {
        {
            // A mismatched callback leaves the pending state in place for
            // the genuine one.
            let mut pending = self.client.inner().pending_sso_state.lock();
            if let Some(expected) = pending.as_deref()
                && expected != state
            {
                tracing::warn!("SSO state mismatch");
                return Err(Error::client("SSO state mismatch"));
            }
            pending.take();
        }

        match self.exchange_sso_code(code, state).await {
            Ok(user) => self.start_session(user),
            Err(e) => {
                tracing::warn!(error = %e, "SSO callback failed");
                Err(Error::client(SSO_FAILED))
            }
        }
    }

    async fn exchange_sso_code(&self, code: &str, state: &str) -> Result<UserInfo> {
        let token = self.client.get_csrf_token().await?;
        let request = self
            .client
            .request(Method::POST, SSO_CALLBACK_PATH)?
            .header(CSRF_HEADER, token)
            .json(&SsoCallbackRequest { code, state });

        let response = self.client.send_raw(request).await?;
        if !response.status().is_success() {
            return Err(self.client.extract_error(response).await);
        }
        let body: AuthResponse = response.json().await?;
        Ok(body.user)
    }

    /// `GET /auth/me` through the interceptor; refreshes the stored user.
    pub async fn fetch_current_user(&self) -> Result<UserInfo> {
        let user: UserInfo = self.client.get(ME_PATH).await?;
        self.client.session().update_user(user.clone())?;
        Ok(user)
    }

    /// Resume a session persisted by an earlier run. Returns the user when
    /// one was found; it is then published and the idle timer is armed.
    ///
    /// Must be awaited inside a tokio runtime, which drives the idle timer.
    pub async fn restore(&self) -> Option<UserInfo> {
        let session = self.client.session();
        let user = session.store().get_user()?;
        session.resume(user.clone());
        self.client.arm_idle_timer();
        tracing::info!(user = %user.username, "Session restored");
        Some(user)
    }

    fn start_session(&self, user: UserInfo) -> Result<UserInfo> {
        self.client.session().begin(user.clone())?;
        self.client.arm_idle_timer();
        Ok(user)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads over the current session
    // ─────────────────────────────────────────────────────────────────────────

    pub fn current_user(&self) -> Option<UserInfo> {
        self.client.session().current_user()
    }

    pub fn is_logged_in(&self) -> bool {
        self.client.session().is_logged_in()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.client.session().has_role(role)
    }

    /// `resource:action` check; admins hold every permission.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.client.session().has_permission(permission)
    }
}
