//! Request and response types for the auth API.
//!
//! These types mirror the backend's JSON contract (camelCase).

use ruffed_session::UserInfo;
use serde::{Deserialize, Serialize};

/// Username/password pair for `POST /auth/login`.
#[derive(Clone, Serialize)]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
}

impl LoginCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Account creation request for `POST /auth/register`.
#[derive(Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Successful login or SSO exchange.
///
/// Session tokens arrive as HttpOnly cookies; only the user is read.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub user: UserInfo,
}

/// Successful `POST /auth/refresh`. Servers may echo the user back.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefreshResponse {
    #[serde(default)]
    pub user: Option<UserInfo>,
}

/// `GET /auth/csrf-token` body.
#[derive(Debug, Clone, Deserialize)]
pub struct CsrfTokenResponse {
    pub token: String,
}

/// `POST /auth/sso/callback` body.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct SsoCallbackRequest<'a> {
    pub code: &'a str,
    pub state: &'a str,
}

/// Identity provider settings from `GET /auth/sso/{provider}/config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SsoProviderConfig {
    pub provider: String,
    pub client_id: String,
    pub auth_endpoint: String,
    #[serde(default)]
    pub token_endpoint: String,
    #[serde(default)]
    pub user_info_endpoint: String,
    pub redirect_uri: String,
    pub scope: String,
    #[serde(default = "default_response_type")]
    pub response_type: String,
}

fn default_response_type() -> String {
    "code".to_string()
}

/// Where to send the browser to start an SSO login.
#[derive(Debug, Clone)]
pub struct SsoRedirect {
    /// Fully built authorization URL.
    pub url: String,
    /// Anti-forgery state embedded in `url`.
    pub state: String,
}
