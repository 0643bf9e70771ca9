//! Redirect-based single sign-on helpers.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;

use crate::types::SsoProviderConfig;

/// Generate a random state string for CSRF protection of the redirect.
pub fn generate_state() -> String {
    let mut state_bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut state_bytes);
    URL_SAFE_NO_PAD.encode(state_bytes)
}

/// Build the identity provider's authorization URL.
pub fn build_authorization_url(config: &SsoProviderConfig, state: &str) -> String {
    let params = [
        ("client_id", config.client_id.as_str()),
        ("redirect_uri", config.redirect_uri.as_str()),
        ("response_type", config.response_type.as_str()),
        ("scope", config.scope.as_str()),
        ("state", state),
    ];

    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    let separator = if config.auth_endpoint.contains('?') {
        '&'
    } else {
        '?'
    };
    format!("{}{}{}", config.auth_endpoint, separator, query)
}
