//! Client error types.

use thiserror::Error;

/// Client error type.
///
/// Every failure is one of a closed set of kinds; callers match on the
/// variant instead of inspecting the source error.
#[derive(Debug, Error)]
pub enum Error {
    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Request URL.
        url: String,
        /// Server-supplied message, or a generic one.
        message: String,
    },

    /// A user-facing failure detected or normalized client-side.
    #[error("{message}")]
    Client { message: String },

    /// The session could not be refreshed; the user has been logged out.
    #[error("Session expired: {0}")]
    SessionExpired(String),

    /// HTTP request failed before a response arrived.
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session marker persistence failed.
    #[error(transparent)]
    Session(#[from] ruffed_session::Error),
}

impl Error {
    pub(crate) fn client(message: impl Into<String>) -> Self {
        Error::Client {
            message: message.into(),
        }
    }

    /// HTTP status, when the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Http { status, .. } => Some(*status),
            Error::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Check if the server rejected the request as unauthenticated.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Check if the session ended because refresh failed.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Error::SessionExpired(_))
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Check if this is a server error.
    pub fn is_server_error(&self) -> bool {
        self.status().is_some_and(|s| s >= 500)
    }

    /// Message suitable for a notification shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            Error::Http { message, .. } | Error::Client { message } => message.clone(),
            Error::SessionExpired(_) => "Your session has expired. Please log in again.".to_string(),
            Error::Transport(_) => "Unable to reach the server. Please try again.".to_string(),
            other => other.to_string(),
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error body returned by the backend:
/// `{ "status": "error", "message": "...", "code": 401 }`.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct ErrorResponse {
    #[serde(default)]
    pub message: Option<String>,
}
