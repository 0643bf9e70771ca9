//! Error types for session persistence.

/// Error type for session store operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The backing storage could not be read or written.
    #[error("Session storage error at '{path}': {source}")]
    Storage {
        path: String,
        source: std::io::Error,
    },

    /// The session marker could not be serialized.
    #[error("Session serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for session store operations.
pub type Result<T> = std::result::Result<T, Error>;
