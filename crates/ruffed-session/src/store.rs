//! Persistence for the session marker.
//!
//! Only the user is stored; session tokens never leave the server-set
//! HttpOnly cookies.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::user::UserInfo;

/// Storage key for the serialized user. File stores use `<key>.json`.
pub const USER_KEY: &str = "user_info";

// ============================================================================
// SessionStore Trait
// ============================================================================

/// Persistence wrapper for the last-known authenticated user.
pub trait SessionStore: Send + Sync + std::fmt::Debug {
    /// Persist the user, replacing any previous value.
    fn set_user(&self, user: &UserInfo) -> Result<()>;

    /// Load the stored user, if any.
    fn get_user(&self) -> Option<UserInfo>;

    /// Remove the stored user.
    fn clear_user_data(&self) -> Result<()>;
}

/// Shared session store for use across async contexts.
pub type SharedSessionStore = Arc<dyn SessionStore>;

// ============================================================================
// FileSessionStore
// ============================================================================

/// File-backed store with an in-memory cache in front of it.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    cached: RwLock<Option<UserInfo>>,
}

impl FileSessionStore {
    /// Store the user under `data_dir/user_info.json`.
    pub fn new(data_dir: &Path) -> Self {
        Self::with_path(data_dir.join(format!("{}.json", USER_KEY)))
    }

    /// Create with a custom file path.
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path,
            cached: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(&self) -> Option<UserInfo> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read session file");
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Discarding unreadable session file"
                );
                if let Err(e) = std::fs::remove_file(&self.path) {
                    tracing::warn!(error = %e, "Failed to remove unreadable session file");
                }
                None
            }
        }
    }
}

impl SessionStore for FileSessionStore {
    fn set_user(&self, user: &UserInfo) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::Storage {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let json = serde_json::to_string_pretty(user)?;
        std::fs::write(&self.path, json).map_err(|e| Error::Storage {
            path: self.path.display().to_string(),
            source: e,
        })?;

        *self.cached.write() = Some(user.clone());
        tracing::debug!(user = %user.username, "Session marker saved to {}", self.path.display());
        Ok(())
    }

    fn get_user(&self) -> Option<UserInfo> {
        {
            let cache = self.cached.read();
            if cache.is_some() {
                return cache.clone();
            }
        }

        let user = self.read_file()?;
        *self.cached.write() = Some(user.clone());
        Some(user)
    }

    fn clear_user_data(&self) -> Result<()> {
        *self.cached.write() = None;
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Storage {
                path: self.path.display().to_string(),
                source: e,
            }),
        }
    }
}

// ============================================================================
// InMemorySessionStore
// ============================================================================

/// In-memory store for tests and sessions that must not touch disk.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    user: RwLock<Option<UserInfo>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(user: UserInfo) -> Self {
        Self {
            user: RwLock::new(Some(user)),
        }
    }
}

impl SessionStore for InMemorySessionStore {
    fn set_user(&self, user: &UserInfo) -> Result<()> {
        *self.user.write() = Some(user.clone());
        Ok(())
    }

    fn get_user(&self) -> Option<UserInfo> {
        self.user.read().clone()
    }

    fn clear_user_data(&self) -> Result<()> {
        *self.user.write() = None;
        Ok(())
    }
}
