//! Session marker persistence and session context.
//!
//! Authentication tokens live in server-set HttpOnly cookies, so the only
//! thing persisted client-side is the last-known user. This crate provides:
//! - [`UserInfo`] with role and permission checks
//! - [`SessionStore`] with file-backed and in-memory implementations
//! - [`SessionContext`], the owned holder of the current user and the
//!   session lifecycle event stream
//!
//! # Example
//!
//! ```rust,ignore
//! use ruffed_session::{FileSessionStore, SessionContext};
//!
//! let store = FileSessionStore::new(&data_dir);
//! let store = Arc::new(store);
//! let context = SessionContext::new(store.clone());
//! if let Some(user) = store.get_user() {
//!     context.resume(user);
//! }
//! ```

mod context;
mod error;
mod store;
mod user;

pub use context::{LogoutReason, SessionContext, SessionEvent};
pub use error::{Error, Result};
pub use store::{
    FileSessionStore, InMemorySessionStore, SessionStore, SharedSessionStore, USER_KEY,
};
pub use user::{ADMIN_ROLE, UserInfo};
