//! Session-aware HTTP client for the ruffed certificate console.
//!
//! The client owns one authenticated session at a time. Session tokens
//! live in HttpOnly cookies inside the client's cookie jar; only the
//! last-known user is kept client-side (see [`ruffed_session`]).
//!
//! # Example
//!
//! ```no_run
//! use ruffed_client::{ActivityEvent, LoginCredentials, RuffedClient, Result};
//!
//! # async fn example() -> Result<()> {
//! let client = RuffedClient::builder()
//!     .base_url("http://localhost:5000/api/v1")
//!     .log_errors_to_server(true)
//!     .build()?;
//!
//! let user = client
//!     .auth()
//!     .login(&LoginCredentials::new("admin", "secret"))
//!     .await?;
//! println!("Logged in as {}", user.display_name());
//!
//! // Any user interaction keeps the session alive.
//! client.record_activity(ActivityEvent::KeyPress);
//!
//! // Mutations carry a fresh CSRF token; a 401 triggers one silent refresh.
//! let created: serde_json::Value = client
//!     .post("certificates", &serde_json::json!({ "commonName": "example.com" }))
//!     .await?;
//! println!("{}", created);
//!
//! client.auth().logout().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Components
//!
//! - **Auth**: login, logout, silent refresh, registration, SSO
//! - **CSRF**: anti-forgery token fetched before every mutation
//! - **Interceptor**: single shared refresh for concurrent 401s, one replay
//! - **Idle timer**: forced logout after a window without activity
//! - **Error log**: bounded record of failures, optionally sent to the server
//! - **Guard**: access decisions for protected views

pub mod api;
pub mod client;
pub mod csrf;
pub mod error;
pub mod error_log;
pub mod guard;
pub mod idle;
pub mod interceptor;
pub mod sso;
pub mod types;

pub use api::AuthApi;
pub use client::{ClientBuilder, RuffedClient};
pub use csrf::{CSRF_HEADER, CsrfTokenProvider};
pub use error::{Error, Result};
pub use error_log::{ErrorEvent, ErrorLog};
pub use guard::{Access, check_access};
pub use idle::{ActivityEvent, DEFAULT_IDLE_TIMEOUT, IdleTimer};
pub use interceptor::{RefreshCoordinator, RefreshState, is_mutating};
pub use types::*;

pub use ruffed_session::{LogoutReason, SessionEvent, UserInfo};
