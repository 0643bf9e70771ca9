//! Access decisions for protected views.

use ruffed_session::SessionContext;

/// Outcome of [`check_access`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Granted,
    /// Not logged in; come back to `return_url` after logging in.
    Login { return_url: String },
    /// Logged in but holding none of the required roles.
    Unauthorized,
}

impl Access {
    pub fn is_granted(&self) -> bool {
        matches!(self, Access::Granted)
    }
}

/// Any one of `required_roles` is enough. An empty list only requires a
/// session.
pub fn check_access(
    session: &SessionContext,
    required_roles: &[&str],
    attempted_url: &str,
) -> Access {
    if !session.is_logged_in() {
        return Access::Login {
            return_url: attempted_url.to_string(),
        };
    }

    if !required_roles.is_empty() && !required_roles.iter().any(|r| session.has_role(r)) {
        tracing::debug!(url = attempted_url, ?required_roles, "Missing required role");
        return Access::Unauthorized;
    }

    Access::Granted
}
