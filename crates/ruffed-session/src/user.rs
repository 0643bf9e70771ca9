//! The session marker: the last-known authenticated user.

use serde::{Deserialize, Serialize};

/// Role that grants every permission.
pub const ADMIN_ROLE: &str = "admin";

/// Authenticated user as returned by the backend.
///
/// Serialized in the backend's camelCase wire format so the stored value
/// is byte-compatible with what the server sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl UserInfo {
    /// Create an active user with no roles.
    pub fn new(id: i64, username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            email: email.into(),
            roles: Vec::new(),
            first_name: None,
            last_name: None,
            active: true,
        }
    }

    /// Builder-style role assignment.
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ADMIN_ROLE)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Check a `resource:action` permission.
    ///
    /// Admins hold every permission. Otherwise a role grants the permission
    /// when it equals the permission string, is `resource:*`, or is the bare
    /// `resource` name.
    pub fn has_permission(&self, permission: &str) -> bool {
        if self.is_admin() {
            return true;
        }

        let resource = permission
            .split_once(':')
            .map(|(resource, _)| resource)
            .unwrap_or(permission);

        self.roles.iter().any(|role| {
            role == permission
                || role == resource
                || role
                    .strip_suffix(":*")
                    .is_some_and(|prefix| prefix == resource)
        })
    }

    /// Name for display: "First Last" when known, otherwise the username.
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(first), None) => first.clone(),
            _ => self.username.clone(),
        }
    }
}
