//! Login exchange and the user claims kept in the session.

use serde::{Deserialize, Serialize};

/// Role carried in the user claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Manages fighters and bouts.
    Admin,
    /// Runs and scores bouts.
    Judge,
    /// Read access to the dashboard.
    Supervisor,
    /// Any other role string, or none at all.
    #[default]
    #[serde(other)]
    Unprivileged,
}

/// Credentials posted to the login endpoint.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    /// Account name.
    pub username: &'a str,
    /// Plain-text password, sent over TLS.
    pub password: &'a str,
}

/// Login response: token plus flattened claims.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginResponse {
    /// Bearer token; a response without one is rejected.
    pub token: Option<String>,
    /// User id.
    pub id: Option<i64>,
    /// Account name.
    pub username: Option<String>,
    /// Name to display.
    pub full_name: Option<String>,
    /// Granted role.
    pub role: Option<Role>,
}

/// Claims describing the signed-in user, as persisted locally.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserClaims {
    /// User id.
    pub id: Option<i64>,
    /// Account name.
    pub username: Option<String>,
    /// Name to display.
    pub full_name: Option<String>,
    /// Role claim; unset for accounts without one.
    pub role: Option<Role>,
}

impl UserClaims {
    /// Role of the user, unprivileged when absent.
    pub fn role(&self) -> Role {
        self.role.unwrap_or_default()
    }
}

impl From<LoginResponse> for UserClaims {
    fn from(response: LoginResponse) -> Self {
        Self {
            id: response.id,
            username: response.username,
            full_name: response.full_name,
            role: response.role,
        }
    }
}
