//! Authentication store.

use tracing::{info, warn};

use crate::{
    dto::{Role, UserClaims},
    error::ApiResult,
    services::AuthService,
};

/// Result of a login attempt, ready to show to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    /// Whether a session was established.
    pub success: bool,
    /// Server message to show when the attempt failed.
    pub message: Option<String>,
}

/// Signed-in user as seen by the rest of the client.
///
/// Holds no copy of the session: every getter reads the shared session, so
/// a sign-out from anywhere (a rejected request included) shows up here.
#[derive(Clone)]
pub struct AuthStore {
    service: AuthService,
}

impl AuthStore {
    /// Store over the session behind `service`.
    pub fn new(service: AuthService) -> Self {
        Self { service }
    }

    /// Claims of the signed-in user.
    pub fn user(&self) -> Option<UserClaims> {
        self.service.user()
    }

    /// Bearer token of the current session.
    pub fn token(&self) -> Option<String> {
        self.service.token()
    }

    /// Whether a token is held.
    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// Role claim of the user, `None` when signed out or unset.
    pub fn role(&self) -> Option<Role> {
        self.user().and_then(|user| user.role)
    }

    /// Whether the user holds the `ADMIN` role.
    pub fn is_admin(&self) -> bool {
        self.role() == Some(Role::Admin)
    }

    /// Whether the user holds the `JUDGE` role.
    pub fn is_judge(&self) -> bool {
        self.role() == Some(Role::Judge)
    }

    /// Whether the user holds the `SUPERVISOR` role.
    pub fn is_supervisor(&self) -> bool {
        self.role() == Some(Role::Supervisor)
    }

    /// Sign in; failures come back as a message instead of an error.
    pub async fn login(&self, username: &str, password: &str) -> LoginOutcome {
        match self.service.login(username, password).await {
            Ok(_) => LoginOutcome {
                success: true,
                message: None,
            },
            Err(err) => {
                warn!(username, error = %err, "login failed");
                LoginOutcome {
                    success: false,
                    message: Some(err.user_message()),
                }
            }
        }
    }

    /// Refresh the claims from the backend; any failure signs out.
    pub async fn fetch_user(&self) -> ApiResult<UserClaims> {
        match self.service.me().await {
            Ok(user) => {
                self.service.remember_user(&user);
                Ok(user)
            }
            Err(err) => {
                self.logout();
                Err(err)
            }
        }
    }

    /// Drop the session.
    pub fn logout(&self) {
        self.service.logout();
        info!("logged out");
    }
}
