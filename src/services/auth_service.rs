use tracing::{debug, info};

use crate::{
    dto::{LoginRequest, LoginResponse, UserClaims},
    error::{ApiError, ApiResult},
    services::api_client::ApiClient,
};

/// Login and session lookups.
#[derive(Clone)]
pub struct AuthService {
    api: ApiClient,
}

impl AuthService {
    /// Service over `api`.
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Exchange credentials for a token and persist the session.
    pub async fn login(&self, username: &str, password: &str) -> ApiResult<(String, UserClaims)> {
        let response: LoginResponse = self
            .api
            .post("/auth/login", &LoginRequest { username, password })
            .await?;

        let token = response
            .token
            .clone()
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ApiError::InvalidResponse("login response has no token".into()))?;
        let user = UserClaims::from(response);
        self.api.session().save(&token, &user);
        info!(username = ?user.username, role = ?user.role, "logged in");
        Ok((token, user))
    }

    /// Claims of the current session as the backend sees them.
    pub async fn me(&self) -> ApiResult<UserClaims> {
        self.api.get("/auth/me").await
    }

    /// Keep refreshed claims in the session.
    pub fn remember_user(&self, user: &UserClaims) {
        self.api.session().set_user(user);
    }

    /// Forget the local session. The backend is not told.
    pub fn logout(&self) {
        debug!("clearing session");
        self.api.session().clear();
    }

    /// Stored bearer token.
    pub fn token(&self) -> Option<String> {
        self.api.session().token()
    }

    /// Stored user claims; invalid data clears the session.
    pub fn user(&self) -> Option<UserClaims> {
        self.api.session().user()
    }
}
