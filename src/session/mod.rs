//! Session context: bearer token and user claims over client-local storage.

pub mod store;

use std::sync::Arc;

use tracing::{info, warn};

use crate::dto::{Role, UserClaims};

pub use self::store::{FileStore, KeyValueStore, MemoryStore, StorageError};

/// Storage key holding the bearer token.
pub const TOKEN_KEY: &str = "token";
/// Storage key holding the JSON-encoded user claims.
pub const USER_KEY: &str = "user";
/// Values left behind by broken writes that must be read as "no session".
const INVALID_MARKERS: [&str; 3] = ["undefined", "null", ""];

/// Shared handle on the persisted session.
///
/// Every outgoing request reads it; login, logout and unauthorized responses
/// write it. Cloning shares the same underlying storage.
#[derive(Clone)]
pub struct SessionContext {
    store: Arc<dyn KeyValueStore>,
}

impl SessionContext {
    /// Session over `store`.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Session kept in process memory only.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Drop both entries if the stored user is one of the invalid markers.
    /// Returns whether anything was cleared.
    pub fn sanitize(&self) -> bool {
        match self.store.get(USER_KEY) {
            Some(raw) if INVALID_MARKERS.contains(&raw.as_str()) => {
                info!(value = %raw, "discarding invalid persisted session");
                self.clear();
                true
            }
            _ => false,
        }
    }

    /// Bearer token, if one is stored.
    pub fn token(&self) -> Option<String> {
        self.store.get(TOKEN_KEY).filter(|token| !token.is_empty())
    }

    /// Stored user claims. Invalid markers or undecodable data clear the
    /// session and read as no session.
    pub fn user(&self) -> Option<UserClaims> {
        let raw = self.store.get(USER_KEY)?;
        if INVALID_MARKERS.contains(&raw.as_str()) {
            self.clear();
            return None;
        }

        match serde_json::from_str::<UserClaims>(&raw) {
            Ok(user) => Some(user),
            Err(err) => {
                warn!(error = %err, "failed to decode stored user; clearing session");
                self.clear();
                None
            }
        }
    }

    /// Whether a token is stored.
    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// Role of the stored user, if any.
    pub fn role(&self) -> Option<Role> {
        self.user().map(|user| user.role())
    }

    /// Persist a freshly issued token and its claims.
    pub fn save(&self, token: &str, user: &UserClaims) {
        self.store.set(TOKEN_KEY, token);
        self.set_user(user);
    }

    /// Replace the stored claims, keeping the token.
    pub fn set_user(&self, user: &UserClaims) {
        match serde_json::to_string(user) {
            Ok(encoded) => self.store.set(USER_KEY, &encoded),
            Err(err) => {
                warn!(error = %err, "failed to encode user claims");
                self.store.remove(USER_KEY);
            }
        }
    }

    /// Forget the session.
    pub fn clear(&self) {
        self.store.remove(TOKEN_KEY);
        self.store.remove(USER_KEY);
    }
}
