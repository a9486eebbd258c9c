use serde_json::Value;

use crate::{error::ApiResult, services::api_client::ApiClient};

/// Public event listing.
#[derive(Clone)]
pub struct EventService {
    api: ApiClient,
}

impl EventService {
    /// Service over `api`.
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Every event, as returned.
    pub async fn get_all(&self) -> ApiResult<Value> {
        self.api.get("/public/events").await
    }

    /// One event, as returned.
    pub async fn get_by_id(&self, id: i64) -> ApiResult<Value> {
        self.api.get(&format!("/public/events/{id}")).await
    }
}
