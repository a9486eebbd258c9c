use serde_json::Value;

use crate::{error::ApiResult, services::api_client::ApiClient};

/// Aggregate platform statistics.
#[derive(Clone)]
pub struct StatsService {
    api: ApiClient,
}

impl StatsService {
    /// Service over `api`.
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Platform statistics, as returned.
    pub async fn get_stats(&self) -> ApiResult<Value> {
        self.api.get("/public/stats").await
    }
}
