use serde::Serialize;
use serde_json::{Value, json};

use crate::{
    dto::{Bout, BoutId},
    error::ApiResult,
    services::api_client::ApiClient,
};

/// Bout resource, including the judge workflow. Payloads pass through
/// unchanged.
#[derive(Clone)]
pub struct BoutService {
    api: ApiClient,
}

impl BoutService {
    /// Service over `api`.
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Every bout.
    pub async fn get_all(&self) -> ApiResult<Vec<Bout>> {
        self.api.get("/public/bouts").await
    }

    /// One bout.
    pub async fn get_by_id(&self, id: BoutId) -> ApiResult<Bout> {
        self.api.get(&format!("/public/bouts/{id}")).await
    }

    /// Bouts currently live.
    pub async fn get_live(&self) -> ApiResult<Vec<Bout>> {
        self.api.get("/public/bouts/live").await
    }

    /// Create a bout (admin).
    pub async fn create<B: Serialize + ?Sized>(&self, bout: &B) -> ApiResult<Bout> {
        self.api.post("/admin/bouts", bout).await
    }

    /// Replace a bout (admin).
    pub async fn update<B: Serialize + ?Sized>(&self, id: BoutId, bout: &B) -> ApiResult<Bout> {
        self.api.put(&format!("/admin/bouts/{id}"), bout).await
    }

    /// Delete a bout (admin).
    pub async fn delete(&self, id: BoutId) -> ApiResult<Value> {
        self.api.delete(&format!("/admin/bouts/{id}")).await
    }

    /// Start the bout (judge).
    pub async fn start(&self, id: BoutId) -> ApiResult<Bout> {
        self.judge_action(id, "start").await
    }

    /// Pause the bout (judge).
    pub async fn pause(&self, id: BoutId) -> ApiResult<Bout> {
        self.judge_action(id, "pause").await
    }

    /// Resume a paused bout (judge).
    pub async fn resume(&self, id: BoutId) -> ApiResult<Bout> {
        self.judge_action(id, "resume").await
    }

    /// Advance to the next round (judge).
    pub async fn next_round(&self, id: BoutId) -> ApiResult<Bout> {
        self.judge_action(id, "next-round").await
    }

    /// Close the bout. Without result data an empty object is sent.
    pub async fn finish(&self, id: BoutId, data: Option<&Value>) -> ApiResult<Bout> {
        let empty = json!({});
        self.api
            .post(&format!("/judge/bouts/{id}/finish"), data.unwrap_or(&empty))
            .await
    }

    /// Record a judge score card.
    pub async fn submit_score<S: Serialize + ?Sized>(&self, id: BoutId, score: &S) -> ApiResult<Value> {
        self.api
            .post(&format!("/judge/bouts/{id}/score"), score)
            .await
    }

    /// Score cards submitted so far.
    pub async fn get_scores(&self, id: BoutId) -> ApiResult<Value> {
        self.api.get(&format!("/judge/bouts/{id}/scores")).await
    }

    /// Result computed from the score cards.
    pub async fn calculate_result(&self, id: BoutId) -> ApiResult<Value> {
        self.api
            .get(&format!("/judge/bouts/{id}/calculate-result"))
            .await
    }

    async fn judge_action(&self, id: BoutId, action: &str) -> ApiResult<Bout> {
        self.api
            .post_empty(&format!("/judge/bouts/{id}/{action}"))
            .await
    }
}
