use tracing::debug;

use crate::{
    dto::{Fighter, FighterForm, FighterId, FighterPayload, FighterRecord},
    error::ApiResult,
    services::api_client::ApiClient,
};

/// Fighter resource. Reads come back in the client shape; writes are
/// translated to the backend shape first.
#[derive(Clone)]
pub struct FighterService {
    api: ApiClient,
}

impl FighterService {
    /// Service over `api`.
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Every fighter, in the client shape.
    pub async fn get_all(&self) -> ApiResult<Vec<Fighter>> {
        let records: Vec<FighterRecord> = self.api.get("/public/fighters").await?;
        Ok(records.into_iter().map(Fighter::from).collect())
    }

    /// One fighter.
    pub async fn get_by_id(&self, id: FighterId) -> ApiResult<Fighter> {
        let record: FighterRecord = self.api.get(&format!("/public/fighters/{id}")).await?;
        Ok(record.into())
    }

    /// Fighters matching `query`.
    pub async fn search(&self, query: &str) -> ApiResult<Vec<Fighter>> {
        let records: Vec<FighterRecord> = self
            .api
            .get_with_query("/fighters/search", &[("q", query)])
            .await?;
        Ok(records.into_iter().map(Fighter::from).collect())
    }

    /// Create a fighter from form input.
    pub async fn create(&self, form: &FighterForm) -> ApiResult<Fighter> {
        let payload = FighterPayload::from(form);
        debug!(?payload, "creating fighter");
        let record: FighterRecord = self.api.post("/admin/fighters", &payload).await?;
        Ok(record.into())
    }

    /// Replace a fighter from form input.
    pub async fn update(&self, id: FighterId, form: &FighterForm) -> ApiResult<Fighter> {
        let payload = FighterPayload::from(form);
        debug!(id, ?payload, "updating fighter");
        let record: FighterRecord = self
            .api
            .put(&format!("/admin/fighters/{id}"), &payload)
            .await?;
        Ok(record.into())
    }

    /// Delete a fighter.
    pub async fn delete(&self, id: FighterId) -> ApiResult<serde_json::Value> {
        self.api.delete(&format!("/admin/fighters/{id}")).await
    }
}
