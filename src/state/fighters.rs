//! Fighter list and detail store.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::{
    dto::{Fighter, FighterForm, FighterId},
    error::{ApiError, ApiResult},
    services::FighterService,
};

#[derive(Debug, Default)]
struct FighterState {
    fighters: Vec<Fighter>,
    current_fighter: Option<Fighter>,
    loading: bool,
    error: Option<String>,
}

/// Fighter list and detail, in the client shape.
#[derive(Clone)]
pub struct FighterStore {
    service: FighterService,
    state: Arc<RwLock<FighterState>>,
}

impl FighterStore {
    /// Empty store over `service`.
    pub fn new(service: FighterService) -> Self {
        Self {
            service,
            state: Arc::new(RwLock::new(FighterState::default())),
        }
    }

    /// Loaded fighters in load order.
    pub fn fighters(&self) -> Vec<Fighter> {
        self.state.read().fighters.clone()
    }

    /// Fighter shown in detail.
    pub fn current_fighter(&self) -> Option<Fighter> {
        self.state.read().current_fighter.clone()
    }

    /// Whether a fetch is in flight.
    pub fn loading(&self) -> bool {
        self.state.read().loading
    }

    /// Message of the last failed request.
    pub fn error(&self) -> Option<String> {
        self.state.read().error.clone()
    }

    fn begin(&self) {
        let mut state = self.state.write();
        state.loading = true;
        state.error = None;
    }

    fn settle<T>(&self, result: &ApiResult<T>) {
        let mut state = self.state.write();
        state.loading = false;
        if let Err(err) = result {
            warn!(error = %err, "fighter request failed");
            state.error = Some(err.to_string());
        }
    }

    fn record(&self, err: ApiError) -> ApiError {
        warn!(error = %err, "fighter action failed");
        self.state.write().error = Some(err.to_string());
        err
    }

    /// Replace the list. Failures are recorded, not returned.
    pub async fn fetch_all(&self) {
        self.begin();
        let result = self.service.get_all().await;
        self.settle(&result);
        if let Ok(fighters) = result {
            debug!(count = fighters.len(), "fighters loaded");
            self.state.write().fighters = fighters;
        }
    }

    /// Load one fighter as the current fighter.
    pub async fn fetch_by_id(&self, id: FighterId) -> ApiResult<Fighter> {
        self.begin();
        let result = self.service.get_by_id(id).await;
        self.settle(&result);
        let fighter = result?;
        self.state.write().current_fighter = Some(fighter.clone());
        Ok(fighter)
    }

    /// Replace the list with search results. Failures are recorded, not returned.
    pub async fn search(&self, query: &str) {
        self.begin();
        let result = self.service.search(query).await;
        self.settle(&result);
        if let Ok(fighters) = result {
            self.state.write().fighters = fighters;
        }
    }

    /// Create a fighter and append it.
    pub async fn create_fighter(&self, form: &FighterForm) -> ApiResult<Fighter> {
        let fighter = self
            .service
            .create(form)
            .await
            .map_err(|err| self.record(err))?;
        self.state.write().fighters.push(fighter.clone());
        Ok(fighter)
    }

    /// Update a fighter in place.
    pub async fn update_fighter(&self, id: FighterId, form: &FighterForm) -> ApiResult<Fighter> {
        let updated = self
            .service
            .update(id, form)
            .await
            .map_err(|err| self.record(err))?;
        let mut state = self.state.write();
        if let Some(slot) = state.fighters.iter_mut().find(|f| f.id == Some(id)) {
            *slot = updated.clone();
        }
        Ok(updated)
    }

    /// Delete a fighter from the list.
    pub async fn delete_fighter(&self, id: FighterId) -> ApiResult<()> {
        self.service
            .delete(id)
            .await
            .map_err(|err| self.record(err))?;
        self.state.write().fighters.retain(|f| f.id != Some(id));
        Ok(())
    }
}
