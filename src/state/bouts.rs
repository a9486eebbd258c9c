//! Local bout state: all bouts, live bouts and the bout on screen, kept
//! loosely consistent by REST responses and live pushes.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    dto::{Bout, BoutId},
    error::{ApiError, ApiResult},
    live::{LiveChannel, LivePayload, Subscription, topics},
    services::BoutService,
};

/// The three bout collections. Maps preserve first-insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoutCollections {
    /// Every bout loaded from the backend.
    pub bouts: IndexMap<BoutId, Bout>,
    /// Bouts known to be live.
    pub live_bouts: IndexMap<BoutId, Bout>,
    /// Bout shown in detail.
    pub current_bout: Option<Bout>,
}

impl BoutCollections {
    /// Fold an authoritative snapshot into every collection that tracks it.
    ///
    /// The live-list removal runs regardless of the replace/append branch
    /// before it. Snapshots carry no ordering, so a late stale one wins.
    pub fn merge(&mut self, incoming: Bout) {
        let id = incoming.id;
        let live = incoming.status.is_live();

        if let Some(slot) = self.bouts.get_mut(&id) {
            *slot = incoming.clone();
        }

        if let Some(slot) = self.live_bouts.get_mut(&id) {
            *slot = incoming.clone();
        } else if live {
            self.live_bouts.insert(id, incoming.clone());
        }

        if !live {
            self.live_bouts.shift_remove(&id);
        }

        if self.current_bout.as_ref().is_some_and(|current| current.id == id) {
            self.current_bout = Some(incoming);
        }
    }

    /// Lookup in all bouts, then live bouts.
    pub fn find(&self, id: BoutId) -> Option<&Bout> {
        self.bouts.get(&id).or_else(|| self.live_bouts.get(&id))
    }
}

fn index(bouts: Vec<Bout>) -> IndexMap<BoutId, Bout> {
    bouts.into_iter().map(|bout| (bout.id, bout)).collect()
}

#[derive(Debug, Default)]
struct BoutState {
    collections: BoutCollections,
    loading: bool,
    error: Option<String>,
}

/// Handles to both topics of one bout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoutSubscription {
    /// Snapshots of the bout.
    pub bout: Subscription,
    /// Score pushes for the bout.
    pub scores: Subscription,
}

/// Bout store: REST actions and live subscriptions over shared collections.
#[derive(Clone)]
pub struct BoutStore {
    service: BoutService,
    live: LiveChannel,
    state: Arc<RwLock<BoutState>>,
}

impl BoutStore {
    /// Empty store over `service`, subscribing through `live`.
    pub fn new(service: BoutService, live: LiveChannel) -> Self {
        Self {
            service,
            live,
            state: Arc::new(RwLock::new(BoutState::default())),
        }
    }

    /// Copy of the three collections.
    pub fn snapshot(&self) -> BoutCollections {
        self.state.read().collections.clone()
    }

    /// All bouts in load order.
    pub fn bouts(&self) -> Vec<Bout> {
        self.state.read().collections.bouts.values().cloned().collect()
    }

    /// Live bouts in arrival order.
    pub fn live_bouts(&self) -> Vec<Bout> {
        self.state
            .read()
            .collections
            .live_bouts
            .values()
            .cloned()
            .collect()
    }

    /// Bout shown in detail.
    pub fn current_bout(&self) -> Option<Bout> {
        self.state.read().collections.current_bout.clone()
    }

    /// Whether a fetch is in flight.
    pub fn loading(&self) -> bool {
        self.state.read().loading
    }

    /// Message of the last failed action.
    pub fn error(&self) -> Option<String> {
        self.state.read().error.clone()
    }

    /// Lookup in all bouts, then live bouts.
    pub fn get_bout_by_id(&self, id: BoutId) -> Option<Bout> {
        self.state.read().collections.find(id).cloned()
    }

    /// Merge one snapshot into the collections.
    pub fn apply(&self, bout: Bout) {
        self.state.write().collections.merge(bout);
    }

    fn begin(&self) {
        let mut state = self.state.write();
        state.loading = true;
        state.error = None;
    }

    fn finish<T>(&self, result: &ApiResult<T>) {
        let mut state = self.state.write();
        state.loading = false;
        if let Err(err) = result {
            state.error = Some(err.to_string());
        }
    }

    fn record(&self, err: ApiError) -> ApiError {
        warn!(error = %err, "bout action failed");
        self.state.write().error = Some(err.to_string());
        err
    }

    /// Replace all bouts. Failures are recorded, not returned.
    pub async fn fetch_all(&self) {
        self.begin();
        let result = self.service.get_all().await;
        self.finish(&result);
        match result {
            Ok(bouts) => {
                debug!(count = bouts.len(), "bouts loaded");
                self.state.write().collections.bouts = index(bouts);
            }
            Err(err) => warn!(error = %err, "failed to load bouts"),
        }
    }

    /// Replace live bouts. Failures are recorded, not returned.
    pub async fn fetch_live(&self) {
        self.begin();
        let result = self.service.get_live().await;
        self.finish(&result);
        match result {
            Ok(bouts) => {
                debug!(count = bouts.len(), "live bouts loaded");
                self.state.write().collections.live_bouts = index(bouts);
            }
            Err(err) => warn!(error = %err, "failed to load live bouts"),
        }
    }

    /// Load one bout as the current bout.
    pub async fn fetch_by_id(&self, id: BoutId) -> ApiResult<Bout> {
        self.begin();
        let result = self.service.get_by_id(id).await;
        self.finish(&result);
        let bout = result?;
        self.state.write().collections.current_bout = Some(bout.clone());
        Ok(bout)
    }

    /// Create a bout and append it to all bouts.
    pub async fn create_bout<B: Serialize + ?Sized>(&self, data: &B) -> ApiResult<Bout> {
        let bout = self.service.create(data).await.map_err(|err| self.record(err))?;
        self.state
            .write()
            .collections
            .bouts
            .insert(bout.id, bout.clone());
        Ok(bout)
    }

    /// Update a bout and replace it in all bouts.
    pub async fn update_bout<B: Serialize + ?Sized>(&self, id: BoutId, data: &B) -> ApiResult<Bout> {
        let updated = self
            .service
            .update(id, data)
            .await
            .map_err(|err| self.record(err))?;
        if let Some(slot) = self.state.write().collections.bouts.get_mut(&id) {
            *slot = updated.clone();
        }
        Ok(updated)
    }

    /// Delete a bout and drop it from all bouts.
    pub async fn delete_bout(&self, id: BoutId) -> ApiResult<()> {
        self.service
            .delete(id)
            .await
            .map_err(|err| self.record(err))?;
        self.state.write().collections.bouts.shift_remove(&id);
        Ok(())
    }

    /// Start a bout and merge the result.
    pub async fn start_bout(&self, id: BoutId) -> ApiResult<Bout> {
        self.merge_result(self.service.start(id).await)
    }

    /// Pause a bout and merge the result.
    pub async fn pause_bout(&self, id: BoutId) -> ApiResult<Bout> {
        self.merge_result(self.service.pause(id).await)
    }

    /// Resume a bout and merge the result.
    pub async fn resume_bout(&self, id: BoutId) -> ApiResult<Bout> {
        self.merge_result(self.service.resume(id).await)
    }

    /// Advance a bout and merge the result.
    pub async fn next_round(&self, id: BoutId) -> ApiResult<Bout> {
        self.merge_result(self.service.next_round(id).await)
    }

    /// Finish a bout and merge the result.
    pub async fn finish_bout(&self, id: BoutId, data: Option<&Value>) -> ApiResult<Bout> {
        self.merge_result(self.service.finish(id, data).await)
    }

    fn merge_result(&self, result: ApiResult<Bout>) -> ApiResult<Bout> {
        let bout = result.map_err(|err| self.record(err))?;
        self.apply(bout.clone());
        Ok(bout)
    }

    /// Merge every snapshot pushed on the all-bouts topic.
    pub fn subscribe_to_bouts(&self) -> Option<Subscription> {
        let state = self.state.clone();
        self.live
            .subscribe(topics::BOUTS, move |payload| merge_payload(&state, payload))
    }

    /// Follow one bout: snapshots are merged, score pushes replace the
    /// current bout's scores while that bout is on screen.
    pub fn subscribe_to_bout(&self, id: BoutId) -> Option<BoutSubscription> {
        let state = self.state.clone();
        let bout = self
            .live
            .subscribe(&topics::bout(id), move |payload| merge_payload(&state, payload))?;

        let state = self.state.clone();
        let scores_topic = topics::bout_scores(id);
        let scores = self.live.subscribe(&scores_topic, move |payload| {
            let mut state = state.write();
            match state.collections.current_bout.as_mut() {
                Some(current) if current.id == id => current.scores = Some(payload.into_value()),
                _ => debug!(id, "scores for a bout that is not on screen"),
            }
        });

        match scores {
            Some(scores) => Some(BoutSubscription { bout, scores }),
            None => {
                self.live.unsubscribe(&bout.topic);
                None
            }
        }
    }

    /// Stop following one bout.
    pub fn unsubscribe_from_bout(&self, id: BoutId) {
        self.live.unsubscribe(&topics::bout(id));
        self.live.unsubscribe(&topics::bout_scores(id));
    }
}

fn merge_payload(state: &RwLock<BoutState>, payload: LivePayload) {
    match payload.decode::<Bout>() {
        Ok(bout) => {
            debug!(id = bout.id, status = ?bout.status, "live bout update");
            state.write().collections.merge(bout);
        }
        Err(err) => warn!(error = %err, "ignoring undecodable bout update"),
    }
}
