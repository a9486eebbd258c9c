//! Bout snapshots as the backend publishes them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier assigned to bouts by the backend.
pub type BoutId = i64;

/// Lifecycle status of a bout as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BoutStatus {
    /// Created, not started yet.
    Scheduled,
    /// Running; the only status that belongs in the live collection.
    Live,
    /// Stopped by a judge, resumable.
    Paused,
    /// Result recorded.
    Finished,
    /// Called off before completion.
    Cancelled,
    /// Missing, or any status this client does not know about.
    #[default]
    #[serde(other)]
    Unknown,
}

impl BoutStatus {
    /// Whether the bout belongs in the live collection.
    pub fn is_live(self) -> bool {
        matches!(self, BoutStatus::Live)
    }
}

/// Authoritative snapshot of a bout.
///
/// Only the fields the client reconciles on are typed; everything else the
/// backend sends (fighters, event, timestamps) is carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bout {
    /// Backend id, the reconciliation key.
    pub id: BoutId,
    /// Lifecycle status; `Unknown` when missing.
    #[serde(default)]
    pub status: BoutStatus,
    /// Round in progress, also accepted as `round`.
    #[serde(default, alias = "round", skip_serializing_if = "Option::is_none")]
    pub current_round: Option<u32>,
    /// Score entries, replaced wholesale by the live scores topic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scores: Option<Value>,
    /// Every other field, passed through.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Bout {
    /// Bare snapshot with the given id and status.
    pub fn new(id: BoutId, status: BoutStatus) -> Self {
        Self {
            id,
            status,
            current_round: None,
            scores: None,
            extra: Map::new(),
        }
    }
}
