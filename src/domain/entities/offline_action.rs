use crate::domain::value_objects::{ActionId, ActionKind, ActionPayload, ActionStatus, TenantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One queued intent, durably held until the sync engine drains it.
///
/// Status is mutated only by the sync engine; everything else reads or
/// enqueues. Synced records are eventually removed by retention GC.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OfflineActionRecord {
    pub record_id: Option<i64>,
    pub action_id: ActionId,
    pub tenant_id: TenantId,
    pub kind: ActionKind,
    pub payload: ActionPayload,
    pub status: ActionStatus,
    pub error_message: Option<String>,
    /// Failed drain attempts so far; re-enqueueing the same action resets it.
    pub attempt_count: u32,
    pub created_at: DateTime<Utc>,
    pub synced_at: Option<DateTime<Utc>>,
}

/// What a caller hands to the queue: the record minus the fields the queue
/// assigns itself (`status`, `created_at`, tenant scope).
#[derive(Debug, Clone, PartialEq)]
pub struct OfflineActionDraft {
    pub action_id: ActionId,
    pub kind: ActionKind,
    pub payload: ActionPayload,
}

impl OfflineActionDraft {
    pub fn new(action_id: ActionId, kind: ActionKind, payload: ActionPayload) -> Self {
        Self {
            action_id,
            kind,
            payload,
        }
    }
}

/// An intended remote write before the dispatcher has decided how to route
/// it. Carries the same idempotency key the queue and the remote call use.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOperation {
    pub action_id: ActionId,
    pub kind: ActionKind,
    pub payload: ActionPayload,
}

impl WriteOperation {
    pub fn new(action_id: ActionId, kind: ActionKind, payload: ActionPayload) -> Self {
        Self {
            action_id,
            kind,
            payload,
        }
    }

    pub fn to_draft(&self) -> OfflineActionDraft {
        OfflineActionDraft::new(self.action_id.clone(), self.kind.clone(), self.payload.clone())
    }
}

/// Derived, never stored; recomputed from the action store on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatusSnapshot {
    pub pending: u64,
    pub failed: u64,
}
