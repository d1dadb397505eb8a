use crate::domain::value_objects::ActionId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncFailure {
    pub action_id: ActionId,
    pub message: String,
}

/// Aggregate outcome of one drain pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub synced: u32,
    pub failed: u32,
    pub errors: Vec<SyncFailure>,
}

impl SyncReport {
    pub fn empty() -> Self {
        Self {
            synced: 0,
            failed: 0,
            errors: Vec::new(),
        }
    }

    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    Started,
    Drained,
    Completed,
}

/// Observer payload; emitted at least at the start and end of a pass, plus
/// once per drained record, so a UI can render progress without polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncProgress {
    pub phase: SyncPhase,
    pub total: u32,
    pub synced: u32,
    pub failed: u32,
}
