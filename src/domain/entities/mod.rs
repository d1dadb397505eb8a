mod folio_event;
mod offline_action;
mod sync_report;
mod tenant_session;

pub use folio_event::{FolioBalance, FolioEvent, FolioEventKind, FolioEventPayload};
pub use offline_action::{
    OfflineActionDraft, OfflineActionRecord, QueueStatusSnapshot, WriteOperation,
};
pub use sync_report::{SyncFailure, SyncPhase, SyncProgress, SyncReport};
pub use tenant_session::TenantSession;
