use crate::domain::entities::FolioEvent;
use crate::domain::value_objects::{FolioId, TenantId};
use crate::shared::error::AppError;
use async_trait::async_trait;

/// Append-only storage of folio events. There is deliberately no update or
/// delete operation on this trait.
#[async_trait]
pub trait JournalStore: Send + Sync {
    async fn append_event(&self, tenant_id: &TenantId, event: &FolioEvent)
        -> Result<(), AppError>;

    /// Events for one folio in append order (duplicates included; the
    /// journal service deduplicates before folding).
    async fn events_for_folio(
        &self,
        tenant_id: &TenantId,
        folio_id: &FolioId,
    ) -> Result<Vec<FolioEvent>, AppError>;

    async fn count_events(&self, tenant_id: &TenantId) -> Result<u64, AppError>;
}
