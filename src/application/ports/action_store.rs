use crate::domain::entities::OfflineActionRecord;
use crate::domain::value_objects::{ActionId, ActionStatus, TenantId};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Durable holding area for queued actions. Implementations must index by
/// status and creation time; listing is always `created_at` ascending.
#[async_trait]
pub trait ActionStore: Send + Sync {
    /// Upserts by `(tenant_id, action_id)`. Re-enqueueing an existing
    /// action updates it in place (back to pending) and keeps its original
    /// queue position; it never inserts a duplicate.
    async fn upsert_action(&self, record: &OfflineActionRecord) -> Result<i64, AppError>;

    async fn list_by_status(
        &self,
        tenant_id: &TenantId,
        status: ActionStatus,
    ) -> Result<Vec<OfflineActionRecord>, AppError>;

    /// No-op when the record is already gone.
    async fn mark_synced(
        &self,
        tenant_id: &TenantId,
        action_id: &ActionId,
        synced_at: DateTime<Utc>,
    ) -> Result<(), AppError>;

    /// No-op when the record is already gone.
    async fn mark_failed(
        &self,
        tenant_id: &TenantId,
        action_id: &ActionId,
        error: &str,
    ) -> Result<(), AppError>;

    async fn count_by_status(
        &self,
        tenant_id: &TenantId,
        status: ActionStatus,
    ) -> Result<u64, AppError>;

    /// Deletes synced records created before `cutoff`; returns how many.
    async fn delete_synced_before(
        &self,
        tenant_id: &TenantId,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, AppError>;
}
