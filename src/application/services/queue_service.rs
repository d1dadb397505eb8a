use crate::application::ports::action_store::ActionStore;
use crate::application::services::session_service::SessionService;
use crate::domain::entities::{
    OfflineActionDraft, OfflineActionRecord, QueueStatusSnapshot,
};
use crate::domain::value_objects::{ActionId, ActionStatus};
use crate::shared::error::AppError;
use chrono::{Duration, Utc};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum EnqueueOutcome {
    Queued(OfflineActionRecord),
    /// No valid session; nothing was persisted.
    Disabled,
}

/// Typed wrapper over the action store: enqueue, list, status transitions
/// and retention GC, all scoped to the active tenant.
///
/// A storage failure on enqueue is returned to the caller - dropping a
/// queued financial write silently is worse than surfacing the error.
pub struct QueueService {
    store: Arc<dyn ActionStore>,
    session: Arc<SessionService>,
}

impl QueueService {
    pub fn new(store: Arc<dyn ActionStore>, session: Arc<SessionService>) -> Self {
        Self { store, session }
    }

    pub async fn enqueue(&self, draft: OfflineActionDraft) -> Result<EnqueueOutcome, AppError> {
        let Some(tenant_id) = self.session.active_tenant() else {
            return Ok(EnqueueOutcome::Disabled);
        };

        let record = OfflineActionRecord {
            record_id: None,
            action_id: draft.action_id,
            tenant_id,
            kind: draft.kind,
            payload: draft.payload,
            status: ActionStatus::Pending,
            error_message: None,
            attempt_count: 0,
            created_at: Utc::now(),
            synced_at: None,
        };

        let record_id = self.store.upsert_action(&record).await?;
        tracing::debug!(
            target: "offline::queue",
            action = %record.action_id,
            kind = %record.kind,
            "action enqueued"
        );

        Ok(EnqueueOutcome::Queued(OfflineActionRecord {
            record_id: Some(record_id),
            ..record
        }))
    }

    pub async fn list_pending(&self) -> Result<Vec<OfflineActionRecord>, AppError> {
        let Some(tenant_id) = self.session.active_tenant() else {
            return Ok(Vec::new());
        };
        self.store
            .list_by_status(&tenant_id, ActionStatus::Pending)
            .await
    }

    pub async fn list_failed(&self) -> Result<Vec<OfflineActionRecord>, AppError> {
        let Some(tenant_id) = self.session.active_tenant() else {
            return Ok(Vec::new());
        };
        self.store
            .list_by_status(&tenant_id, ActionStatus::Failed)
            .await
    }

    pub async fn mark_synced(&self, action_id: &ActionId) -> Result<(), AppError> {
        let Some(tenant_id) = self.session.active_tenant() else {
            return Ok(());
        };
        self.store
            .mark_synced(&tenant_id, action_id, Utc::now())
            .await
    }

    pub async fn mark_failed(&self, action_id: &ActionId, error: &str) -> Result<(), AppError> {
        let Some(tenant_id) = self.session.active_tenant() else {
            return Ok(());
        };
        self.store.mark_failed(&tenant_id, action_id, error).await
    }

    pub async fn queue_status(&self) -> Result<QueueStatusSnapshot, AppError> {
        let Some(tenant_id) = self.session.active_tenant() else {
            return Ok(QueueStatusSnapshot {
                pending: 0,
                failed: 0,
            });
        };
        let pending = self
            .store
            .count_by_status(&tenant_id, ActionStatus::Pending)
            .await?;
        let failed = self
            .store
            .count_by_status(&tenant_id, ActionStatus::Failed)
            .await?;
        Ok(QueueStatusSnapshot { pending, failed })
    }

    /// Retention GC; runs after every clean sync pass and from periodic
    /// maintenance.
    pub async fn clear_synced_older_than(&self, window: Duration) -> Result<u64, AppError> {
        let Some(tenant_id) = self.session.active_tenant() else {
            return Ok(0);
        };
        let cutoff = Utc::now() - window;
        let removed = self.store.delete_synced_before(&tenant_id, cutoff).await?;
        if removed > 0 {
            tracing::debug!(
                target: "offline::queue",
                removed,
                "garbage collected synced actions"
            );
        }
        Ok(removed)
    }
}
