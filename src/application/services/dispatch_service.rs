use crate::application::ports::connectivity::ConnectivityProvider;
use crate::application::ports::local_mirror::LocalMirror;
use crate::application::ports::remote_gateway::{RemoteError, RemoteGateway, RemoteWriteRequest};
use crate::application::services::journal_service::JournalService;
use crate::application::services::queue_service::{EnqueueOutcome, QueueService};
use crate::application::services::session_service::SessionService;
use crate::domain::entities::{FolioEvent, WriteOperation};
use crate::shared::error::AppError;
use crate::shared::metrics::SyncMetrics;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// How a write was routed. `queued()` and `offline()` report the original
/// contract: `offline` signals that a local mirror result was produced, so
/// the hosted-web queued path reports `offline() == false`.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Executed directly against the remote system.
    Executed { data: Value },
    /// Applied to the local mirror and queued for reconciliation.
    QueuedLocal { data: Value },
    /// Queued verbatim with no local data effect; the caller presents a
    /// "will sync" state rather than updated data.
    QueuedPending,
    /// No valid session; nothing was persisted.
    Disabled,
}

impl DispatchOutcome {
    pub fn queued(&self) -> bool {
        matches!(
            self,
            DispatchOutcome::QueuedLocal { .. } | DispatchOutcome::QueuedPending
        )
    }

    pub fn offline(&self) -> bool {
        matches!(self, DispatchOutcome::QueuedLocal { .. })
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            DispatchOutcome::Executed { data } | DispatchOutcome::QueuedLocal { data } => {
                Some(data)
            }
            _ => None,
        }
    }
}

/// The single decision point every write must pass through. Hides "is this
/// host embedded or hosted, and are we online" from business logic.
///
/// The branch is evaluated fresh on every call; connectivity can change
/// between calls and the route taken for one call implies nothing about
/// the next.
pub struct DispatchService {
    session: Arc<SessionService>,
    queue: Arc<QueueService>,
    journal: Arc<JournalService>,
    connectivity: Arc<dyn ConnectivityProvider>,
    gateway: Arc<dyn RemoteGateway>,
    mirror: Option<Arc<dyn LocalMirror>>,
    metrics: Arc<SyncMetrics>,
    remote_timeout: Duration,
}

impl DispatchService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session: Arc<SessionService>,
        queue: Arc<QueueService>,
        journal: Arc<JournalService>,
        connectivity: Arc<dyn ConnectivityProvider>,
        gateway: Arc<dyn RemoteGateway>,
        mirror: Option<Arc<dyn LocalMirror>>,
        metrics: Arc<SyncMetrics>,
        remote_timeout: Duration,
    ) -> Self {
        Self {
            session,
            queue,
            journal,
            connectivity,
            gateway,
            mirror,
            metrics,
            remote_timeout,
        }
    }

    pub async fn dispatch(&self, op: WriteOperation) -> Result<DispatchOutcome, AppError> {
        let Some(tenant_id) = self.session.active_tenant() else {
            return Ok(DispatchOutcome::Disabled);
        };

        // Malformed folio payloads are rejected before anything persists.
        let folio_event = FolioEvent::from_operation(&op).map_err(AppError::ValidationError)?;

        if self.connectivity.is_online() {
            let request = RemoteWriteRequest {
                action_id: op.action_id.clone(),
                tenant_id,
                kind: op.kind.clone(),
                payload: op.payload.clone(),
            };

            match self.execute_bounded(request).await {
                Ok(data) => {
                    self.metrics.online_dispatch.record_success();
                    if let Some(event) = &folio_event {
                        self.journal.append(event).await?;
                    }
                    return Ok(DispatchOutcome::Executed { data });
                }
                Err(err) if err.is_transient() => {
                    // Still safely queueable; the remote side deduplicates
                    // by action_id if the original call actually landed.
                    self.metrics.online_dispatch.record_failure();
                    tracing::warn!(
                        target: "offline::dispatch",
                        action = %op.action_id,
                        error = %err,
                        "transient remote failure; falling back to queue"
                    );
                }
                Err(err) => {
                    self.metrics.online_dispatch.record_failure();
                    return Err(err.into());
                }
            }
        }

        self.route_offline(op, folio_event).await
    }

    async fn route_offline(
        &self,
        op: WriteOperation,
        folio_event: Option<FolioEvent>,
    ) -> Result<DispatchOutcome, AppError> {
        if let Some(mirror) = &self.mirror {
            let data = mirror.apply(&op).await?;
            self.metrics.record_mirror_applied();
            if let Some(event) = &folio_event {
                self.journal.append(event).await?;
            }
            if let EnqueueOutcome::Disabled = self.queue.enqueue(op.to_draft()).await? {
                return Ok(DispatchOutcome::Disabled);
            }
            self.metrics.record_queued();
            return Ok(DispatchOutcome::QueuedLocal { data });
        }

        if let EnqueueOutcome::Disabled = self.queue.enqueue(op.to_draft()).await? {
            return Ok(DispatchOutcome::Disabled);
        }
        self.metrics.record_queued();
        if let Some(event) = &folio_event {
            self.journal.append(event).await?;
        }
        tracing::debug!(
            target: "offline::dispatch",
            action = %op.action_id,
            "queued for later sync"
        );
        Ok(DispatchOutcome::QueuedPending)
    }

    async fn execute_bounded(&self, request: RemoteWriteRequest) -> Result<Value, RemoteError> {
        match tokio::time::timeout(self.remote_timeout, self.gateway.execute(request)).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::action_store::ActionStore;
    use crate::application::ports::journal_store::JournalStore;
    use crate::application::ports::session_store::SessionStore;
    use crate::domain::entities::{OfflineActionRecord, TenantSession};
    use crate::domain::value_objects::{
        ActionId, ActionKind, ActionPayload, ActionStatus, FolioId, StaffRole, TenantId,
    };
    use crate::infrastructure::connectivity::ConnectivityMonitor;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration as ChronoDuration, Utc};
    use mockall::mock;
    use serde_json::json;
    use std::sync::Mutex;

    mock! {
        pub Gateway {}

        #[async_trait]
        impl RemoteGateway for Gateway {
            async fn execute(
                &self,
                request: RemoteWriteRequest,
            ) -> Result<serde_json::Value, RemoteError>;
        }
    }

    #[derive(Default)]
    struct MemoryActionStore {
        records: Mutex<Vec<OfflineActionRecord>>,
    }

    #[async_trait]
    impl ActionStore for MemoryActionStore {
        async fn upsert_action(&self, record: &OfflineActionRecord) -> Result<i64, AppError> {
            let mut records = self.records.lock().unwrap();
            if let Some(existing) = records
                .iter_mut()
                .find(|r| r.action_id == record.action_id && r.tenant_id == record.tenant_id)
            {
                existing.kind = record.kind.clone();
                existing.payload = record.payload.clone();
                existing.status = ActionStatus::Pending;
                existing.error_message = None;
                existing.attempt_count = 0;
                return Ok(existing.record_id.unwrap_or(0));
            }
            let id = records.len() as i64 + 1;
            let mut stored = record.clone();
            stored.record_id = Some(id);
            records.push(stored);
            Ok(id)
        }

        async fn list_by_status(
            &self,
            tenant_id: &TenantId,
            status: ActionStatus,
        ) -> Result<Vec<OfflineActionRecord>, AppError> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .filter(|r| &r.tenant_id == tenant_id && r.status == status)
                .cloned()
                .collect())
        }

        async fn mark_synced(
            &self,
            _tenant_id: &TenantId,
            action_id: &ActionId,
            synced_at: DateTime<Utc>,
        ) -> Result<(), AppError> {
            let mut records = self.records.lock().unwrap();
            if let Some(record) = records.iter_mut().find(|r| &r.action_id == action_id) {
                record.status = ActionStatus::Synced;
                record.synced_at = Some(synced_at);
            }
            Ok(())
        }

        async fn mark_failed(
            &self,
            _tenant_id: &TenantId,
            action_id: &ActionId,
            error: &str,
        ) -> Result<(), AppError> {
            let mut records = self.records.lock().unwrap();
            if let Some(record) = records.iter_mut().find(|r| &r.action_id == action_id) {
                record.status = ActionStatus::Failed;
                record.error_message = Some(error.to_string());
                record.attempt_count += 1;
            }
            Ok(())
        }

        async fn count_by_status(
            &self,
            tenant_id: &TenantId,
            status: ActionStatus,
        ) -> Result<u64, AppError> {
            Ok(self.list_by_status(tenant_id, status).await?.len() as u64)
        }

        async fn delete_synced_before(
            &self,
            _tenant_id: &TenantId,
            cutoff: DateTime<Utc>,
        ) -> Result<u64, AppError> {
            let mut records = self.records.lock().unwrap();
            let before = records.len();
            records.retain(|r| r.status != ActionStatus::Synced || r.created_at >= cutoff);
            Ok((before - records.len()) as u64)
        }
    }

    #[derive(Default)]
    struct MemoryJournalStore {
        events: Mutex<Vec<FolioEvent>>,
    }

    #[async_trait]
    impl JournalStore for MemoryJournalStore {
        async fn append_event(
            &self,
            _tenant_id: &TenantId,
            event: &FolioEvent,
        ) -> Result<(), AppError> {
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }

        async fn events_for_folio(
            &self,
            _tenant_id: &TenantId,
            folio_id: &FolioId,
        ) -> Result<Vec<FolioEvent>, AppError> {
            Ok(self
                .events
                .lock()
                .unwrap()
                .iter()
                .filter(|e| &e.folio_id == folio_id)
                .cloned()
                .collect())
        }

        async fn count_events(&self, _tenant_id: &TenantId) -> Result<u64, AppError> {
            Ok(self.events.lock().unwrap().len() as u64)
        }
    }

    struct NullSessionStore;

    #[async_trait]
    impl SessionStore for NullSessionStore {
        async fn load(&self) -> Result<Option<TenantSession>, AppError> {
            Ok(None)
        }
        async fn save(&self, _session: &TenantSession) -> Result<(), AppError> {
            Ok(())
        }
        async fn clear(&self) -> Result<(), AppError> {
            Ok(())
        }
    }

    struct EchoMirror;

    #[async_trait]
    impl LocalMirror for EchoMirror {
        async fn apply(&self, op: &WriteOperation) -> Result<serde_json::Value, AppError> {
            Ok(json!({"mirrored": op.action_id.as_str()}))
        }
    }

    struct Fixture {
        dispatcher: DispatchService,
        store: Arc<MemoryActionStore>,
        journal_store: Arc<MemoryJournalStore>,
        monitor: Arc<ConnectivityMonitor>,
    }

    async fn fixture(gateway: MockGateway, with_mirror: bool, online: bool) -> Fixture {
        let session = Arc::new(SessionService::new(Arc::new(NullSessionStore)));
        let now = Utc::now();
        session
            .begin(TenantSession::new(
                TenantId::new("grand-plaza".into()).unwrap(),
                "staff-1".into(),
                StaffRole::FrontDesk,
                now,
                now + ChronoDuration::hours(8),
            ))
            .await
            .unwrap();

        let store = Arc::new(MemoryActionStore::default());
        let journal_store = Arc::new(MemoryJournalStore::default());
        let queue = Arc::new(QueueService::new(store.clone(), session.clone()));
        let journal = Arc::new(JournalService::new(journal_store.clone(), session.clone()));
        let monitor = Arc::new(ConnectivityMonitor::new(online));
        let mirror: Option<Arc<dyn LocalMirror>> = if with_mirror {
            Some(Arc::new(EchoMirror))
        } else {
            None
        };

        let dispatcher = DispatchService::new(
            session,
            queue,
            journal,
            monitor.clone(),
            Arc::new(gateway),
            mirror,
            Arc::new(SyncMetrics::new()),
            Duration::from_millis(500),
        );

        Fixture {
            dispatcher,
            store,
            journal_store,
            monitor,
        }
    }

    fn charge_op(action_id: &str) -> WriteOperation {
        WriteOperation::new(
            ActionId::parse(action_id).unwrap(),
            ActionKind::FolioCharge,
            ActionPayload::new(json!({
                "folio_id": "folio-1",
                "booking_id": "booking-1",
                "request_id": format!("req-{action_id}"),
                "amount_minor": 5000,
            }))
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn online_dispatch_executes_remotely_and_journals() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_execute()
            .times(1)
            .returning(|_| Ok(json!({"applied": true})));

        let fx = fixture(gateway, false, true).await;
        let outcome = fx.dispatcher.dispatch(charge_op("a1")).await.unwrap();

        assert!(!outcome.queued());
        assert_eq!(outcome.data(), Some(&json!({"applied": true})));
        assert!(fx.store.records.lock().unwrap().is_empty());
        assert_eq!(fx.journal_store.events.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn offline_without_mirror_queues_pending() {
        let mut gateway = MockGateway::new();
        gateway.expect_execute().times(0);

        let fx = fixture(gateway, false, false).await;
        let outcome = fx.dispatcher.dispatch(charge_op("a2")).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::QueuedPending);
        assert!(outcome.queued());
        assert!(!outcome.offline());
        assert_eq!(fx.store.records.lock().unwrap().len(), 1);
        assert_eq!(fx.journal_store.events.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn offline_with_mirror_applies_locally_and_queues() {
        let mut gateway = MockGateway::new();
        gateway.expect_execute().times(0);

        let fx = fixture(gateway, true, false).await;
        let outcome = fx.dispatcher.dispatch(charge_op("a3")).await.unwrap();

        assert!(outcome.queued());
        assert!(outcome.offline());
        assert_eq!(outcome.data(), Some(&json!({"mirrored": "a3"})));
        assert_eq!(fx.store.records.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn transient_remote_failure_falls_back_to_queue() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_execute()
            .times(1)
            .returning(|_| Err(RemoteError::Network("connection reset".into())));

        let fx = fixture(gateway, false, true).await;
        let outcome = fx.dispatcher.dispatch(charge_op("a4")).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::QueuedPending);
        assert_eq!(fx.store.records.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn validation_failure_propagates_and_never_enqueues() {
        let mut gateway = MockGateway::new();
        gateway.expect_execute().times(1).returning(|_| {
            Err(RemoteError::Rejected {
                status: 422,
                message: "amount must be positive".into(),
            })
        });

        let fx = fixture(gateway, false, true).await;
        let err = fx.dispatcher.dispatch(charge_op("a5")).await.unwrap_err();

        assert!(matches!(err, AppError::ValidationError(_)));
        assert!(fx.store.records.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn branch_is_evaluated_fresh_per_call() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_execute()
            .times(1)
            .returning(|_| Ok(json!({"applied": true})));

        let fx = fixture(gateway, false, false).await;

        let first = fx.dispatcher.dispatch(charge_op("b1")).await.unwrap();
        assert_eq!(first, DispatchOutcome::QueuedPending);

        fx.monitor.set_online(true);
        let second = fx.dispatcher.dispatch(charge_op("b2")).await.unwrap();
        assert!(!second.queued());
    }

    #[tokio::test]
    async fn no_session_disables_dispatch() {
        let mut gateway = MockGateway::new();
        gateway.expect_execute().times(0);

        let fx = fixture(gateway, false, true).await;
        fx.dispatcher.session.end().await.unwrap();

        let outcome = fx.dispatcher.dispatch(charge_op("c1")).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Disabled);
        assert!(fx.store.records.lock().unwrap().is_empty());
        assert!(fx.journal_store.events.lock().unwrap().is_empty());
    }
}
