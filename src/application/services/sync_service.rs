use crate::application::ports::connectivity::ConnectivityProvider;
use crate::application::ports::remote_gateway::{RemoteError, RemoteGateway, RemoteWriteRequest};
use crate::application::services::queue_service::QueueService;
use crate::application::services::session_service::SessionService;
use crate::domain::entities::{
    OfflineActionRecord, SyncFailure, SyncPhase, SyncProgress, SyncReport,
};
use crate::shared::error::AppError;
use crate::shared::metrics::SyncMetrics;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

pub type ProgressObserver = Arc<dyn Fn(&SyncProgress) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSubscription {
    id: u64,
}

/// Outcome of asking the engine for a drain pass.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncRun {
    Completed(SyncReport),
    /// A drain is already in flight; nothing was dispatched twice.
    AlreadySyncing,
    /// No valid session; the engine is disabled.
    NoSession,
}

/// Drains the offline action queue once connectivity is confirmed, FIFO,
/// one record at a time. A failing record is marked and skipped so it can
/// never block later, independent actions. The state machine is
/// `idle -> syncing -> idle` and always re-enterable.
pub struct SyncEngine {
    session: Arc<SessionService>,
    queue: Arc<QueueService>,
    gateway: Arc<dyn RemoteGateway>,
    connectivity: Arc<dyn ConnectivityProvider>,
    metrics: Arc<SyncMetrics>,
    remote_timeout: Duration,
    retention_window: chrono::Duration,
    max_retry: u32,
    drain_gate: Mutex<()>,
    observers: StdMutex<Vec<(u64, ProgressObserver)>>,
    next_observer_id: StdMutex<u64>,
}

impl SyncEngine {
    pub fn new(
        session: Arc<SessionService>,
        queue: Arc<QueueService>,
        gateway: Arc<dyn RemoteGateway>,
        connectivity: Arc<dyn ConnectivityProvider>,
        metrics: Arc<SyncMetrics>,
        remote_timeout: Duration,
        retention_window: chrono::Duration,
        max_retry: u32,
    ) -> Self {
        Self {
            session,
            queue,
            gateway,
            connectivity,
            metrics,
            remote_timeout,
            retention_window,
            max_retry,
            drain_gate: Mutex::new(()),
            observers: StdMutex::new(Vec::new()),
            next_observer_id: StdMutex::new(0),
        }
    }

    /// Drains all pending records. Mutual exclusion is mandatory: a second
    /// caller while a drain is in flight gets `AlreadySyncing` without any
    /// record being dispatched twice.
    pub async fn sync_all(&self) -> Result<SyncRun, AppError> {
        if self.session.active_tenant().is_none() {
            return Ok(SyncRun::NoSession);
        }

        let Ok(_guard) = self.drain_gate.try_lock() else {
            tracing::debug!(target: "offline::sync", "drain already in progress");
            return Ok(SyncRun::AlreadySyncing);
        };

        let pending = self.queue.list_pending().await?;
        let report = self.drain(pending).await?;

        if report.success() {
            self.queue
                .clear_synced_older_than(self.retention_window)
                .await?;
        }

        Ok(SyncRun::Completed(report))
    }

    /// Re-attempts only failed records, with the same per-record semantics
    /// as `sync_all`. This is the polling fallback; connectivity events
    /// remain the primary trigger.
    ///
    /// Records that have exhausted `max_retry` attempts are left alone:
    /// they stay `Failed` for operator inspection and are only picked up
    /// again if re-enqueued, which resets their attempt count.
    pub async fn retry_failed(&self) -> Result<SyncRun, AppError> {
        if self.session.active_tenant().is_none() {
            return Ok(SyncRun::NoSession);
        }

        let Ok(_guard) = self.drain_gate.try_lock() else {
            return Ok(SyncRun::AlreadySyncing);
        };

        let failed = self.queue.list_failed().await?;
        let total = failed.len();
        let eligible: Vec<_> = failed
            .into_iter()
            .filter(|record| record.attempt_count < self.max_retry)
            .collect();
        let exhausted = total - eligible.len();
        if exhausted > 0 {
            tracing::debug!(
                target: "offline::sync",
                exhausted,
                max_retry = self.max_retry,
                "skipping records that reached the retry cap"
            );
        }

        let report = self.drain(eligible).await?;
        Ok(SyncRun::Completed(report))
    }

    pub fn on_progress(&self, observer: ProgressObserver) -> ProgressSubscription {
        let mut next_id = self.next_observer_id.lock().unwrap();
        let id = *next_id;
        *next_id += 1;
        drop(next_id);

        self.observers.lock().unwrap().push((id, observer));
        ProgressSubscription { id }
    }

    pub fn remove_progress_observer(&self, subscription: &ProgressSubscription) {
        self.observers
            .lock()
            .unwrap()
            .retain(|(id, _)| *id != subscription.id);
    }

    /// Invokes `sync_all` exactly once per offline-to-online transition.
    /// Flickers while a drain is running are absorbed by the drain gate.
    pub fn spawn_auto_sync(self: &Arc<Self>) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        let mut rx = self.connectivity.subscribe();
        tokio::spawn(async move {
            let mut was_online = *rx.borrow();
            while rx.changed().await.is_ok() {
                let online = *rx.borrow();
                if online && !was_online {
                    tracing::info!(target: "offline::sync", "connectivity restored; draining queue");
                    match engine.sync_all().await {
                        Ok(SyncRun::Completed(report)) => {
                            tracing::info!(
                                target: "offline::sync",
                                synced = report.synced,
                                failed = report.failed,
                                "auto sync pass finished"
                            );
                        }
                        Ok(_) => {}
                        Err(err) => {
                            tracing::error!(target: "offline::sync", error = %err, "auto sync failed");
                        }
                    }
                }
                was_online = online;
            }
        })
    }

    /// Periodic maintenance: retention GC plus a retry pass over failed
    /// records.
    pub fn spawn_maintenance(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick fires immediately; skip it.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(err) = engine
                    .queue
                    .clear_synced_older_than(engine.retention_window)
                    .await
                {
                    tracing::warn!(target: "offline::sync", error = %err, "retention pass failed");
                }
                if engine.connectivity.is_online() {
                    if let Err(err) = engine.retry_failed().await {
                        tracing::warn!(target: "offline::sync", error = %err, "retry pass failed");
                    }
                }
            }
        })
    }

    async fn drain(&self, records: Vec<OfflineActionRecord>) -> Result<SyncReport, AppError> {
        let total = records.len() as u32;
        let mut report = SyncReport::empty();

        self.emit(SyncProgress {
            phase: SyncPhase::Started,
            total,
            synced: 0,
            failed: 0,
        });

        for record in records {
            let request = RemoteWriteRequest {
                action_id: record.action_id.clone(),
                tenant_id: record.tenant_id.clone(),
                kind: record.kind.clone(),
                payload: record.payload.clone(),
            };

            match self.execute_bounded(request).await {
                Ok(_) => {
                    self.queue.mark_synced(&record.action_id).await?;
                    self.metrics.drain.record_success();
                    report.synced += 1;
                }
                Err(err) => {
                    // One bad record must not block the rest; later records
                    // may be for unrelated folios and bookings.
                    let message = err.to_string();
                    self.queue.mark_failed(&record.action_id, &message).await?;
                    self.metrics.drain.record_failure();
                    report.failed += 1;
                    report.errors.push(SyncFailure {
                        action_id: record.action_id.clone(),
                        message,
                    });
                    tracing::warn!(
                        target: "offline::sync",
                        action = %record.action_id,
                        error = %err,
                        "record failed to sync; continuing"
                    );
                }
            }

            self.emit(SyncProgress {
                phase: SyncPhase::Drained,
                total,
                synced: report.synced,
                failed: report.failed,
            });
        }

        self.emit(SyncProgress {
            phase: SyncPhase::Completed,
            total,
            synced: report.synced,
            failed: report.failed,
        });

        Ok(report)
    }

    /// A timeout is a transient failure: the record is marked failed and
    /// stays eligible for `retry_failed`, never terminally rejected.
    async fn execute_bounded(
        &self,
        request: RemoteWriteRequest,
    ) -> Result<serde_json::Value, RemoteError> {
        match tokio::time::timeout(self.remote_timeout, self.gateway.execute(request)).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Timeout),
        }
    }

    fn emit(&self, progress: SyncProgress) {
        let observers: Vec<ProgressObserver> = self
            .observers
            .lock()
            .unwrap()
            .iter()
            .map(|(_, o)| o.clone())
            .collect();
        for observer in observers {
            observer(&progress);
        }
    }
}
