use crate::application::ports::action_store::ActionStore;
use crate::application::ports::journal_store::JournalStore;
use crate::domain::value_objects::{ActionStatus, TenantId};
use crate::shared::error::AppError;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Host-facing observer for recovery outcomes; the embedded shell forwards
/// these to its UI event bus.
pub trait RecoveryEmitter: Send + Sync {
    fn emit_report(&self, report: &RecoveryReport) -> Result<(), String>;
    fn emit_failure(&self, message: &str) -> Result<(), String>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryReport {
    pub pending_actions: u64,
    pub failed_actions: u64,
    pub journal_events: u64,
    pub pending_action_ids: Vec<String>,
    pub emitted_at: i64,
}

/// Startup recovery pass: after a crash or hard restart, recounts the
/// work still owed to the remote system so the host can surface it before
/// the first sync runs. Guarded against concurrent runs.
pub struct StartupRecovery {
    emitter: Option<Arc<dyn RecoveryEmitter>>,
    actions: Arc<dyn ActionStore>,
    journal: Arc<dyn JournalStore>,
    gate: Mutex<()>,
}

impl StartupRecovery {
    pub fn new(
        emitter: Option<Arc<dyn RecoveryEmitter>>,
        actions: Arc<dyn ActionStore>,
        journal: Arc<dyn JournalStore>,
    ) -> Arc<Self> {
        Arc::new(Self {
            emitter,
            actions,
            journal,
            gate: Mutex::new(()),
        })
    }

    pub fn trigger(self: &Arc<Self>, tenant_id: TenantId) {
        let job = Arc::clone(self);
        tokio::spawn(async move {
            job.run_guarded(tenant_id).await;
        });
    }

    pub async fn recover_once(&self, tenant_id: &TenantId) -> Result<RecoveryReport, AppError> {
        let pending = self
            .actions
            .list_by_status(tenant_id, ActionStatus::Pending)
            .await?;
        let failed = self
            .actions
            .count_by_status(tenant_id, ActionStatus::Failed)
            .await?;
        let journal_events = self.journal.count_events(tenant_id).await?;

        Ok(RecoveryReport {
            pending_actions: pending.len() as u64,
            failed_actions: failed,
            journal_events,
            pending_action_ids: pending
                .iter()
                .map(|action| action.action_id.to_string())
                .collect(),
            emitted_at: Utc::now().timestamp_millis(),
        })
    }

    async fn run_guarded(self: Arc<Self>, tenant_id: TenantId) {
        let _guard = self.gate.lock().await;
        match self.recover_once(&tenant_id).await {
            Ok(report) => self.emit_success(&report),
            Err(err) => self.emit_failure(&err.to_string()),
        }
    }

    fn emit_success(&self, report: &RecoveryReport) {
        if let Some(emitter) = &self.emitter {
            if let Err(err) = emitter.emit_report(report) {
                tracing::warn!(
                    target: "offline::recovery",
                    error = %err,
                    "failed to emit recovery report"
                );
            }
        }
        tracing::info!(
            target: "offline::recovery",
            pending = report.pending_actions,
            failed = report.failed_actions,
            journal_events = report.journal_events,
            "startup recovery completed"
        );
    }

    fn emit_failure(&self, message: &str) {
        if let Some(emitter) = &self.emitter {
            if let Err(err) = emitter.emit_failure(message) {
                tracing::warn!(
                    target: "offline::recovery",
                    error = %err,
                    "failed to emit recovery failure event"
                );
            }
        }
        tracing::error!(
            target: "offline::recovery",
            error = message,
            "startup recovery failed"
        );
    }
}
