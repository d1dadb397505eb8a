use crate::application::ports::journal_store::JournalStore;
use crate::application::services::session_service::SessionService;
use crate::domain::entities::{FolioBalance, FolioEvent, FolioEventKind};
use crate::domain::value_objects::FolioId;
use crate::shared::error::AppError;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Appended,
    /// No valid session; nothing was persisted.
    Disabled,
}

/// Lets the system answer "what is this folio's balance right now" without
/// a round trip, by replaying locally known events.
pub struct JournalService {
    store: Arc<dyn JournalStore>,
    session: Arc<SessionService>,
}

impl JournalService {
    pub fn new(store: Arc<dyn JournalStore>, session: Arc<SessionService>) -> Self {
        Self { store, session }
    }

    /// Pure append; called right after any local or queued folio mutation
    /// so an immediate read-back reflects it. Only storage failure errors.
    pub async fn append(&self, event: &FolioEvent) -> Result<AppendOutcome, AppError> {
        let Some(tenant_id) = self.session.active_tenant() else {
            return Ok(AppendOutcome::Disabled);
        };
        self.store.append_event(&tenant_id, event).await?;
        tracing::debug!(
            target: "folio::journal",
            folio = %event.folio_id,
            kind = event.kind.as_str(),
            "folio event appended"
        );
        Ok(AppendOutcome::Appended)
    }

    /// Folds the folio's events in append order into a balance delta.
    pub async fn replay(&self, folio_id: &FolioId) -> Result<FolioBalance, AppError> {
        let events = self.events_for(folio_id).await?;
        Ok(fold_balance(folio_id.clone(), &events))
    }

    /// Ordered, deduplicated raw read for folio views.
    pub async fn events_for(&self, folio_id: &FolioId) -> Result<Vec<FolioEvent>, AppError> {
        let Some(tenant_id) = self.session.active_tenant() else {
            return Ok(Vec::new());
        };
        let events = self.store.events_for_folio(&tenant_id, folio_id).await?;
        Ok(deduplicate(events))
    }
}

/// Drops repeats of `(recorded_at, request_id)` so a retried local write
/// that appended the same event twice cannot corrupt the derived balance.
fn deduplicate(events: Vec<FolioEvent>) -> Vec<FolioEvent> {
    let mut seen: HashSet<(i64, String)> = HashSet::new();
    events
        .into_iter()
        .filter(|event| {
            seen.insert((
                event.recorded_at.timestamp(),
                event.request_id.as_str().to_string(),
            ))
        })
        .collect()
}

/// A charge adds its amount to the outstanding balance; a void reverses
/// the contribution of the charge named by its `reference_request_id`. An
/// unmatched reference contributes zero.
fn fold_balance(folio_id: FolioId, events: &[FolioEvent]) -> FolioBalance {
    let mut balance = FolioBalance::empty(folio_id);
    let mut charges: HashMap<&str, i64> = HashMap::new();

    for event in events {
        balance.event_count += 1;
        match &event.kind {
            FolioEventKind::ChargePosted => {
                balance.outstanding_minor += event.payload.amount_minor;
                charges.insert(event.request_id.as_str(), event.payload.amount_minor);
                balance.charge_count += 1;
            }
            FolioEventKind::TransactionVoided => {
                let reversed = event
                    .payload
                    .reference_request_id
                    .as_ref()
                    .and_then(|reference| charges.get(reference.as_str()).copied())
                    .unwrap_or(0);
                balance.outstanding_minor -= reversed;
                balance.void_count += 1;
            }
            FolioEventKind::Unknown(kind) => {
                tracing::warn!(target: "folio::journal", kind, "skipping unknown folio event kind");
            }
        }
    }

    balance
}
