use crate::domain::entities::offline_action::WriteOperation;
use crate::domain::value_objects::{ActionKind, BookingId, FolioId, RequestId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FolioEventKind {
    ChargePosted,
    TransactionVoided,
    Unknown(String),
}

impl FolioEventKind {
    pub fn as_str(&self) -> &str {
        match self {
            FolioEventKind::ChargePosted => "charge_posted",
            FolioEventKind::TransactionVoided => "transaction_voided",
            FolioEventKind::Unknown(value) => value.as_str(),
        }
    }
}

impl From<&str> for FolioEventKind {
    fn from(value: &str) -> Self {
        match value {
            "charge_posted" => FolioEventKind::ChargePosted,
            "transaction_voided" => FolioEventKind::TransactionVoided,
            other => FolioEventKind::Unknown(other.to_string()),
        }
    }
}

/// Amounts are integer minor units end to end; folio math never touches
/// floating point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolioEventPayload {
    pub amount_minor: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub void_reason: Option<String>,
    /// For voids: the `request_id` of the charge being reversed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_request_id: Option<RequestId>,
}

/// Append-only record of a financial intent. Events are never edited or
/// deleted; local folio state is always a pure fold over them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolioEvent {
    pub kind: FolioEventKind,
    pub folio_id: FolioId,
    pub booking_id: BookingId,
    pub request_id: RequestId,
    pub recorded_at: DateTime<Utc>,
    pub payload: FolioEventPayload,
}

impl FolioEvent {
    /// Extracts the journal entry a write operation implies.
    ///
    /// Returns `Ok(None)` for kinds that do not touch a folio, and an error
    /// when a folio-affecting payload is missing its required fields - that
    /// is checked before anything is persisted.
    pub fn from_operation(op: &WriteOperation) -> Result<Option<FolioEvent>, String> {
        let kind = match op.kind {
            ActionKind::FolioCharge => FolioEventKind::ChargePosted,
            ActionKind::FolioVoid => FolioEventKind::TransactionVoided,
            _ => return Ok(None),
        };

        let folio_id = op
            .payload
            .get_str("folio_id")
            .ok_or_else(|| "folio payload is missing folio_id".to_string())
            .and_then(|v| FolioId::new(v.to_string()))?;
        let booking_id = op
            .payload
            .get_str("booking_id")
            .ok_or_else(|| "folio payload is missing booking_id".to_string())
            .and_then(|v| BookingId::new(v.to_string()))?;
        let request_id = op
            .payload
            .get_str("request_id")
            .ok_or_else(|| "folio payload is missing request_id".to_string())
            .and_then(|v| RequestId::new(v.to_string()))?;
        let amount_minor = op
            .payload
            .get_i64("amount_minor")
            .ok_or_else(|| "folio payload is missing amount_minor".to_string())?;

        let reference_request_id = match op.payload.get_str("reference_request_id") {
            Some(value) => Some(RequestId::new(value.to_string())?),
            None => None,
        };
        if kind == FolioEventKind::TransactionVoided && reference_request_id.is_none() {
            return Err("void payload is missing reference_request_id".to_string());
        }

        Ok(Some(FolioEvent {
            kind,
            folio_id,
            booking_id,
            request_id,
            recorded_at: Utc::now(),
            payload: FolioEventPayload {
                amount_minor,
                description: op.payload.get_str("description").map(str::to_string),
                department: op.payload.get_str("department").map(str::to_string),
                actor: op.payload.get_str("actor").map(str::to_string),
                void_reason: op.payload.get_str("void_reason").map(str::to_string),
                reference_request_id,
            },
        }))
    }
}

/// The product of replaying one folio's events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolioBalance {
    pub folio_id: FolioId,
    pub outstanding_minor: i64,
    pub charge_count: u32,
    pub void_count: u32,
    pub event_count: u32,
}

impl FolioBalance {
    pub fn empty(folio_id: FolioId) -> Self {
        Self {
            folio_id,
            outstanding_minor: 0,
            charge_count: 0,
            void_count: 0,
            event_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{ActionId, ActionPayload};
    use serde_json::json;

    fn charge_op() -> WriteOperation {
        WriteOperation::new(
            ActionId::generate(),
            ActionKind::FolioCharge,
            ActionPayload::new(json!({
                "folio_id": "folio-1",
                "booking_id": "booking-1",
                "request_id": "req-1",
                "amount_minor": 5000,
                "description": "Minibar",
            }))
            .unwrap(),
        )
    }

    #[test]
    fn charge_operation_yields_journal_event() {
        let event = FolioEvent::from_operation(&charge_op()).unwrap().unwrap();
        assert_eq!(event.kind, FolioEventKind::ChargePosted);
        assert_eq!(event.folio_id.as_str(), "folio-1");
        assert_eq!(event.payload.amount_minor, 5000);
    }

    #[test]
    fn non_folio_operation_yields_nothing() {
        let op = WriteOperation::new(
            ActionId::generate(),
            ActionKind::RoomStatus,
            ActionPayload::new(json!({"room": "101", "state": "clean"})).unwrap(),
        );
        assert!(FolioEvent::from_operation(&op).unwrap().is_none());
    }

    #[test]
    fn void_without_reference_is_rejected() {
        let op = WriteOperation::new(
            ActionId::generate(),
            ActionKind::FolioVoid,
            ActionPayload::new(json!({
                "folio_id": "folio-1",
                "booking_id": "booking-1",
                "request_id": "req-2",
                "amount_minor": 5000,
            }))
            .unwrap(),
        );
        assert!(FolioEvent::from_operation(&op).is_err());
    }
}
