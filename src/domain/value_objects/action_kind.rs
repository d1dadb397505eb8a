use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a queued write. Each kind maps to exactly one remote operation,
/// shared by the online dispatch path and queued replay. `Unknown` keeps
/// records written by a newer client readable instead of failing the row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Booking,
    Payment,
    RoomStatus,
    FolioCharge,
    FolioVoid,
    Unknown(String),
}

impl ActionKind {
    pub fn as_str(&self) -> &str {
        match self {
            ActionKind::Booking => "booking",
            ActionKind::Payment => "payment",
            ActionKind::RoomStatus => "room_status",
            ActionKind::FolioCharge => "folio_charge",
            ActionKind::FolioVoid => "folio_void",
            ActionKind::Unknown(value) => value.as_str(),
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for ActionKind {
    fn from(value: &str) -> Self {
        match value {
            "booking" => ActionKind::Booking,
            "payment" => ActionKind::Payment,
            "room_status" => ActionKind::RoomStatus,
            "folio_charge" => ActionKind::FolioCharge,
            "folio_void" => ActionKind::FolioVoid,
            other => ActionKind::Unknown(other.to_string()),
        }
    }
}
