use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionStatus {
    Pending,
    Synced,
    Failed,
    Unknown(String),
}

impl ActionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ActionStatus::Pending => "pending",
            ActionStatus::Synced => "synced",
            ActionStatus::Failed => "failed",
            ActionStatus::Unknown(value) => value.as_str(),
        }
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for ActionStatus {
    fn from(value: &str) -> Self {
        match value {
            "pending" => ActionStatus::Pending,
            "synced" => ActionStatus::Synced,
            "failed" => ActionStatus::Failed,
            other => ActionStatus::Unknown(other.to_string()),
        }
    }
}
