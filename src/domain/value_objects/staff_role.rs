use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StaffRole {
    Manager,
    FrontDesk,
    Housekeeping,
    Accounting,
    Unknown(String),
}

impl StaffRole {
    pub fn as_str(&self) -> &str {
        match self {
            StaffRole::Manager => "manager",
            StaffRole::FrontDesk => "front_desk",
            StaffRole::Housekeeping => "housekeeping",
            StaffRole::Accounting => "accounting",
            StaffRole::Unknown(value) => value.as_str(),
        }
    }
}

impl fmt::Display for StaffRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for StaffRole {
    fn from(value: &str) -> Self {
        match value {
            "manager" => StaffRole::Manager,
            "front_desk" => StaffRole::FrontDesk,
            "housekeeping" => StaffRole::Housekeeping,
            "accounting" => StaffRole::Accounting,
            other => StaffRole::Unknown(other.to_string()),
        }
    }
}
