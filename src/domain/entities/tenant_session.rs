use crate::domain::value_objects::{StaffRole, TenantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The local binding of a working context: who, for which hotel, with
/// which role, this terminal is operating as. At most one is active per
/// runtime instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TenantSession {
    pub tenant_id: TenantId,
    pub user_id: String,
    pub role: StaffRole,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl TenantSession {
    pub fn new(
        tenant_id: TenantId,
        user_id: String,
        role: StaffRole,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            tenant_id,
            user_id,
            role,
            issued_at,
            expires_at,
        }
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn has_role(&self, role: &StaffRole) -> bool {
        &self.role == role
    }
}
