use crate::domain::entities::OfflineActionRecord;
use crate::domain::value_objects::{ActionId, ActionKind, ActionPayload, ActionStatus, TenantId};
use crate::shared::error::AppError;
use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OfflineActionRow {
    pub id: i64,
    pub tenant_id: String,
    pub action_id: String,
    pub kind: String,
    pub payload: String,
    pub status: String,
    pub error_message: Option<String>,
    pub attempt_count: i64,
    pub created_at: i64,
    pub synced_at: Option<i64>,
}

impl TryFrom<OfflineActionRow> for OfflineActionRecord {
    type Error = AppError;

    fn try_from(row: OfflineActionRow) -> Result<Self, Self::Error> {
        let payload = ActionPayload::from_json_str(&row.payload)
            .map_err(AppError::SerializationError)?;
        let created_at = Utc
            .timestamp_opt(row.created_at, 0)
            .single()
            .ok_or_else(|| AppError::Database(format!("invalid created_at: {}", row.created_at)))?;
        let synced_at = match row.synced_at {
            Some(ts) => Some(
                Utc.timestamp_opt(ts, 0)
                    .single()
                    .ok_or_else(|| AppError::Database(format!("invalid synced_at: {ts}")))?,
            ),
            None => None,
        };

        Ok(OfflineActionRecord {
            record_id: Some(row.id),
            action_id: ActionId::new(row.action_id).map_err(AppError::Database)?,
            tenant_id: TenantId::new(row.tenant_id).map_err(AppError::Database)?,
            kind: ActionKind::from(row.kind.as_str()),
            payload,
            status: ActionStatus::from(row.status.as_str()),
            error_message: row.error_message,
            attempt_count: row.attempt_count.max(0) as u32,
            created_at,
            synced_at,
        })
    }
}
