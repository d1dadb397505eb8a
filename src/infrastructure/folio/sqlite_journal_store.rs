use crate::application::ports::journal_store::JournalStore;
use crate::domain::entities::{FolioEvent, FolioEventKind, FolioEventPayload};
use crate::domain::value_objects::{BookingId, FolioId, RequestId, TenantId};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Pool, Sqlite};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
struct FolioEventRow {
    pub id: i64,
    pub tenant_id: String,
    pub folio_id: String,
    pub booking_id: String,
    pub kind: String,
    pub request_id: String,
    pub payload: String,
    pub recorded_at: i64,
}

impl TryFrom<FolioEventRow> for FolioEvent {
    type Error = AppError;

    fn try_from(row: FolioEventRow) -> Result<Self, Self::Error> {
        let payload: FolioEventPayload = serde_json::from_str(&row.payload)?;
        let recorded_at = Utc
            .timestamp_opt(row.recorded_at, 0)
            .single()
            .ok_or_else(|| {
                AppError::Database(format!("invalid recorded_at: {}", row.recorded_at))
            })?;

        Ok(FolioEvent {
            kind: FolioEventKind::from(row.kind.as_str()),
            folio_id: FolioId::new(row.folio_id).map_err(AppError::Database)?,
            booking_id: BookingId::new(row.booking_id).map_err(AppError::Database)?,
            request_id: RequestId::new(row.request_id).map_err(AppError::Database)?,
            recorded_at,
            payload,
        })
    }
}

/// Append-only journal over the `folio_events` table. No update or delete
/// statement exists in this file on purpose.
pub struct SqliteJournalStore {
    pool: Pool<Sqlite>,
}

impl SqliteJournalStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JournalStore for SqliteJournalStore {
    async fn append_event(
        &self,
        tenant_id: &TenantId,
        event: &FolioEvent,
    ) -> Result<(), AppError> {
        let payload = serde_json::to_string(&event.payload)?;

        sqlx::query(
            r#"
            INSERT INTO folio_events (
                tenant_id, folio_id, booking_id, kind, request_id, payload, recorded_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(tenant_id.as_str())
        .bind(event.folio_id.as_str())
        .bind(event.booking_id.as_str())
        .bind(event.kind.as_str())
        .bind(event.request_id.as_str())
        .bind(&payload)
        .bind(event.recorded_at.timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn events_for_folio(
        &self,
        tenant_id: &TenantId,
        folio_id: &FolioId,
    ) -> Result<Vec<FolioEvent>, AppError> {
        let rows = sqlx::query_as::<_, FolioEventRow>(
            r#"
            SELECT * FROM folio_events
            WHERE tenant_id = ?1 AND folio_id = ?2
            ORDER BY recorded_at ASC, id ASC
            "#,
        )
        .bind(tenant_id.as_str())
        .bind(folio_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(FolioEvent::try_from).collect()
    }

    async fn count_events(&self, tenant_id: &TenantId) -> Result<u64, AppError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM folio_events WHERE tenant_id = ?1")
                .bind(tenant_id.as_str())
                .fetch_one(&self.pool)
                .await?;
        Ok(count as u64)
    }
}
