use crate::application::ports::session_store::SessionStore;
use crate::domain::entities::TenantSession;
use crate::domain::value_objects::{StaffRole, TenantId};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Pool, Sqlite};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
struct SessionRow {
    pub tenant_id: String,
    pub user_id: String,
    pub role: String,
    pub issued_at: i64,
    pub expires_at: i64,
}

impl TryFrom<SessionRow> for TenantSession {
    type Error = AppError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let issued_at = Utc
            .timestamp_opt(row.issued_at, 0)
            .single()
            .ok_or_else(|| AppError::Database(format!("invalid issued_at: {}", row.issued_at)))?;
        let expires_at = Utc
            .timestamp_opt(row.expires_at, 0)
            .single()
            .ok_or_else(|| {
                AppError::Database(format!("invalid expires_at: {}", row.expires_at))
            })?;

        Ok(TenantSession {
            tenant_id: TenantId::new(row.tenant_id).map_err(AppError::Database)?,
            user_id: row.user_id,
            role: StaffRole::from(row.role.as_str()),
            issued_at,
            expires_at,
        })
    }
}

/// Persists the single local session in a one-row table; `save` replaces
/// whatever was there before.
pub struct SqliteSessionStore {
    pool: Pool<Sqlite>,
}

impl SqliteSessionStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn load(&self) -> Result<Option<TenantSession>, AppError> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT tenant_id, user_id, role, issued_at, expires_at FROM local_sessions WHERE slot = 0",
        )
        .fetch_optional(&self.pool)
        .await?;

        row.map(TenantSession::try_from).transpose()
    }

    async fn save(&self, session: &TenantSession) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO local_sessions (slot, tenant_id, user_id, role, issued_at, expires_at)
            VALUES (0, ?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (slot) DO UPDATE SET
                tenant_id = excluded.tenant_id,
                user_id = excluded.user_id,
                role = excluded.role,
                issued_at = excluded.issued_at,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(session.tenant_id.as_str())
        .bind(&session.user_id)
        .bind(session.role.as_str())
        .bind(session.issued_at.timestamp())
        .bind(session.expires_at.timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn clear(&self) -> Result<(), AppError> {
        sqlx::query("DELETE FROM local_sessions WHERE slot = 0")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
