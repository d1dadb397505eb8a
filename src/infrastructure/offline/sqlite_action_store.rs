use crate::application::ports::action_store::ActionStore;
use crate::domain::entities::OfflineActionRecord;
use crate::domain::value_objects::{ActionId, ActionStatus, TenantId};
use crate::infrastructure::offline::rows::OfflineActionRow;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite};

pub struct SqliteActionStore {
    pool: Pool<Sqlite>,
}

impl SqliteActionStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActionStore for SqliteActionStore {
    async fn upsert_action(&self, record: &OfflineActionRecord) -> Result<i64, AppError> {
        let payload = serde_json::to_string(record.payload.as_json())?;

        // Re-enqueueing keeps the original created_at so the record holds
        // its FIFO position, and resets a failed record back to pending
        // with a fresh attempt budget.
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO offline_actions (
                tenant_id, action_id, kind, payload, status, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT (tenant_id, action_id) DO UPDATE SET
                kind = excluded.kind,
                payload = excluded.payload,
                status = excluded.status,
                error_message = NULL,
                attempt_count = 0
            RETURNING id
            "#,
        )
        .bind(record.tenant_id.as_str())
        .bind(record.action_id.as_str())
        .bind(record.kind.as_str())
        .bind(&payload)
        .bind(record.status.as_str())
        .bind(record.created_at.timestamp())
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn list_by_status(
        &self,
        tenant_id: &TenantId,
        status: ActionStatus,
    ) -> Result<Vec<OfflineActionRecord>, AppError> {
        let rows = sqlx::query_as::<_, OfflineActionRow>(
            r#"
            SELECT * FROM offline_actions
            WHERE tenant_id = ?1 AND status = ?2
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(tenant_id.as_str())
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(OfflineActionRecord::try_from).collect()
    }

    async fn mark_synced(
        &self,
        tenant_id: &TenantId,
        action_id: &ActionId,
        synced_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE offline_actions
            SET status = 'synced', synced_at = ?1, error_message = NULL
            WHERE tenant_id = ?2 AND action_id = ?3
            "#,
        )
        .bind(synced_at.timestamp())
        .bind(tenant_id.as_str())
        .bind(action_id.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_failed(
        &self,
        tenant_id: &TenantId,
        action_id: &ActionId,
        error: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE offline_actions
            SET status = 'failed', error_message = ?1,
                attempt_count = attempt_count + 1
            WHERE tenant_id = ?2 AND action_id = ?3
            "#,
        )
        .bind(error)
        .bind(tenant_id.as_str())
        .bind(action_id.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn count_by_status(
        &self,
        tenant_id: &TenantId,
        status: ActionStatus,
    ) -> Result<u64, AppError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM offline_actions WHERE tenant_id = ?1 AND status = ?2",
        )
        .bind(tenant_id.as_str())
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(count as u64)
    }

    async fn delete_synced_before(
        &self,
        tenant_id: &TenantId,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            DELETE FROM offline_actions
            WHERE tenant_id = ?1 AND status = 'synced' AND created_at < ?2
            "#,
        )
        .bind(tenant_id.as_str())
        .bind(cutoff.timestamp())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{ActionKind, ActionPayload};
    use chrono::Duration;
    use serde_json::json;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_store() -> SqliteActionStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        SqliteActionStore::new(pool)
    }

    fn tenant() -> TenantId {
        TenantId::new("grand-plaza".into()).unwrap()
    }

    fn record(action_id: &str, created_at: DateTime<Utc>) -> OfflineActionRecord {
        OfflineActionRecord {
            record_id: None,
            action_id: ActionId::parse(action_id).unwrap(),
            tenant_id: tenant(),
            kind: ActionKind::FolioCharge,
            payload: ActionPayload::new(json!({"amount_minor": 100})).unwrap(),
            status: ActionStatus::Pending,
            error_message: None,
            attempt_count: 0,
            created_at,
            synced_at: None,
        }
    }

    #[tokio::test]
    async fn upsert_is_idempotent_per_action_id() {
        let store = setup_store().await;
        let now = Utc::now();

        let first = store.upsert_action(&record("a1", now)).await.unwrap();
        let second = store.upsert_action(&record("a1", now)).await.unwrap();
        assert_eq!(first, second);

        let pending = store
            .list_by_status(&tenant(), ActionStatus::Pending)
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
    }

    #[tokio::test]
    async fn reenqueue_resets_failed_record_to_pending() {
        let store = setup_store().await;
        let now = Utc::now();

        store.upsert_action(&record("a1", now)).await.unwrap();
        store
            .mark_failed(&tenant(), &ActionId::parse("a1").unwrap(), "boom")
            .await
            .unwrap();
        store.upsert_action(&record("a1", now)).await.unwrap();

        let pending = store
            .list_by_status(&tenant(), ActionStatus::Pending)
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert!(pending[0].error_message.is_none());
        assert_eq!(pending[0].attempt_count, 0);
    }

    #[tokio::test]
    async fn mark_failed_counts_attempts() {
        let store = setup_store().await;
        let id = ActionId::parse("a1").unwrap();
        store.upsert_action(&record("a1", Utc::now())).await.unwrap();

        store.mark_failed(&tenant(), &id, "timeout").await.unwrap();
        store.mark_failed(&tenant(), &id, "timeout").await.unwrap();

        let failed = store
            .list_by_status(&tenant(), ActionStatus::Failed)
            .await
            .unwrap();
        assert_eq!(failed[0].attempt_count, 2);
    }

    #[tokio::test]
    async fn listing_is_fifo_by_created_at() {
        let store = setup_store().await;
        let base = Utc::now();

        store
            .upsert_action(&record("newer", base + Duration::seconds(10)))
            .await
            .unwrap();
        store.upsert_action(&record("older", base)).await.unwrap();

        let pending = store
            .list_by_status(&tenant(), ActionStatus::Pending)
            .await
            .unwrap();
        assert_eq!(pending[0].action_id.as_str(), "older");
        assert_eq!(pending[1].action_id.as_str(), "newer");
    }

    #[tokio::test]
    async fn mark_transitions_and_counts() {
        let store = setup_store().await;
        let now = Utc::now();
        store.upsert_action(&record("a1", now)).await.unwrap();
        store.upsert_action(&record("a2", now)).await.unwrap();

        store
            .mark_synced(&tenant(), &ActionId::parse("a1").unwrap(), now)
            .await
            .unwrap();
        store
            .mark_failed(&tenant(), &ActionId::parse("a2").unwrap(), "timeout")
            .await
            .unwrap();

        assert_eq!(
            store
                .count_by_status(&tenant(), ActionStatus::Synced)
                .await
                .unwrap(),
            1
        );
        assert_eq!(
            store
                .count_by_status(&tenant(), ActionStatus::Failed)
                .await
                .unwrap(),
            1
        );

        let failed = store
            .list_by_status(&tenant(), ActionStatus::Failed)
            .await
            .unwrap();
        assert_eq!(failed[0].error_message.as_deref(), Some("timeout"));
    }

    #[tokio::test]
    async fn marking_an_absent_record_is_a_noop() {
        let store = setup_store().await;
        store
            .mark_synced(&tenant(), &ActionId::parse("ghost").unwrap(), Utc::now())
            .await
            .unwrap();
        store
            .mark_failed(&tenant(), &ActionId::parse("ghost").unwrap(), "x")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn retention_deletes_only_old_synced_records() {
        let store = setup_store().await;
        let old = Utc::now() - Duration::days(30);
        let recent = Utc::now();

        store.upsert_action(&record("old-synced", old)).await.unwrap();
        store
            .upsert_action(&record("old-pending", old))
            .await
            .unwrap();
        store
            .upsert_action(&record("new-synced", recent))
            .await
            .unwrap();

        store
            .mark_synced(&tenant(), &ActionId::parse("old-synced").unwrap(), recent)
            .await
            .unwrap();
        store
            .mark_synced(&tenant(), &ActionId::parse("new-synced").unwrap(), recent)
            .await
            .unwrap();

        let removed = store
            .delete_synced_before(&tenant(), Utc::now() - Duration::days(7))
            .await
            .unwrap();
        assert_eq!(removed, 1);

        assert_eq!(
            store
                .count_by_status(&tenant(), ActionStatus::Pending)
                .await
                .unwrap(),
            1
        );
        assert_eq!(
            store
                .count_by_status(&tenant(), ActionStatus::Synced)
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn tenants_are_isolated() {
        let store = setup_store().await;
        let mut other = record("a1", Utc::now());
        other.tenant_id = TenantId::new("seaside-inn".into()).unwrap();

        store.upsert_action(&record("a1", Utc::now())).await.unwrap();
        store.upsert_action(&other).await.unwrap();

        let pending = store
            .list_by_status(&tenant(), ActionStatus::Pending)
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].tenant_id.as_str(), "grand-plaza");
    }
}
