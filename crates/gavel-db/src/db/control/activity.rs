use gavel_core::models::{ActivityAction, ActivityLog};
use gavel_core::AppError;
use serde_json::Value as JsonValue;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Repository for the append-only activity trail. Rows are never updated or
/// deleted.
#[derive(Clone)]
pub struct ActivityLogRepository {
    pool: PgPool,
}

impl ActivityLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append an entry inside the transaction of the mutation it describes,
    /// so the audit row commits atomically with the change.
    #[allow(clippy::too_many_arguments)]
    pub async fn record_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        organization_id: Uuid,
        event_id: Option<Uuid>,
        actor_user_id: Option<Uuid>,
        action: ActivityAction,
        entity_type: &str,
        entity_id: Uuid,
        metadata: JsonValue,
    ) -> Result<ActivityLog, AppError> {
        let log = sqlx::query_as::<Postgres, ActivityLog>(
            r#"
            INSERT INTO activity_log
                (id, organization_id, event_id, actor_user_id, action, entity_type, entity_id, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(organization_id)
        .bind(event_id)
        .bind(actor_user_id)
        .bind(action)
        .bind(entity_type)
        .bind(entity_id)
        .bind(&metadata)
        .fetch_one(&mut **tx)
        .await?;

        Ok(log)
    }

    /// Append an entry outside any transaction, for single-statement
    /// operations that have already committed.
    #[tracing::instrument(skip(self, metadata), fields(db.table = "activity_log", db.operation = "insert"))]
    #[allow(clippy::too_many_arguments)]
    pub async fn record(
        &self,
        organization_id: Uuid,
        event_id: Option<Uuid>,
        actor_user_id: Option<Uuid>,
        action: ActivityAction,
        entity_type: &str,
        entity_id: Uuid,
        metadata: JsonValue,
    ) -> Result<ActivityLog, AppError> {
        let log = sqlx::query_as::<Postgres, ActivityLog>(
            r#"
            INSERT INTO activity_log
                (id, organization_id, event_id, actor_user_id, action, entity_type, entity_id, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(organization_id)
        .bind(event_id)
        .bind(actor_user_id)
        .bind(action)
        .bind(entity_type)
        .bind(entity_id)
        .bind(&metadata)
        .fetch_one(&self.pool)
        .await?;

        Ok(log)
    }

    #[tracing::instrument(skip(self), fields(db.table = "activity_log", db.operation = "select"))]
    pub async fn list_by_event(
        &self,
        event_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ActivityLog>, AppError> {
        let logs = sqlx::query_as::<Postgres, ActivityLog>(
            r#"
            SELECT * FROM activity_log
            WHERE event_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(event_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(logs)
    }
}
