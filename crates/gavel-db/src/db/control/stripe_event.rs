use gavel_core::models::StripeEventLog;
use gavel_core::AppError;
use serde_json::Value as JsonValue;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Repository for the payment-provider idempotency ledger.
///
/// The unique index on `provider_event_id` is the de-duplication boundary for
/// at-least-once webhook delivery: concurrent deliveries of the same event id
/// resolve through `ON CONFLICT DO NOTHING` plus a re-read, never through
/// application-level locking.
#[derive(Clone)]
pub struct StripeEventRepository {
    pool: PgPool,
}

impl StripeEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a ledger row for the event if none exists, then return the
    /// current row either way. The returned row's `processed` flag tells the
    /// caller whether this delivery is a duplicate of completed work.
    #[tracing::instrument(skip(self, payload), fields(db.table = "stripe_events", db.operation = "upsert"))]
    pub async fn log_event(
        &self,
        provider_event_id: &str,
        event_type: &str,
        payload: &JsonValue,
    ) -> Result<StripeEventLog, AppError> {
        sqlx::query(
            r#"
            INSERT INTO stripe_events (id, provider_event_id, event_type, payload, processed)
            VALUES ($1, $2, $3, $4, false)
            ON CONFLICT (provider_event_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(provider_event_id)
        .bind(event_type)
        .bind(payload)
        .execute(&self.pool)
        .await?;

        let log = sqlx::query_as::<Postgres, StripeEventLog>(
            "SELECT * FROM stripe_events WHERE provider_event_id = $1",
        )
        .bind(provider_event_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(log)
    }

    /// Mark the row processed. Only called after the handler returned without
    /// error; clears any error message from earlier attempts.
    #[tracing::instrument(skip(self), fields(db.table = "stripe_events", db.operation = "update", db.record_id = %id))]
    pub async fn mark_processed(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE stripe_events
            SET processed = true, processed_at = NOW(), error_message = NULL
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Persist a handler failure on the row while leaving it unprocessed, so
    /// the failure is observable via the admin triage view.
    #[tracing::instrument(skip(self, error_message), fields(db.table = "stripe_events", db.operation = "update", db.record_id = %id))]
    pub async fn record_error(&self, id: Uuid, error_message: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE stripe_events SET error_message = $2 WHERE id = $1")
            .bind(id)
            .bind(error_message)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "stripe_events", db.operation = "select"))]
    pub async fn list_unprocessed(&self, limit: i64) -> Result<Vec<StripeEventLog>, AppError> {
        let logs = sqlx::query_as::<Postgres, StripeEventLog>(
            r#"
            SELECT * FROM stripe_events
            WHERE processed = false
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(logs)
    }
}
