use gavel_core::models::Event;
use gavel_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Repository for events
#[derive(Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "events", db.operation = "select", db.record_id = %id))]
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Event>, AppError> {
        let event = sqlx::query_as::<Postgres, Event>("SELECT * FROM events WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(event)
    }

    #[tracing::instrument(skip(self), fields(db.table = "events", db.operation = "select"))]
    pub async fn list_by_organization(&self, organization_id: Uuid) -> Result<Vec<Event>, AppError> {
        let events = sqlx::query_as::<Postgres, Event>(
            "SELECT * FROM events WHERE organization_id = $1 ORDER BY event_date DESC",
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }
}
