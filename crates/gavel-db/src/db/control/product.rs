use gavel_core::models::Product;
use gavel_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Repository for products
#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "products", db.operation = "select", db.record_id = %id))]
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<Postgres, Product>("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    #[tracing::instrument(skip(self), fields(db.table = "products", db.operation = "select"))]
    pub async fn list_active_by_event(&self, event_id: Uuid) -> Result<Vec<Product>, AppError> {
        let products = sqlx::query_as::<Postgres, Product>(
            "SELECT * FROM products WHERE event_id = $1 AND is_active = true ORDER BY price_cents ASC",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }
}
