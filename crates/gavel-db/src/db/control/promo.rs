use gavel_core::models::PromoCode;
use gavel_core::AppError;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Repository for promo codes
#[derive(Clone)]
pub struct PromoCodeRepository {
    pool: PgPool,
}

impl PromoCodeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "promo_codes", db.operation = "select", db.record_id = %id))]
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<PromoCode>, AppError> {
        let promo = sqlx::query_as::<Postgres, PromoCode>("SELECT * FROM promo_codes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(promo)
    }

    /// Look up a code scoped to an event, case-insensitively.
    #[tracing::instrument(skip(self), fields(db.table = "promo_codes", db.operation = "select"))]
    pub async fn find_by_code(
        &self,
        event_id: Uuid,
        code: &str,
    ) -> Result<Option<PromoCode>, AppError> {
        let promo = sqlx::query_as::<Postgres, PromoCode>(
            "SELECT * FROM promo_codes WHERE event_id = $1 AND UPPER(code) = UPPER($2)",
        )
        .bind(event_id)
        .bind(code.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(promo)
    }

    /// Record one redemption inside the completing transaction.
    pub async fn increment_uses_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE promo_codes SET current_uses = current_uses + 1, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}
