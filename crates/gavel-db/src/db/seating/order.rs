use chrono::Utc;
use gavel_core::models::{Order, OrderSeatUsage, OrderStatus};
use gavel_core::AppError;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Repository for orders
///
/// Seat arithmetic (purchased seats, per-order usage) is always computed from
/// the authoritative rows, never cached: orders and assignments are mutated
/// independently by checkout, webhook reconciliation, and guest management.
#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a PENDING order. Committed on its own, before the provider
    /// round-trip: a pending order is not a seat reservation, so no
    /// transaction spans the payment-intent call.
    #[tracing::instrument(skip(self), fields(db.table = "orders", db.operation = "insert"))]
    #[allow(clippy::too_many_arguments)]
    pub async fn create_pending(
        &self,
        organization_id: Uuid,
        event_id: Uuid,
        user_id: Uuid,
        product_id: Uuid,
        table_id: Option<Uuid>,
        promo_code_id: Option<Uuid>,
        quantity: i32,
        amount_cents: i64,
        discount_cents: i64,
    ) -> Result<Order, AppError> {
        let order = sqlx::query_as::<Postgres, Order>(
            r#"
            INSERT INTO orders
                (id, organization_id, event_id, user_id, product_id, table_id,
                 promo_code_id, status, quantity, amount_cents, discount_cents)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(organization_id)
        .bind(event_id)
        .bind(user_id)
        .bind(product_id)
        .bind(table_id)
        .bind(promo_code_id)
        .bind(OrderStatus::Pending)
        .bind(quantity)
        .bind(amount_cents)
        .bind(discount_cents)
        .fetch_one(&self.pool)
        .await?;

        Ok(order)
    }

    /// Create an order already COMPLETED, inside an enclosing transaction.
    /// Used by the zero-cost checkout path.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_completed_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        organization_id: Uuid,
        event_id: Uuid,
        user_id: Uuid,
        product_id: Uuid,
        table_id: Option<Uuid>,
        promo_code_id: Option<Uuid>,
        quantity: i32,
        amount_cents: i64,
        discount_cents: i64,
    ) -> Result<Order, AppError> {
        let order = sqlx::query_as::<Postgres, Order>(
            r#"
            INSERT INTO orders
                (id, organization_id, event_id, user_id, product_id, table_id,
                 promo_code_id, status, quantity, amount_cents, discount_cents, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(organization_id)
        .bind(event_id)
        .bind(user_id)
        .bind(product_id)
        .bind(table_id)
        .bind(promo_code_id)
        .bind(OrderStatus::Completed)
        .bind(quantity)
        .bind(amount_cents)
        .bind(discount_cents)
        .bind(Utc::now())
        .fetch_one(&mut **tx)
        .await?;

        Ok(order)
    }

    /// Persist the provider intent id after intent creation succeeds.
    #[tracing::instrument(skip(self), fields(db.table = "orders", db.operation = "update", db.record_id = %id))]
    pub async fn set_payment_intent(
        &self,
        id: Uuid,
        payment_intent_id: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE orders SET stripe_payment_intent_id = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(payment_intent_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "orders", db.operation = "select", db.record_id = %id))]
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Order>, AppError> {
        let order = sqlx::query_as::<Postgres, Order>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(order)
    }

    #[tracing::instrument(skip(self), fields(db.table = "orders", db.operation = "select"))]
    pub async fn get_by_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<Order>, AppError> {
        let order = sqlx::query_as::<Postgres, Order>(
            "SELECT * FROM orders WHERE stripe_payment_intent_id = $1",
        )
        .bind(payment_intent_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    /// Transaction-scoped lookup, used by the webhook so the completion check
    /// and update see a consistent row.
    pub async fn get_by_payment_intent_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        payment_intent_id: &str,
    ) -> Result<Option<Order>, AppError> {
        let order = sqlx::query_as::<Postgres, Order>(
            "SELECT * FROM orders WHERE stripe_payment_intent_id = $1 FOR UPDATE",
        )
        .bind(payment_intent_id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(order)
    }

    /// Mark an order COMPLETED with its table linkage and charge id.
    pub async fn complete_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        table_id: Option<Uuid>,
        charge_id: Option<&str>,
    ) -> Result<Order, AppError> {
        let order = sqlx::query_as::<Postgres, Order>(
            r#"
            UPDATE orders
            SET status = $2,
                table_id = COALESCE($3, table_id),
                stripe_charge_id = COALESCE($4, stripe_charge_id),
                completed_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(OrderStatus::Completed)
        .bind(table_id)
        .bind(charge_id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(order)
    }

    /// Annotate a failed payment on a still-PENDING order. The order stays
    /// PENDING so the buyer can retry; terminal states are never set here.
    #[tracing::instrument(skip(self, reason), fields(db.table = "orders", db.operation = "update"))]
    pub async fn annotate_failure(
        &self,
        payment_intent_id: &str,
        reason: &str,
    ) -> Result<Option<Order>, AppError> {
        let order = sqlx::query_as::<Postgres, Order>(
            r#"
            UPDATE orders
            SET failure_reason = $2, updated_at = NOW()
            WHERE stripe_payment_intent_id = $1 AND status = $3
            RETURNING *
            "#,
        )
        .bind(payment_intent_id)
        .bind(reason)
        .bind(OrderStatus::Pending)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    /// Sum of quantity over COMPLETED orders at the table: the number of
    /// purchased seats.
    #[tracing::instrument(skip(self), fields(db.table = "orders", db.operation = "select"))]
    pub async fn completed_seats(&self, table_id: Uuid) -> Result<i64, AppError> {
        let seats: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity), 0) FROM orders WHERE table_id = $1 AND status = $2",
        )
        .bind(table_id)
        .bind(OrderStatus::Completed)
        .fetch_one(&self.pool)
        .await?;

        Ok(seats)
    }

    /// Transaction-scoped variant, for capacity re-checks under the table
    /// row lock.
    pub async fn completed_seats_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        table_id: Uuid,
    ) -> Result<i64, AppError> {
        let seats: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity), 0) FROM orders WHERE table_id = $1 AND status = $2",
        )
        .bind(table_id)
        .bind(OrderStatus::Completed)
        .fetch_one(&mut **tx)
        .await?;

        Ok(seats)
    }

    /// Per-order seat usage for the table's COMPLETED orders, oldest first.
    /// The ordering is part of the contract: seat claims attribute to the
    /// first-created order with room.
    pub async fn seat_usage_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        table_id: Uuid,
    ) -> Result<Vec<OrderSeatUsage>, AppError> {
        let usages = sqlx::query_as::<Postgres, OrderSeatUsage>(
            r#"
            SELECT o.id AS order_id,
                   o.quantity,
                   COUNT(g.id) AS assigned_seats,
                   o.created_at
            FROM orders o
            LEFT JOIN guest_assignments g ON g.order_id = o.id
            WHERE o.table_id = $1 AND o.status = $2
            GROUP BY o.id, o.quantity, o.created_at
            ORDER BY o.created_at ASC, o.id ASC
            "#,
        )
        .bind(table_id)
        .bind(OrderStatus::Completed)
        .fetch_all(&mut **tx)
        .await?;

        Ok(usages)
    }
}
