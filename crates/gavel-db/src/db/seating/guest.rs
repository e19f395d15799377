use gavel_core::models::{GuestAssignment, GuestWithUser, ProductTier};
use gavel_core::{generate_reference_code, AppError, MAX_REFERENCE_CODE_ATTEMPTS};
use sqlx::{Acquire, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::violated_constraint;

const TABLE_USER_CONSTRAINT: &str = "guest_assignments_table_user_key";
const ORG_REFERENCE_CODE_CONSTRAINT: &str = "guest_assignments_org_reference_code_key";

/// Repository for guest assignments
#[derive(Clone)]
pub struct GuestAssignmentRepository {
    pool: PgPool,
}

impl GuestAssignmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create an assignment inside an enclosing transaction.
    ///
    /// The (table, user) unique index is the idempotency guard against
    /// concurrent claims for the same user: a violation maps to `Conflict`.
    /// Reference-code collisions retry with a fresh code up to
    /// [`MAX_REFERENCE_CODE_ATTEMPTS`] times, then fail loudly.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        organization_id: Uuid,
        event_id: Uuid,
        table_id: Uuid,
        user_id: Uuid,
        order_id: Uuid,
        tier: ProductTier,
        display_name: Option<&str>,
        dietary_restrictions: Option<&str>,
    ) -> Result<GuestAssignment, AppError> {
        for _attempt in 0..MAX_REFERENCE_CODE_ATTEMPTS {
            let reference_code = generate_reference_code();

            // Savepoint per attempt: a constraint violation aborts only the
            // savepoint, keeping the enclosing transaction usable for the
            // retry and for the caller's Conflict handling.
            let mut attempt = (&mut *tx).begin().await?;

            let result = sqlx::query_as::<Postgres, GuestAssignment>(
                r#"
                INSERT INTO guest_assignments
                    (id, organization_id, event_id, table_id, user_id, order_id,
                     tier, display_name, reference_code, dietary_restrictions, auction_registered)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, false)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(organization_id)
            .bind(event_id)
            .bind(table_id)
            .bind(user_id)
            .bind(order_id)
            .bind(tier)
            .bind(display_name)
            .bind(&reference_code)
            .bind(dietary_restrictions)
            .fetch_one(&mut *attempt)
            .await;

            match result {
                Ok(guest) => {
                    attempt.commit().await?;
                    return Ok(guest);
                }
                Err(err) => {
                    attempt.rollback().await?;
                    match violated_constraint(&err).as_deref() {
                        Some(TABLE_USER_CONSTRAINT) => {
                            return Err(AppError::Conflict(
                                "Guest is already assigned to this table".to_string(),
                            ));
                        }
                        Some(ORG_REFERENCE_CODE_CONSTRAINT) => {
                            tracing::warn!("Guest reference code collision, retrying");
                            continue;
                        }
                        _ => return Err(err.into()),
                    }
                }
            }
        }

        Err(AppError::Internal(format!(
            "Failed to generate a unique guest reference code after {} attempts",
            MAX_REFERENCE_CODE_ATTEMPTS
        )))
    }

    #[tracing::instrument(skip(self), fields(db.table = "guest_assignments", db.operation = "select", db.record_id = %id))]
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<GuestAssignment>, AppError> {
        let guest =
            sqlx::query_as::<Postgres, GuestAssignment>("SELECT * FROM guest_assignments WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(guest)
    }

    /// Check-in lookup by organization-scoped reference code.
    #[tracing::instrument(skip(self), fields(db.table = "guest_assignments", db.operation = "select"))]
    pub async fn get_by_reference_code(
        &self,
        organization_id: Uuid,
        reference_code: &str,
    ) -> Result<Option<GuestWithUser>, AppError> {
        let guest = sqlx::query_as::<Postgres, GuestWithUser>(
            r#"
            SELECT g.id, g.organization_id, g.event_id, g.table_id, g.user_id, g.order_id,
                   g.tier, g.display_name, g.reference_code, g.checked_in_at,
                   g.dietary_restrictions, g.bidder_number, g.auction_registered, g.created_at,
                   u.email, u.name AS user_name
            FROM guest_assignments g
            JOIN users u ON u.id = g.user_id
            WHERE g.organization_id = $1 AND g.reference_code = $2
            "#,
        )
        .bind(organization_id)
        .bind(reference_code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(guest)
    }

    /// Table roster with guest identities, in seating order.
    #[tracing::instrument(skip(self), fields(db.table = "guest_assignments", db.operation = "select"))]
    pub async fn list_by_table(&self, table_id: Uuid) -> Result<Vec<GuestWithUser>, AppError> {
        let guests = sqlx::query_as::<Postgres, GuestWithUser>(
            r#"
            SELECT g.id, g.organization_id, g.event_id, g.table_id, g.user_id, g.order_id,
                   g.tier, g.display_name, g.reference_code, g.checked_in_at,
                   g.dietary_restrictions, g.bidder_number, g.auction_registered, g.created_at,
                   u.email, u.name AS user_name
            FROM guest_assignments g
            JOIN users u ON u.id = g.user_id
            WHERE g.table_id = $1
            ORDER BY g.created_at ASC
            "#,
        )
        .bind(table_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(guests)
    }

    /// Assignment joined with the guest's identity, for the deletion audit
    /// snapshot (the row is gone after removal).
    #[tracing::instrument(skip(self), fields(db.table = "guest_assignments", db.operation = "select", db.record_id = %id))]
    pub async fn get_with_user(&self, id: Uuid) -> Result<Option<GuestWithUser>, AppError> {
        let guest = sqlx::query_as::<Postgres, GuestWithUser>(
            r#"
            SELECT g.id, g.organization_id, g.event_id, g.table_id, g.user_id, g.order_id,
                   g.tier, g.display_name, g.reference_code, g.checked_in_at,
                   g.dietary_restrictions, g.bidder_number, g.auction_registered, g.created_at,
                   u.email, u.name AS user_name
            FROM guest_assignments g
            JOIN users u ON u.id = g.user_id
            WHERE g.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(guest)
    }

    /// The assignment binding (table, user), if one exists. Backed by the
    /// same unique index that guards concurrent claims.
    #[tracing::instrument(skip(self), fields(db.table = "guest_assignments", db.operation = "select"))]
    pub async fn find_by_table_and_user(
        &self,
        table_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<GuestAssignment>, AppError> {
        let guest = sqlx::query_as::<Postgres, GuestAssignment>(
            "SELECT * FROM guest_assignments WHERE table_id = $1 AND user_id = $2",
        )
        .bind(table_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(guest)
    }

    #[tracing::instrument(skip(self), fields(db.table = "guest_assignments", db.operation = "select"))]
    pub async fn count_for_table(&self, table_id: Uuid) -> Result<i64, AppError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM guest_assignments WHERE table_id = $1")
                .bind(table_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Number of assignments consuming an order, inside a transaction; used
    /// with the table row lock to enforce the per-order seat cap.
    pub async fn count_for_order_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order_id: Uuid,
    ) -> Result<i64, AppError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM guest_assignments WHERE order_id = $1")
                .bind(order_id)
                .fetch_one(&mut **tx)
                .await?;

        Ok(count)
    }

    pub async fn delete_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM guest_assignments WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Update the whitelisted self-service fields inside an enclosing
    /// transaction (the audit entry commits with the change). Identity and
    /// linkage columns are not touched by this statement.
    pub async fn update_details_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        display_name: Option<&str>,
        dietary_restrictions: Option<&str>,
        bidder_number: Option<i32>,
        auction_registered: Option<bool>,
    ) -> Result<GuestAssignment, AppError> {
        let guest = sqlx::query_as::<Postgres, GuestAssignment>(
            r#"
            UPDATE guest_assignments
            SET display_name = COALESCE($2, display_name),
                dietary_restrictions = COALESCE($3, dietary_restrictions),
                bidder_number = COALESCE($4, bidder_number),
                auction_registered = COALESCE($5, auction_registered),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(display_name)
        .bind(dietary_restrictions)
        .bind(bidder_number)
        .bind(auction_registered)
        .fetch_one(&mut **tx)
        .await?;

        Ok(guest)
    }

    /// Mark a guest checked in. Idempotent: a second check-in keeps the first
    /// timestamp.
    pub async fn check_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<GuestAssignment, AppError> {
        let guest = sqlx::query_as::<Postgres, GuestAssignment>(
            r#"
            UPDATE guest_assignments
            SET checked_in_at = COALESCE(checked_in_at, NOW()), updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(guest)
    }

    /// Reassign the ticket to another user inside an enclosing transaction.
    ///
    /// Unless `carry_details` is set, personal fields reset: display name to
    /// the recipient's, dietary restrictions, bidder number, auction
    /// registration, and check-in state are cleared. A recipient already
    /// seated at the table maps to `Conflict` via the (table, user) index.
    pub async fn transfer_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        recipient_user_id: Uuid,
        recipient_display_name: Option<&str>,
        carry_details: bool,
    ) -> Result<GuestAssignment, AppError> {
        let result = if carry_details {
            sqlx::query_as::<Postgres, GuestAssignment>(
                r#"
                UPDATE guest_assignments
                SET user_id = $2, display_name = $3, updated_at = NOW()
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(id)
            .bind(recipient_user_id)
            .bind(recipient_display_name)
            .fetch_one(&mut **tx)
            .await
        } else {
            sqlx::query_as::<Postgres, GuestAssignment>(
                r#"
                UPDATE guest_assignments
                SET user_id = $2,
                    display_name = $3,
                    dietary_restrictions = NULL,
                    bidder_number = NULL,
                    auction_registered = false,
                    checked_in_at = NULL,
                    updated_at = NOW()
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(id)
            .bind(recipient_user_id)
            .bind(recipient_display_name)
            .fetch_one(&mut **tx)
            .await
        };

        result.map_err(|err| match violated_constraint(&err).as_deref() {
            Some(TABLE_USER_CONSTRAINT) => AppError::Conflict(
                "Recipient is already assigned to this table".to_string(),
            ),
            _ => err.into(),
        })
    }
}
