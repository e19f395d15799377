//! Order fulfillment
//!
//! The one place a paid-for order turns into committed seating state: the
//! COMPLETED order row, the table (for flows that create one), the buyer's
//! own guest assignment, role rows, promo usage, and the audit entries. Both
//! the zero-cost checkout path and the webhook reconciliation run through
//! here, inside a transaction owned by the caller's entry point, so partial
//! application cannot occur.

use gavel_core::models::{
    ActivityAction, Order, OrderFlow, OrderStatus, Product, Table, TableRole, TableType, User,
};
use gavel_core::AppError;
use gavel_db::{
    ActivityLogRepository, GuestAssignmentRepository, OrderRepository, PromoCodeRepository,
    TableRepository, TableRoleRepository,
};
use serde_json::json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Inputs to a fulfillment run.
pub struct FulfillArgs {
    pub buyer: User,
    pub product: Product,
    /// Seat quantity of the order. For full-table flows this is the table
    /// capacity.
    pub quantity: i32,
    pub flow: OrderFlow,
    /// PENDING order to complete; when absent (webhook racing ahead of the
    /// intent-id persist) a COMPLETED order is created from scratch.
    pub existing_order: Option<Order>,
    /// Target table for the individual-at-table flow.
    pub table_id: Option<Uuid>,
    /// Name for the table created by full-table / captain flows.
    pub table_name: Option<String>,
    pub promo_code_id: Option<Uuid>,
    pub amount_cents: i64,
    pub discount_cents: i64,
    pub charge_id: Option<String>,
    /// Audit actor; None for provider-initiated completion.
    pub actor_user_id: Option<Uuid>,
}

/// What a fulfillment run produced.
pub struct FulfillOutcome {
    pub order: Order,
    pub table: Option<Table>,
    pub guest_assignment_id: Option<Uuid>,
    pub created_table: bool,
}

/// Transactional completion of an order into seats, tables, and assignments.
#[derive(Clone)]
pub struct OrderFulfillment {
    tables: TableRepository,
    orders: OrderRepository,
    guests: GuestAssignmentRepository,
    roles: TableRoleRepository,
    promos: PromoCodeRepository,
    activity: ActivityLogRepository,
}

impl OrderFulfillment {
    pub fn new(pool: PgPool) -> Self {
        Self {
            tables: TableRepository::new(pool.clone()),
            orders: OrderRepository::new(pool.clone()),
            guests: GuestAssignmentRepository::new(pool.clone()),
            roles: TableRoleRepository::new(pool.clone()),
            promos: PromoCodeRepository::new(pool.clone()),
            activity: ActivityLogRepository::new(pool),
        }
    }

    /// Run fulfillment inside the caller's transaction.
    ///
    /// Idempotent against replays at two levels: an already-COMPLETED order
    /// short-circuits, and a pre-existing (table, user) assignment for the
    /// buyer is kept rather than duplicated.
    pub async fn fulfill(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        args: FulfillArgs,
    ) -> Result<FulfillOutcome, AppError> {
        if let Some(ref order) = args.existing_order {
            if order.status == OrderStatus::Completed {
                return Ok(FulfillOutcome {
                    order: order.clone(),
                    table: None,
                    guest_assignment_id: None,
                    created_table: false,
                });
            }
        }

        let organization_id = args.product.organization_id;
        let event_id = args.product.event_id;

        // Resolve or create the table for this flow.
        let (table, created_table) = match args.flow {
            OrderFlow::FullTable => {
                let table = self
                    .create_owned_table(tx, &args, TableType::Prepaid, TableRole::Owner)
                    .await?;
                (Some(table), true)
            }
            OrderFlow::CaptainCommitment => {
                let table = self
                    .create_owned_table(tx, &args, TableType::CaptainPayg, TableRole::Captain)
                    .await?;
                (Some(table), true)
            }
            OrderFlow::IndividualAtTable => {
                let table_id = args.table_id.ok_or_else(|| {
                    AppError::InvalidInput("Missing table for individual-at-table order".to_string())
                })?;
                let table = self
                    .tables
                    .get_for_update_tx(tx, table_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Table not found".to_string()))?;
                if table.event_id != event_id {
                    return Err(AppError::InvalidInput(
                        "Table does not belong to this event".to_string(),
                    ));
                }
                // Re-check capacity under the row lock; two concurrent
                // completions for the last seats serialize here.
                let purchased = self.orders.completed_seats_tx(tx, table.id).await?;
                if purchased + args.quantity as i64 > table.capacity as i64 {
                    return Err(AppError::Conflict(
                        "Table does not have enough remaining seats".to_string(),
                    ));
                }
                (Some(table), false)
            }
            OrderFlow::Individual => (None, false),
        };
        let table_id = table.as_ref().map(|t| t.id);

        let order = match args.existing_order {
            Some(ref existing) => {
                self.orders
                    .complete_tx(tx, existing.id, table_id, args.charge_id.as_deref())
                    .await?
            }
            None => {
                self.orders
                    .create_completed_tx(
                        tx,
                        organization_id,
                        event_id,
                        args.buyer.id,
                        args.product.id,
                        table_id,
                        args.promo_code_id,
                        args.quantity,
                        args.amount_cents,
                        args.discount_cents,
                    )
                    .await?
            }
        };

        // First seat goes to the buyer; remaining purchased seats stay as
        // placeholders with no rows.
        let guest_assignment_id = match table {
            Some(ref table) => {
                let result = self
                    .guests
                    .create_tx(
                        tx,
                        organization_id,
                        event_id,
                        table.id,
                        args.buyer.id,
                        order.id,
                        args.product.tier,
                        args.buyer.name.as_deref(),
                        None,
                    )
                    .await;
                match result {
                    Ok(guest) => Some(guest.id),
                    // Replay or the buyer already holds a seat here; keep it.
                    Err(AppError::Conflict(_)) => None,
                    Err(err) => return Err(err),
                }
            }
            None => None,
        };

        if let Some(promo_code_id) = args.promo_code_id {
            self.promos.increment_uses_tx(tx, promo_code_id).await?;
        }

        if let Some(ref table) = table {
            if created_table {
                self.activity
                    .record_tx(
                        tx,
                        organization_id,
                        Some(event_id),
                        args.actor_user_id,
                        ActivityAction::TableCreated,
                        "table",
                        table.id,
                        json!({
                            "name": table.name,
                            "table_type": table.table_type,
                            "capacity": table.capacity,
                            "reference_code": table.reference_code,
                            "owner_email": args.buyer.email,
                        }),
                    )
                    .await?;
            }
        }

        self.activity
            .record_tx(
                tx,
                organization_id,
                Some(event_id),
                args.actor_user_id,
                ActivityAction::OrderCompleted,
                "order",
                order.id,
                json!({
                    "buyer_email": args.buyer.email,
                    "product_id": args.product.id,
                    "quantity": order.quantity,
                    "amount_cents": order.amount_cents,
                    "discount_cents": order.discount_cents,
                    "flow": args.flow,
                    "table_id": table_id,
                }),
            )
            .await?;

        Ok(FulfillOutcome {
            order,
            table,
            guest_assignment_id,
            created_table,
        })
    }

    /// Create the table a full-table or captain purchase pays for, owned by
    /// the buyer, with the flow's role row.
    async fn create_owned_table(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        args: &FulfillArgs,
        table_type: TableType,
        role: TableRole,
    ) -> Result<Table, AppError> {
        let capacity = match table_type {
            // A full-table order's quantity is the seat count.
            TableType::Prepaid => args.quantity,
            TableType::CaptainPayg => args.product.table_capacity.ok_or_else(|| {
                AppError::InvalidInput(
                    "Captain commitment product has no table capacity".to_string(),
                )
            })?,
        };
        if args.quantity > capacity {
            return Err(AppError::InvalidInput(
                "Order quantity exceeds the table's capacity".to_string(),
            ));
        }

        let name = args
            .table_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| match args.buyer.name {
                Some(ref buyer_name) => format!("{}'s Table", buyer_name),
                None => "New Table".to_string(),
            });

        let table = self
            .tables
            .create_tx(
                tx,
                args.product.organization_id,
                args.product.event_id,
                &name,
                table_type,
                capacity,
                args.buyer.id,
            )
            .await?;

        self.roles.add_tx(tx, table.id, args.buyer.id, role).await?;

        Ok(table)
    }
}
