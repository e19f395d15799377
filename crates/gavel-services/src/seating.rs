//! Seat and guest management
//!
//! Placeholder-seat arithmetic and the permission-gated guest operations:
//! claim a seat for a named guest, remove, edit, check in, transfer, and
//! table role management. Placeholder counts are recomputed from the
//! authoritative order and assignment sets on every read; there is no stored
//! counter to drift.

use gavel_core::models::{
    ActivityAction, AddGuestRequest, AddRoleRequest, EditGuestRequest, GuestAssignment,
    GuestWithUser, OrderSeatUsage, Table, TableAction, TableRole, TableSeatSummary,
    TransferTicketRequest,
};
use gavel_core::AppError;
use gavel_db::{
    ActivityLogRepository, GuestAssignmentRepository, OrderRepository, ProductRepository,
    TableRepository, TableRoleRepository, UserRepository,
};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::permissions::{ensure_allowed, PermissionService};

/// Pick the order a new assignment should consume: the first-created order
/// with a free seat. First-come-first-served, not capacity-balanced, so seat
/// attribution stays deterministic and auditable. `usages` arrive
/// oldest-first from the repository.
pub fn pick_claim_order(usages: &[OrderSeatUsage]) -> Option<&OrderSeatUsage> {
    usages.iter().find(|u| u.remaining_seats() > 0)
}

/// Seating service
#[derive(Clone)]
pub struct SeatingService {
    pool: PgPool,
    permissions: PermissionService,
    users: UserRepository,
    tables: TableRepository,
    orders: OrderRepository,
    guests: GuestAssignmentRepository,
    roles: TableRoleRepository,
    products: ProductRepository,
    activity: ActivityLogRepository,
}

impl SeatingService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            permissions: PermissionService::new(pool.clone()),
            users: UserRepository::new(pool.clone()),
            tables: TableRepository::new(pool.clone()),
            orders: OrderRepository::new(pool.clone()),
            guests: GuestAssignmentRepository::new(pool.clone()),
            roles: TableRoleRepository::new(pool.clone()),
            products: ProductRepository::new(pool.clone()),
            activity: ActivityLogRepository::new(pool.clone()),
            pool,
        }
    }

    async fn get_table(&self, table_id: Uuid) -> Result<Table, AppError> {
        self.tables
            .get_by_id(table_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Table not found".to_string()))
    }

    async fn get_guest(&self, guest_id: Uuid) -> Result<GuestAssignment, AppError> {
        self.guests
            .get_by_id(guest_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Guest assignment not found".to_string()))
    }

    /// Purchased-but-unassigned seats at a table. Always recomputed from the
    /// two authoritative sets.
    pub async fn placeholder_seats(&self, table_id: Uuid) -> Result<i64, AppError> {
        let purchased = self.orders.completed_seats(table_id).await?;
        let assigned = self.guests.count_for_table(table_id).await?;
        Ok(purchased - assigned)
    }

    /// Occupancy summary for a table.
    pub async fn seat_summary(&self, table: &Table) -> Result<TableSeatSummary, AppError> {
        let purchased = self.orders.completed_seats(table.id).await?;
        let assigned = self.guests.count_for_table(table.id).await?;
        Ok(TableSeatSummary {
            capacity: table.capacity,
            purchased_seats: purchased,
            assigned_seats: assigned,
            placeholder_seats: purchased - assigned,
            unsold_seats: (table.capacity as i64 - purchased).max(0),
        })
    }

    /// Whether an order still has unclaimed seats.
    pub async fn can_claim_seat(&self, order_id: Uuid) -> Result<bool, AppError> {
        let order = self
            .orders
            .get_by_id(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
        let mut tx = self.pool.begin().await?;
        let assigned = self.guests.count_for_order_tx(&mut tx, order_id).await?;
        tx.commit().await?;
        Ok(assigned < order.quantity as i64)
    }

    /// Bind a placeholder seat to a named guest.
    ///
    /// The (table, user) idempotency guard, the seat-count check, and the
    /// audit entry all commit in one transaction under the table row lock, so
    /// two concurrent claims for the same user or the last seat cannot both
    /// succeed.
    #[tracing::instrument(skip(self, request), fields(table_id = %table_id, actor = %actor_user_id))]
    pub async fn add_guest(
        &self,
        table_id: Uuid,
        actor_user_id: Uuid,
        request: AddGuestRequest,
    ) -> Result<GuestAssignment, AppError> {
        let decision = self
            .permissions
            .resolve_table_action(actor_user_id, table_id, TableAction::AddGuest)
            .await?;
        ensure_allowed(decision)?;

        let mut tx = self.pool.begin().await?;

        let table = self
            .tables
            .get_for_update_tx(&mut tx, table_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Table not found".to_string()))?;

        let recipient = self
            .users
            .find_or_create_by_email_tx(&mut tx, &request.email, request.name.as_deref())
            .await?;

        let usages = self.orders.seat_usage_tx(&mut tx, table.id).await?;
        let usage = match request.order_id {
            Some(order_id) => {
                let usage = usages
                    .iter()
                    .find(|u| u.order_id == order_id)
                    .ok_or_else(|| {
                        AppError::NotFound("Order not found at this table".to_string())
                    })?;
                if usage.remaining_seats() == 0 {
                    return Err(AppError::Conflict(
                        "All seats on this order are already assigned".to_string(),
                    ));
                }
                usage
            }
            None => pick_claim_order(&usages).ok_or_else(|| {
                AppError::Conflict(
                    "No purchased seats remain unassigned at this table".to_string(),
                )
            })?,
        };

        let order = self
            .orders
            .get_by_id(usage.order_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
        let product = self
            .products
            .get_by_id(order.product_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Product for order not found".to_string()))?;

        let guest = self
            .guests
            .create_tx(
                &mut tx,
                table.organization_id,
                table.event_id,
                table.id,
                recipient.id,
                order.id,
                product.tier,
                request.name.as_deref().or(recipient.name.as_deref()),
                request.dietary_restrictions.as_deref(),
            )
            .await?;

        self.activity
            .record_tx(
                &mut tx,
                table.organization_id,
                Some(table.event_id),
                Some(actor_user_id),
                ActivityAction::GuestAdded,
                "guest_assignment",
                guest.id,
                json!({
                    "guest_email": recipient.email,
                    "table_id": table.id,
                    "table_name": table.name,
                    "order_id": order.id,
                    "reference_code": guest.reference_code,
                }),
            )
            .await?;

        tx.commit().await?;

        Ok(guest)
    }

    /// Remove a guest. Gated by the matrix plus the self-pay rule on
    /// CAPTAIN_PAYG tables. The identity snapshot is captured before the row
    /// is deleted; the freed seat becomes an implicit placeholder again.
    #[tracing::instrument(skip(self), fields(guest_id = %guest_id, actor = %actor_user_id))]
    pub async fn remove_guest(
        &self,
        guest_id: Uuid,
        actor_user_id: Uuid,
    ) -> Result<(), AppError> {
        let snapshot = self
            .guests
            .get_with_user(guest_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Guest assignment not found".to_string()))?;
        let guest = self.get_guest(guest_id).await?;
        let table = self.get_table(guest.table_id).await?;

        let decision = self
            .permissions
            .resolve_remove_guest(actor_user_id, &guest, &table)
            .await?;
        ensure_allowed(decision)?;

        let mut tx = self.pool.begin().await?;

        if !self.guests.delete_tx(&mut tx, guest_id).await? {
            return Err(AppError::NotFound(
                "Guest assignment not found".to_string(),
            ));
        }

        self.activity
            .record_tx(
                &mut tx,
                table.organization_id,
                Some(table.event_id),
                Some(actor_user_id),
                ActivityAction::GuestRemoved,
                "guest_assignment",
                guest_id,
                json!({
                    "guest_email": snapshot.email,
                    "guest_name": snapshot.user_name,
                    "display_name": snapshot.display_name,
                    "table_id": table.id,
                    "table_name": table.name,
                    "order_id": guest.order_id,
                    "reference_code": snapshot.reference_code,
                }),
            )
            .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Edit the whitelisted guest fields: self-service for the assigned user,
    /// otherwise requires edit_guest.
    #[tracing::instrument(skip(self, request), fields(guest_id = %guest_id, actor = %actor_user_id))]
    pub async fn edit_guest(
        &self,
        guest_id: Uuid,
        actor_user_id: Uuid,
        request: EditGuestRequest,
    ) -> Result<GuestAssignment, AppError> {
        let guest = self.get_guest(guest_id).await?;
        let table = self.get_table(guest.table_id).await?;

        let decision = self
            .permissions
            .resolve_edit_guest(actor_user_id, &guest, &table)
            .await?;
        ensure_allowed(decision)?;

        let mut tx = self.pool.begin().await?;

        let updated = self
            .guests
            .update_details_tx(
                &mut tx,
                guest_id,
                request.display_name.as_deref(),
                request.dietary_restrictions.as_deref(),
                request.bidder_number,
                request.auction_registered,
            )
            .await?;

        self.activity
            .record_tx(
                &mut tx,
                table.organization_id,
                Some(table.event_id),
                Some(actor_user_id),
                ActivityAction::GuestUpdated,
                "guest_assignment",
                guest_id,
                json!({
                    "display_name": request.display_name,
                    "dietary_restrictions": request.dietary_restrictions,
                    "bidder_number": request.bidder_number,
                    "auction_registered": request.auction_registered,
                }),
            )
            .await?;

        tx.commit().await?;

        Ok(updated)
    }

    /// Mark a guest checked in. Same gate as edit_guest.
    #[tracing::instrument(skip(self), fields(guest_id = %guest_id, actor = %actor_user_id))]
    pub async fn check_in_guest(
        &self,
        guest_id: Uuid,
        actor_user_id: Uuid,
    ) -> Result<GuestAssignment, AppError> {
        let guest = self.get_guest(guest_id).await?;
        let table = self.get_table(guest.table_id).await?;

        let decision = self
            .permissions
            .resolve_edit_guest(actor_user_id, &guest, &table)
            .await?;
        ensure_allowed(decision)?;

        let mut tx = self.pool.begin().await?;

        let updated = self.guests.check_in_tx(&mut tx, guest_id).await?;

        self.activity
            .record_tx(
                &mut tx,
                table.organization_id,
                Some(table.event_id),
                Some(actor_user_id),
                ActivityAction::GuestCheckedIn,
                "guest_assignment",
                guest_id,
                json!({
                    "reference_code": updated.reference_code,
                    "checked_in_at": updated.checked_in_at,
                }),
            )
            .await?;

        tx.commit().await?;

        Ok(updated)
    }

    /// Transfer a ticket to a recipient found-or-created by email. Personal
    /// fields reset unless the caller opts to carry them forward.
    #[tracing::instrument(skip(self, request), fields(guest_id = %guest_id, actor = %actor_user_id))]
    pub async fn transfer_ticket(
        &self,
        guest_id: Uuid,
        actor_user_id: Uuid,
        request: TransferTicketRequest,
    ) -> Result<GuestAssignment, AppError> {
        let guest = self.get_guest(guest_id).await?;
        let table = self.get_table(guest.table_id).await?;
        let snapshot = self
            .guests
            .get_with_user(guest_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Guest assignment not found".to_string()))?;

        let decision = self
            .permissions
            .resolve_transfer(actor_user_id, &guest, &table)
            .await?;
        ensure_allowed(decision)?;

        let mut tx = self.pool.begin().await?;

        let recipient = self
            .users
            .find_or_create_by_email_tx(
                &mut tx,
                &request.recipient_email,
                request.recipient_name.as_deref(),
            )
            .await?;

        if recipient.id == guest.user_id {
            return Err(AppError::InvalidInput(
                "Recipient already holds this ticket".to_string(),
            ));
        }

        let display_name = request
            .recipient_name
            .as_deref()
            .or(recipient.name.as_deref());

        let updated = self
            .guests
            .transfer_tx(
                &mut tx,
                guest_id,
                recipient.id,
                display_name,
                request.carry_details,
            )
            .await?;

        self.activity
            .record_tx(
                &mut tx,
                table.organization_id,
                Some(table.event_id),
                Some(actor_user_id),
                ActivityAction::TicketTransferred,
                "guest_assignment",
                guest_id,
                json!({
                    "from_email": snapshot.email,
                    "to_email": recipient.email,
                    "table_id": table.id,
                    "carry_details": request.carry_details,
                }),
            )
            .await?;

        tx.commit().await?;

        Ok(updated)
    }

    /// Grant a role on a table. OWNER-only via manage_roles.
    #[tracing::instrument(skip(self, request), fields(table_id = %table_id, actor = %actor_user_id))]
    pub async fn add_role(
        &self,
        table_id: Uuid,
        actor_user_id: Uuid,
        request: AddRoleRequest,
    ) -> Result<(), AppError> {
        let decision = self
            .permissions
            .resolve_table_action(actor_user_id, table_id, TableAction::ManageRoles)
            .await?;
        ensure_allowed(decision)?;

        let table = self.get_table(table_id).await?;

        let mut tx = self.pool.begin().await?;
        self.roles
            .add_tx(&mut tx, table_id, request.user_id, request.role)
            .await?;
        self.activity
            .record_tx(
                &mut tx,
                table.organization_id,
                Some(table.event_id),
                Some(actor_user_id),
                ActivityAction::RoleAdded,
                "table",
                table_id,
                json!({ "user_id": request.user_id, "role": request.role }),
            )
            .await?;
        tx.commit().await?;

        Ok(())
    }

    /// Revoke a role on a table. OWNER-only via manage_roles.
    #[tracing::instrument(skip(self), fields(table_id = %table_id, actor = %actor_user_id))]
    pub async fn remove_role(
        &self,
        table_id: Uuid,
        actor_user_id: Uuid,
        user_id: Uuid,
        role: TableRole,
    ) -> Result<(), AppError> {
        let decision = self
            .permissions
            .resolve_table_action(actor_user_id, table_id, TableAction::ManageRoles)
            .await?;
        ensure_allowed(decision)?;

        let table = self.get_table(table_id).await?;

        let mut tx = self.pool.begin().await?;
        let removed = self.roles.remove_tx(&mut tx, table_id, user_id, role).await?;
        if !removed {
            return Err(AppError::NotFound("Role not found on this table".to_string()));
        }
        self.activity
            .record_tx(
                &mut tx,
                table.organization_id,
                Some(table.event_id),
                Some(actor_user_id),
                ActivityAction::RoleRemoved,
                "table",
                table_id,
                json!({ "user_id": user_id, "role": role }),
            )
            .await?;
        tx.commit().await?;

        Ok(())
    }

    /// Table roster with guest identities; requires view.
    pub async fn list_guests(
        &self,
        table_id: Uuid,
        actor_user_id: Uuid,
    ) -> Result<Vec<GuestWithUser>, AppError> {
        let decision = self
            .permissions
            .resolve_table_action(actor_user_id, table_id, TableAction::View)
            .await?;
        ensure_allowed(decision)?;

        self.guests.list_by_table(table_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn usage(order_id: Uuid, quantity: i32, assigned: i64, age_days: i64) -> OrderSeatUsage {
        OrderSeatUsage {
            order_id,
            quantity,
            assigned_seats: assigned,
            created_at: Utc::now() - Duration::days(age_days),
        }
    }

    #[test]
    fn test_claim_picks_first_created_order_with_room() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        // Rows arrive oldest-first from the repository.
        let usages = vec![usage(first, 3, 1, 10), usage(second, 5, 0, 2)];
        assert_eq!(pick_claim_order(&usages).unwrap().order_id, first);
    }

    #[test]
    fn test_claim_skips_exhausted_orders() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let usages = vec![usage(first, 2, 2, 10), usage(second, 2, 1, 2)];
        assert_eq!(pick_claim_order(&usages).unwrap().order_id, second);
    }

    #[test]
    fn test_claim_none_when_all_seats_taken() {
        let usages = vec![usage(Uuid::new_v4(), 2, 2, 10), usage(Uuid::new_v4(), 1, 1, 2)];
        assert!(pick_claim_order(&usages).is_none());
    }

    #[test]
    fn test_placeholder_arithmetic() {
        // 2 completed orders of quantity 3 and 2, 4 assignments -> 1 left.
        let usages = vec![usage(Uuid::new_v4(), 3, 3, 5), usage(Uuid::new_v4(), 2, 1, 1)];
        let purchased: i64 = usages.iter().map(|u| u.quantity as i64).sum();
        let assigned: i64 = usages.iter().map(|u| u.assigned_seats).sum();
        assert_eq!(purchased - assigned, 1);
        assert_eq!(
            usages.iter().map(|u| u.remaining_seats()).sum::<i64>(),
            1
        );
    }
}
