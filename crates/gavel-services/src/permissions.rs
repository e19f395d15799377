//! Permission resolution
//!
//! Resolves what a user may do to a table or guest assignment. Resolution
//! order: super-admin / organization admin (always wins), primary owner,
//! explicit role rows (highest privilege governs), then the guest fallback
//! (an assigned guest may view the table).
//!
//! The static role matrix lives in gavel-core. The rules that depend on
//! cross-entity data - removing a guest from a captain's table, transferring
//! a ticket - are pure decision functions here, fed by the async methods that
//! gather the rows. They are deliberately not folded into the matrix.

use gavel_core::models::{
    role_allows, GuestAssignment, PermissionDecision, ResolvedRole, Table, TableAction, TableRole,
    TableType,
};
use gavel_core::AppError;
use gavel_db::{
    GuestAssignmentRepository, OrderRepository, OrganizationRepository, TableRepository,
    TableRoleRepository, UserRepository,
};
use uuid::Uuid;

/// Label used in denial reasons, e.g. "CAPTAIN cannot remove self-paying guest".
fn role_label(resolved: Option<ResolvedRole>) -> &'static str {
    match resolved {
        Some(ResolvedRole::Admin) => "ADMIN",
        Some(ResolvedRole::Table(TableRole::Owner)) => "OWNER",
        Some(ResolvedRole::Table(TableRole::CoOwner)) => "CO_OWNER",
        Some(ResolvedRole::Table(TableRole::Captain)) => "CAPTAIN",
        Some(ResolvedRole::Table(TableRole::Manager)) => "MANAGER",
        Some(ResolvedRole::Table(TableRole::Staff)) => "STAFF",
        Some(ResolvedRole::Guest) => "guest",
        None => "user without a role",
    }
}

/// Decide a matrix-covered action for a resolved role.
pub fn matrix_decision(resolved: Option<ResolvedRole>, action: TableAction) -> PermissionDecision {
    match resolved {
        Some(ResolvedRole::Admin) => PermissionDecision::allow(ResolvedRole::Admin),
        Some(ResolvedRole::Table(role)) => {
            if role_allows(role, action) {
                PermissionDecision::allow(ResolvedRole::Table(role))
            } else {
                PermissionDecision::deny_with_role(
                    ResolvedRole::Table(role),
                    format!("{} cannot {} on this table", role_label(resolved), action),
                )
            }
        }
        Some(ResolvedRole::Guest) => {
            if action == TableAction::View {
                PermissionDecision::allow(ResolvedRole::Guest)
            } else {
                PermissionDecision::deny_with_role(
                    ResolvedRole::Guest,
                    format!("A guest may only view this table, not {}", action),
                )
            }
        }
        None => PermissionDecision::deny("You do not have access to this table"),
    }
}

/// Decide guest removal.
///
/// On CAPTAIN_PAYG tables a self-paying guest (the consuming order was bought
/// by the assigned user) may be removed only by themselves or an admin; the
/// captain coordinates seating but cannot eject someone who paid for their
/// own seat. On PREPAID tables the static matrix governs unconditionally.
pub fn remove_guest_decision(
    table_type: TableType,
    resolved: Option<ResolvedRole>,
    actor_is_guest: bool,
    guest_is_self_paying: bool,
) -> PermissionDecision {
    if matches!(resolved, Some(ResolvedRole::Admin)) {
        return PermissionDecision::allow(ResolvedRole::Admin);
    }

    if table_type == TableType::CaptainPayg && guest_is_self_paying {
        if actor_is_guest {
            return PermissionDecision::allow(resolved.unwrap_or(ResolvedRole::Guest));
        }
        return PermissionDecision::deny(format!(
            "{} cannot remove self-paying guest",
            role_label(resolved)
        ));
    }

    matrix_decision(resolved, TableAction::RemoveGuest)
}

/// Decide a ticket transfer: the assigned guest, the order's buyer, an
/// OWNER/CO_OWNER on a PREPAID table, or an admin.
pub fn transfer_decision(
    table_type: TableType,
    resolved: Option<ResolvedRole>,
    actor_is_guest: bool,
    actor_is_buyer: bool,
) -> PermissionDecision {
    if matches!(resolved, Some(ResolvedRole::Admin)) {
        return PermissionDecision::allow(ResolvedRole::Admin);
    }
    if actor_is_guest || actor_is_buyer {
        return PermissionDecision::allow(resolved.unwrap_or(ResolvedRole::Guest));
    }
    if table_type == TableType::Prepaid {
        if let Some(ResolvedRole::Table(role @ (TableRole::Owner | TableRole::CoOwner))) = resolved
        {
            return PermissionDecision::allow(ResolvedRole::Table(role));
        }
    }
    PermissionDecision::deny(
        "Only the assigned guest, the ticket buyer, a table owner on a prepaid table, or an admin may transfer this ticket",
    )
}

/// Permission resolver over the relational state.
#[derive(Clone)]
pub struct PermissionService {
    organizations: OrganizationRepository,
    users: UserRepository,
    tables: TableRepository,
    roles: TableRoleRepository,
    guests: GuestAssignmentRepository,
    orders: OrderRepository,
}

impl PermissionService {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self {
            organizations: OrganizationRepository::new(pool.clone()),
            users: UserRepository::new(pool.clone()),
            tables: TableRepository::new(pool.clone()),
            roles: TableRoleRepository::new(pool.clone()),
            guests: GuestAssignmentRepository::new(pool.clone()),
            orders: OrderRepository::new(pool),
        }
    }

    /// Resolve the actor's privilege on a table. Admin checks always take
    /// precedence; primary ownership implies OWNER without a role row.
    #[tracing::instrument(skip(self, table), fields(user_id = %user_id, table_id = %table.id))]
    pub async fn resolve_role(
        &self,
        user_id: Uuid,
        table: &Table,
    ) -> Result<Option<ResolvedRole>, AppError> {
        let user = self
            .users
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if user.is_super_admin
            || self
                .organizations
                .is_admin(table.organization_id, user_id)
                .await?
        {
            return Ok(Some(ResolvedRole::Admin));
        }

        if table.primary_owner_id == user_id {
            return Ok(Some(ResolvedRole::Table(TableRole::Owner)));
        }

        let roles = self.roles.roles_for_user(table.id, user_id).await?;
        if let Some(role) = gavel_core::models::highest_role(&roles) {
            return Ok(Some(ResolvedRole::Table(role)));
        }

        if self
            .guests
            .find_by_table_and_user(table.id, user_id)
            .await?
            .is_some()
        {
            return Ok(Some(ResolvedRole::Guest));
        }

        Ok(None)
    }

    /// Resolve a matrix-covered action against a table id.
    pub async fn resolve_table_action(
        &self,
        user_id: Uuid,
        table_id: Uuid,
        action: TableAction,
    ) -> Result<PermissionDecision, AppError> {
        let table = self
            .tables
            .get_by_id(table_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Table not found".to_string()))?;

        let resolved = self.resolve_role(user_id, &table).await?;
        Ok(matrix_decision(resolved, action))
    }

    /// Resolve guest removal, including the self-pay rule on CAPTAIN_PAYG
    /// tables.
    pub async fn resolve_remove_guest(
        &self,
        user_id: Uuid,
        guest: &GuestAssignment,
        table: &Table,
    ) -> Result<PermissionDecision, AppError> {
        let resolved = self.resolve_role(user_id, table).await?;
        let order = self
            .orders
            .get_by_id(guest.order_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Order for guest assignment not found".to_string()))?;

        Ok(remove_guest_decision(
            table.table_type,
            resolved,
            user_id == guest.user_id,
            order.user_id == guest.user_id,
        ))
    }

    /// Resolve a ticket transfer.
    pub async fn resolve_transfer(
        &self,
        user_id: Uuid,
        guest: &GuestAssignment,
        table: &Table,
    ) -> Result<PermissionDecision, AppError> {
        let resolved = self.resolve_role(user_id, table).await?;
        let order = self
            .orders
            .get_by_id(guest.order_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Order for guest assignment not found".to_string()))?;

        Ok(transfer_decision(
            table.table_type,
            resolved,
            user_id == guest.user_id,
            user_id == order.user_id,
        ))
    }

    /// Whether the actor may edit a guest assignment: the assigned user
    /// themselves, or anyone the matrix grants edit_guest.
    pub async fn resolve_edit_guest(
        &self,
        user_id: Uuid,
        guest: &GuestAssignment,
        table: &Table,
    ) -> Result<PermissionDecision, AppError> {
        if user_id == guest.user_id {
            return Ok(PermissionDecision::allow(ResolvedRole::Guest));
        }
        let resolved = self.resolve_role(user_id, table).await?;
        Ok(matrix_decision(resolved, TableAction::EditGuest))
    }

    /// Guard for organization-admin surfaces (webhook triage, activity feed).
    pub async fn require_org_admin(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> Result<(), AppError> {
        let user = self
            .users
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if user.is_super_admin || self.organizations.is_admin(organization_id, user_id).await? {
            return Ok(());
        }

        Err(AppError::Forbidden(
            "Only an organization admin may perform this action".to_string(),
        ))
    }
}

/// Convert a decision into `Ok(role)` or `Forbidden` with the decision's
/// reason.
pub fn ensure_allowed(decision: PermissionDecision) -> Result<ResolvedRole, AppError> {
    if decision.allowed {
        decision
            .role
            .ok_or_else(|| AppError::Internal("Allowed decision without a role".to_string()))
    } else {
        Err(AppError::Forbidden(decision.reason.unwrap_or_else(|| {
            "You do not have permission to perform this action".to_string()
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_always_allowed_by_matrix() {
        for action in [
            TableAction::View,
            TableAction::Edit,
            TableAction::ManageRoles,
            TableAction::Delete,
        ] {
            let decision = matrix_decision(Some(ResolvedRole::Admin), action);
            assert!(decision.allowed, "admin denied {}", action);
        }
    }

    #[test]
    fn test_guest_fallback_may_only_view() {
        assert!(matrix_decision(Some(ResolvedRole::Guest), TableAction::View).allowed);
        let denied = matrix_decision(Some(ResolvedRole::Guest), TableAction::AddGuest);
        assert!(!denied.allowed);
        assert!(denied.reason.is_some());
    }

    #[test]
    fn test_no_role_is_denied_with_reason() {
        let decision = matrix_decision(None, TableAction::View);
        assert!(!decision.allowed);
        assert_eq!(
            decision.reason.as_deref(),
            Some("You do not have access to this table")
        );
    }

    #[test]
    fn test_captain_cannot_remove_self_paying_guest() {
        let decision = remove_guest_decision(
            TableType::CaptainPayg,
            Some(ResolvedRole::Table(TableRole::Captain)),
            false,
            true,
        );
        assert!(!decision.allowed);
        assert_eq!(
            decision.reason.as_deref(),
            Some("CAPTAIN cannot remove self-paying guest")
        );
    }

    #[test]
    fn test_owner_and_manager_also_blocked_for_self_paying_guest() {
        for role in [TableRole::Owner, TableRole::CoOwner, TableRole::Manager] {
            let decision = remove_guest_decision(
                TableType::CaptainPayg,
                Some(ResolvedRole::Table(role)),
                false,
                true,
            );
            assert!(!decision.allowed, "{:?} should be blocked", role);
        }
    }

    #[test]
    fn test_self_paying_guest_may_remove_themselves() {
        let decision = remove_guest_decision(TableType::CaptainPayg, None, true, true);
        assert!(decision.allowed);
    }

    #[test]
    fn test_admin_may_remove_self_paying_guest() {
        let decision =
            remove_guest_decision(TableType::CaptainPayg, Some(ResolvedRole::Admin), false, true);
        assert!(decision.allowed);
    }

    #[test]
    fn test_comped_guest_removable_by_captain() {
        let decision = remove_guest_decision(
            TableType::CaptainPayg,
            Some(ResolvedRole::Table(TableRole::Captain)),
            false,
            false,
        );
        assert!(decision.allowed);
    }

    #[test]
    fn test_prepaid_table_ignores_self_pay_status() {
        let decision = remove_guest_decision(
            TableType::Prepaid,
            Some(ResolvedRole::Table(TableRole::Captain)),
            false,
            true,
        );
        assert!(decision.allowed);

        // Staff has no remove_guest in the matrix, self-pay or not.
        let denied = remove_guest_decision(
            TableType::Prepaid,
            Some(ResolvedRole::Table(TableRole::Staff)),
            false,
            true,
        );
        assert!(!denied.allowed);
    }

    #[test]
    fn test_transfer_by_guest_and_buyer() {
        assert!(transfer_decision(TableType::CaptainPayg, None, true, false).allowed);
        assert!(transfer_decision(TableType::CaptainPayg, None, false, true).allowed);
    }

    #[test]
    fn test_transfer_by_owner_only_on_prepaid() {
        let owner = Some(ResolvedRole::Table(TableRole::Owner));
        assert!(transfer_decision(TableType::Prepaid, owner, false, false).allowed);
        assert!(!transfer_decision(TableType::CaptainPayg, owner, false, false).allowed);

        let co_owner = Some(ResolvedRole::Table(TableRole::CoOwner));
        assert!(transfer_decision(TableType::Prepaid, co_owner, false, false).allowed);

        let manager = Some(ResolvedRole::Table(TableRole::Manager));
        assert!(!transfer_decision(TableType::Prepaid, manager, false, false).allowed);
    }

    #[test]
    fn test_transfer_denial_carries_reason() {
        let decision = transfer_decision(TableType::CaptainPayg, None, false, false);
        assert!(!decision.allowed);
        assert!(decision.reason.unwrap().contains("transfer"));
    }
}
