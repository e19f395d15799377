use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Roles a user can hold on a table. A user may hold several; the
/// highest-privilege applicable role governs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "table_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum TableRole {
    Owner,
    CoOwner,
    Captain,
    Manager,
    Staff,
}

impl TableRole {
    /// Privilege rank, higher wins when a user holds multiple roles.
    fn rank(self) -> u8 {
        match self {
            TableRole::Owner => 5,
            TableRole::CoOwner => 4,
            TableRole::Captain => 3,
            TableRole::Manager => 2,
            TableRole::Staff => 1,
        }
    }
}

impl Display for TableRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            TableRole::Owner => write!(f, "owner"),
            TableRole::CoOwner => write!(f, "co_owner"),
            TableRole::Captain => write!(f, "captain"),
            TableRole::Manager => write!(f, "manager"),
            TableRole::Staff => write!(f, "staff"),
        }
    }
}

impl FromStr for TableRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(TableRole::Owner),
            "co_owner" => Ok(TableRole::CoOwner),
            "captain" => Ok(TableRole::Captain),
            "manager" => Ok(TableRole::Manager),
            "staff" => Ok(TableRole::Staff),
            _ => Err(anyhow::anyhow!("Invalid table role: {}", s)),
        }
    }
}

/// Actions the permission resolver decides on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TableAction {
    View,
    Edit,
    AddGuest,
    RemoveGuest,
    EditGuest,
    ManageRoles,
    Delete,
    Transfer,
}

impl Display for TableAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            TableAction::View => write!(f, "view"),
            TableAction::Edit => write!(f, "edit"),
            TableAction::AddGuest => write!(f, "add_guest"),
            TableAction::RemoveGuest => write!(f, "remove_guest"),
            TableAction::EditGuest => write!(f, "edit_guest"),
            TableAction::ManageRoles => write!(f, "manage_roles"),
            TableAction::Delete => write!(f, "delete"),
            TableAction::Transfer => write!(f, "transfer"),
        }
    }
}

/// Static role -> action permission matrix.
///
/// RemoveGuest on CAPTAIN_PAYG tables is additionally gated by the self-pay
/// rule, and Transfer is decided entirely by the transfer rule; both live in
/// the permission service because they depend on cross-entity data this
/// matrix cannot express.
pub fn role_allows(role: TableRole, action: TableAction) -> bool {
    match (role, action) {
        (TableRole::Owner, _) => !matches!(action, TableAction::Transfer),
        (
            TableRole::CoOwner | TableRole::Captain | TableRole::Manager,
            TableAction::View
            | TableAction::Edit
            | TableAction::AddGuest
            | TableAction::RemoveGuest
            | TableAction::EditGuest,
        ) => true,
        (TableRole::Staff, TableAction::View | TableAction::EditGuest) => true,
        _ => false,
    }
}

/// Highest-privilege role from a set of role rows.
pub fn highest_role(roles: &[TableRole]) -> Option<TableRole> {
    roles.iter().copied().max_by_key(|r| r.rank())
}

/// Explicit (table, user, role) row. The table's primary owner is an implicit
/// OWNER not necessarily materialized here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct TableUserRole {
    pub id: Uuid,
    pub table_id: Uuid,
    pub user_id: Uuid,
    pub role: TableRole,
    pub created_at: DateTime<Utc>,
}

/// How the actor's privilege on the target was resolved.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedRole {
    /// Super-admin or organization admin; allowed unconditionally.
    Admin,
    /// A table role (primary owner or explicit role row).
    Table(TableRole),
    /// No role, but the actor is an assigned guest at the table.
    Guest,
}

/// Outcome of a permission resolution. Denials always carry a
/// human-readable reason, never a generic "denied".
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PermissionDecision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<ResolvedRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl PermissionDecision {
    pub fn allow(role: ResolvedRole) -> Self {
        Self {
            allowed: true,
            role: Some(role),
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            role: None,
            reason: Some(reason.into()),
        }
    }

    pub fn deny_with_role(role: ResolvedRole, reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            role: Some(role),
            reason: Some(reason.into()),
        }
    }
}

/// Request to grant a role on a table.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AddRoleRequest {
    pub user_id: Uuid,
    pub role: TableRole,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_ROLES: [TableRole; 5] = [
        TableRole::Owner,
        TableRole::CoOwner,
        TableRole::Captain,
        TableRole::Manager,
        TableRole::Staff,
    ];

    const MATRIX_ACTIONS: [TableAction; 7] = [
        TableAction::View,
        TableAction::Edit,
        TableAction::AddGuest,
        TableAction::RemoveGuest,
        TableAction::EditGuest,
        TableAction::ManageRoles,
        TableAction::Delete,
    ];

    /// Expected value for each (role, action) cell of the static matrix.
    fn expected(role: TableRole, action: TableAction) -> bool {
        use TableAction::*;
        use TableRole::*;
        match role {
            Owner => true,
            CoOwner | Captain | Manager => {
                matches!(action, View | Edit | AddGuest | RemoveGuest | EditGuest)
            }
            Staff => matches!(action, View | EditGuest),
        }
    }

    #[test]
    fn test_matrix_is_exhaustively_correct() {
        for role in ALL_ROLES {
            for action in MATRIX_ACTIONS {
                assert_eq!(
                    role_allows(role, action),
                    expected(role, action),
                    "matrix mismatch for ({}, {})",
                    role,
                    action
                );
            }
        }
    }

    #[test]
    fn test_transfer_is_never_granted_by_matrix() {
        for role in ALL_ROLES {
            assert!(!role_allows(role, TableAction::Transfer));
        }
    }

    #[test]
    fn test_highest_role_wins() {
        assert_eq!(
            highest_role(&[TableRole::Staff, TableRole::CoOwner, TableRole::Captain]),
            Some(TableRole::CoOwner)
        );
        assert_eq!(highest_role(&[TableRole::Staff]), Some(TableRole::Staff));
        assert_eq!(highest_role(&[]), None);
    }

    #[test]
    fn test_role_round_trip() {
        for role in ALL_ROLES {
            assert_eq!(role.to_string().parse::<TableRole>().unwrap(), role);
        }
    }
}
