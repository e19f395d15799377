use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Audited actions. Every state-changing operation writes exactly one entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "activity_action", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    OrderCompleted,
    PaymentFailed,
    TableCreated,
    GuestAdded,
    GuestRemoved,
    GuestUpdated,
    GuestCheckedIn,
    TicketTransferred,
    RoleAdded,
    RoleRemoved,
}

impl Display for ActivityAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ActivityAction::OrderCompleted => write!(f, "order.completed"),
            ActivityAction::PaymentFailed => write!(f, "payment.failed"),
            ActivityAction::TableCreated => write!(f, "table.created"),
            ActivityAction::GuestAdded => write!(f, "guest.added"),
            ActivityAction::GuestRemoved => write!(f, "guest.removed"),
            ActivityAction::GuestUpdated => write!(f, "guest.updated"),
            ActivityAction::GuestCheckedIn => write!(f, "guest.checked_in"),
            ActivityAction::TicketTransferred => write!(f, "ticket.transferred"),
            ActivityAction::RoleAdded => write!(f, "role.added"),
            ActivityAction::RoleRemoved => write!(f, "role.removed"),
        }
    }
}

impl FromStr for ActivityAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "order.completed" => Ok(ActivityAction::OrderCompleted),
            "payment.failed" => Ok(ActivityAction::PaymentFailed),
            "table.created" => Ok(ActivityAction::TableCreated),
            "guest.added" => Ok(ActivityAction::GuestAdded),
            "guest.removed" => Ok(ActivityAction::GuestRemoved),
            "guest.updated" => Ok(ActivityAction::GuestUpdated),
            "guest.checked_in" => Ok(ActivityAction::GuestCheckedIn),
            "ticket.transferred" => Ok(ActivityAction::TicketTransferred),
            "role.added" => Ok(ActivityAction::RoleAdded),
            "role.removed" => Ok(ActivityAction::RoleRemoved),
            _ => Err(anyhow::anyhow!("Invalid activity action: {}", s)),
        }
    }
}

/// Append-only audit trail entry. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ActivityLog {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub event_id: Option<Uuid>,
    /// Null for system-initiated actions (webhook reconciliation).
    pub actor_user_id: Option<Uuid>,
    pub action: ActivityAction,
    pub entity_type: String,
    pub entity_id: Uuid,
    /// Snapshot sufficient to reconstruct what changed.
    pub metadata: JsonValue,
    pub created_at: DateTime<Utc>,
}

/// Response model for the activity feed.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ActivityLogResponse {
    pub id: Uuid,
    pub event_id: Option<Uuid>,
    pub actor_user_id: Option<Uuid>,
    pub action: ActivityAction,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub metadata: JsonValue,
    pub created_at: DateTime<Utc>,
}

impl From<ActivityLog> for ActivityLogResponse {
    fn from(log: ActivityLog) -> Self {
        Self {
            id: log.id,
            event_id: log.event_id,
            actor_user_id: log.actor_user_id,
            action: log.action,
            entity_type: log.entity_type,
            entity_id: log.entity_id,
            metadata: log.metadata,
            created_at: log.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_round_trip() {
        for action in [
            ActivityAction::OrderCompleted,
            ActivityAction::GuestRemoved,
            ActivityAction::TicketTransferred,
            ActivityAction::RoleAdded,
        ] {
            assert_eq!(
                action.to_string().parse::<ActivityAction>().unwrap(),
                action
            );
        }
    }
}
