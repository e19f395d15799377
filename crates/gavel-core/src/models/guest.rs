use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::ProductTier;

/// Guest assignment entity: one named guest occupying one purchased seat.
///
/// Invariants: at most one assignment per (table, user) pair; the number of
/// assignments consuming an order never exceeds that order's quantity. `tier`
/// is snapshotted from the product at creation time. `reference_code` is
/// unique per organization and never reused after reassignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct GuestAssignment {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub event_id: Uuid,
    pub table_id: Uuid,
    pub user_id: Uuid,
    pub order_id: Uuid,
    pub tier: ProductTier,
    pub display_name: Option<String>,
    pub reference_code: String,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub dietary_restrictions: Option<String>,
    pub bidder_number: Option<i32>,
    pub auction_registered: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Guest assignment joined with the assigned user's identity, for table
/// rosters and the deletion audit snapshot.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct GuestWithUser {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub event_id: Uuid,
    pub table_id: Uuid,
    pub user_id: Uuid,
    pub order_id: Uuid,
    pub tier: ProductTier,
    pub display_name: Option<String>,
    pub reference_code: String,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub dietary_restrictions: Option<String>,
    pub bidder_number: Option<i32>,
    pub auction_registered: bool,
    pub created_at: DateTime<Utc>,
    pub email: String,
    pub user_name: Option<String>,
}

/// Request to bind a placeholder seat to a named guest.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct AddGuestRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(max = 200, message = "Name must be at most 200 characters"))]
    pub name: Option<String>,
    /// Specific order whose seat this assignment consumes. When absent, the
    /// oldest completed order with a free seat is used.
    pub order_id: Option<Uuid>,
    #[validate(length(max = 500, message = "Dietary restrictions must be at most 500 characters"))]
    pub dietary_restrictions: Option<String>,
}

/// Whitelisted self-service edits. Identity, table, and order linkage are not
/// editable through this path.
#[derive(Debug, Clone, Default, Deserialize, ToSchema, Validate)]
pub struct EditGuestRequest {
    #[validate(length(max = 200, message = "Name must be at most 200 characters"))]
    pub display_name: Option<String>,
    #[validate(length(max = 500, message = "Dietary restrictions must be at most 500 characters"))]
    pub dietary_restrictions: Option<String>,
    #[validate(range(min = 1, max = 9999, message = "Bidder number must be between 1 and 9999"))]
    pub bidder_number: Option<i32>,
    pub auction_registered: Option<bool>,
}

/// Request to move a ticket to another user.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct TransferTicketRequest {
    #[validate(email(message = "Invalid recipient email address"))]
    pub recipient_email: String,
    #[validate(length(max = 200, message = "Name must be at most 200 characters"))]
    pub recipient_name: Option<String>,
    /// Carry dietary restrictions, bidder number, auction registration, and
    /// check-in state to the recipient instead of resetting them.
    #[serde(default)]
    pub carry_details: bool,
}

/// Response model for guest endpoints.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GuestResponse {
    pub id: Uuid,
    pub table_id: Uuid,
    pub user_id: Uuid,
    pub order_id: Uuid,
    pub tier: ProductTier,
    pub display_name: Option<String>,
    pub reference_code: String,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub dietary_restrictions: Option<String>,
    pub bidder_number: Option<i32>,
    pub auction_registered: bool,
    pub created_at: DateTime<Utc>,
}

impl From<GuestAssignment> for GuestResponse {
    fn from(guest: GuestAssignment) -> Self {
        Self {
            id: guest.id,
            table_id: guest.table_id,
            user_id: guest.user_id,
            order_id: guest.order_id,
            tier: guest.tier,
            display_name: guest.display_name,
            reference_code: guest.reference_code,
            checked_in_at: guest.checked_in_at,
            dietary_restrictions: guest.dietary_restrictions,
            bidder_number: guest.bidder_number,
            auction_registered: guest.auction_registered,
            created_at: guest.created_at,
        }
    }
}
