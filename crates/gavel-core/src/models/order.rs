use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Order lifecycle status
///
/// A COMPLETED order represents `quantity` purchased seats at its table; a
/// PENDING order is not a seat reservation and does not count against
/// capacity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    AwaitingPayment,
    Completed,
    Refunded,
    Cancelled,
    Expired,
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::AwaitingPayment => write!(f, "awaiting_payment"),
            OrderStatus::Completed => write!(f, "completed"),
            OrderStatus::Refunded => write!(f, "refunded"),
            OrderStatus::Cancelled => write!(f, "cancelled"),
            OrderStatus::Expired => write!(f, "expired"),
        }
    }
}

impl FromStr for OrderStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "awaiting_payment" => Ok(OrderStatus::AwaitingPayment),
            "completed" => Ok(OrderStatus::Completed),
            "refunded" => Ok(OrderStatus::Refunded),
            "cancelled" => Ok(OrderStatus::Cancelled),
            "expired" => Ok(OrderStatus::Expired),
            _ => Err(anyhow::anyhow!("Invalid order status: {}", s)),
        }
    }
}

/// Order entity
///
/// Invariant: `amount_cents = subtotal(product.kind, product.price_cents,
/// quantity) - discount_cents`, never negative. `failure_reason` is annotated
/// by the webhook on payment failure; the order stays PENDING so the buyer
/// can retry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Order {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub table_id: Option<Uuid>,
    pub promo_code_id: Option<Uuid>,
    pub status: OrderStatus,
    pub quantity: i32,
    pub amount_cents: i64,
    pub discount_cents: i64,
    pub stripe_payment_intent_id: Option<String>,
    pub stripe_charge_id: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Checkout request
///
/// `email`/`name` identify the buyer for guest checkout (ignored when a
/// session user is present). `table_id` joins an existing table
/// (individual-at-table flow); `table_name` names the table a full-table or
/// captain-commitment purchase creates.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct CheckoutRequest {
    pub event_id: Uuid,
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 10, message = "Quantity must be between 1 and 10"))]
    pub quantity: i32,
    pub table_id: Option<Uuid>,
    #[validate(length(max = 64, message = "Promo code must be at most 64 characters"))]
    pub promo_code: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    #[validate(length(max = 200, message = "Name must be at most 200 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 120, message = "Table name must be at most 120 characters"))]
    pub table_name: Option<String>,
}

/// Checkout response. `client_secret` is present iff payment is required.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CheckoutResponse {
    pub requires_payment: bool,
    pub order_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    pub amount_cents: i64,
    pub discount_cents: i64,
}

/// Per-order seat usage at a table: how many of the order's purchased seats
/// are already bound to named guests. Rows are ordered oldest-first so seat
/// claims attribute deterministically to the first order with room.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderSeatUsage {
    pub order_id: Uuid,
    pub quantity: i32,
    pub assigned_seats: i64,
    pub created_at: DateTime<Utc>,
}

impl OrderSeatUsage {
    pub fn remaining_seats(&self) -> i64 {
        (self.quantity as i64 - self.assigned_seats).max(0)
    }
}

/// Promo preview request: checkout-shaped dry run, no order created.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct PromoPreviewRequest {
    pub event_id: Uuid,
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 10, message = "Quantity must be between 1 and 10"))]
    pub quantity: i32,
    #[validate(length(min = 1, max = 64, message = "Promo code must be 1-64 characters"))]
    pub promo_code: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PromoPreviewResponse {
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
}
