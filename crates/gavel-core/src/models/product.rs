use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Product kinds
///
/// `price_cents` semantics depend on the kind: FULL_TABLE is the order total,
/// INDIVIDUAL_TICKET and CAPTAIN_COMMITMENT are per seat.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "product_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ProductKind {
    IndividualTicket,
    FullTable,
    CaptainCommitment,
}

impl Display for ProductKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ProductKind::IndividualTicket => write!(f, "individual_ticket"),
            ProductKind::FullTable => write!(f, "full_table"),
            ProductKind::CaptainCommitment => write!(f, "captain_commitment"),
        }
    }
}

impl FromStr for ProductKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "individual_ticket" => Ok(ProductKind::IndividualTicket),
            "full_table" => Ok(ProductKind::FullTable),
            "captain_commitment" => Ok(ProductKind::CaptainCommitment),
            _ => Err(anyhow::anyhow!("Invalid product kind: {}", s)),
        }
    }
}

/// Seating tier. Snapshotted onto guest assignments at creation time so later
/// product edits do not change existing guests.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "product_tier", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum ProductTier {
    Standard,
    Vip,
    Vvip,
}

impl Display for ProductTier {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ProductTier::Standard => write!(f, "standard"),
            ProductTier::Vip => write!(f, "vip"),
            ProductTier::Vvip => write!(f, "vvip"),
        }
    }
}

impl FromStr for ProductTier {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(ProductTier::Standard),
            "vip" => Ok(ProductTier::Vip),
            "vvip" => Ok(ProductTier::Vvip),
            _ => Err(anyhow::anyhow!("Invalid product tier: {}", s)),
        }
    }
}

/// Product entity
///
/// `table_capacity` is the seat count of the table a FULL_TABLE or
/// CAPTAIN_COMMITMENT purchase creates; null for individual tickets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub kind: ProductKind,
    pub tier: ProductTier,
    pub price_cents: i64,
    pub table_capacity: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Quantity bounds by product kind: FULL_TABLE orders are exactly one table;
/// per-seat kinds allow 1-10 seats per order.
pub fn validate_quantity(kind: ProductKind, quantity: i32) -> Result<(), String> {
    match kind {
        ProductKind::FullTable => {
            if quantity != 1 {
                return Err("Full table purchases must have quantity 1".to_string());
            }
        }
        ProductKind::IndividualTicket | ProductKind::CaptainCommitment => {
            if !(1..=10).contains(&quantity) {
                return Err("Quantity must be between 1 and 10".to_string());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip() {
        for kind in [
            ProductKind::IndividualTicket,
            ProductKind::FullTable,
            ProductKind::CaptainCommitment,
        ] {
            assert_eq!(kind.to_string().parse::<ProductKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_full_table_quantity_must_be_one() {
        assert!(validate_quantity(ProductKind::FullTable, 1).is_ok());
        assert!(validate_quantity(ProductKind::FullTable, 2).is_err());
        assert!(validate_quantity(ProductKind::FullTable, 0).is_err());
    }

    #[test]
    fn test_per_seat_quantity_bounds() {
        assert!(validate_quantity(ProductKind::IndividualTicket, 1).is_ok());
        assert!(validate_quantity(ProductKind::IndividualTicket, 10).is_ok());
        assert!(validate_quantity(ProductKind::IndividualTicket, 0).is_err());
        assert!(validate_quantity(ProductKind::IndividualTicket, 11).is_err());
        assert!(validate_quantity(ProductKind::CaptainCommitment, 8).is_ok());
    }
}
