use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Table funding model. Immutable business meaning: PREPAID tables had every
/// seat purchased up front by one buyer; CAPTAIN_PAYG tables are organized by
/// a captain and each guest pays for their own seat.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "table_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum TableType {
    Prepaid,
    CaptainPayg,
}

impl Display for TableType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            TableType::Prepaid => write!(f, "prepaid"),
            TableType::CaptainPayg => write!(f, "captain_payg"),
        }
    }
}

impl FromStr for TableType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prepaid" => Ok(TableType::Prepaid),
            "captain_payg" => Ok(TableType::CaptainPayg),
            _ => Err(anyhow::anyhow!("Invalid table type: {}", s)),
        }
    }
}

/// Table lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "table_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum TableStatus {
    Active,
    Inactive,
    Archived,
}

impl Display for TableStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            TableStatus::Active => write!(f, "active"),
            TableStatus::Inactive => write!(f, "inactive"),
            TableStatus::Archived => write!(f, "archived"),
        }
    }
}

/// Table entity
///
/// `primary_owner_id` is the immutable creator/owner and implies an OWNER
/// role even when no role row is materialized. `reference_code` is unique per
/// organization and used by the sheet sync and check-in lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Table {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub slug: String,
    pub reference_code: String,
    pub table_type: TableType,
    pub capacity: i32,
    pub status: TableStatus,
    pub primary_owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Seat occupancy summary for a table. Placeholder seats are derived, never
/// stored: purchased seats minus named assignments.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TableSeatSummary {
    pub capacity: i32,
    /// Sum of quantity over COMPLETED orders at this table.
    pub purchased_seats: i64,
    /// Number of named guest assignments.
    pub assigned_seats: i64,
    /// Purchased but not yet bound to a named guest.
    pub placeholder_seats: i64,
    /// Capacity not yet purchased.
    pub unsold_seats: i64,
}

/// Response model for table detail endpoints.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TableResponse {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub slug: String,
    pub reference_code: String,
    pub table_type: TableType,
    pub status: TableStatus,
    pub seats: TableSeatSummary,
    pub created_at: DateTime<Utc>,
}
