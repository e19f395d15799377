use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Promo discount type. PERCENTAGE values are whole percent points,
/// FIXED_AMOUNT values are cents.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "discount_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    Percentage,
    FixedAmount,
}

impl Display for DiscountType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            DiscountType::Percentage => write!(f, "percentage"),
            DiscountType::FixedAmount => write!(f, "fixed_amount"),
        }
    }
}

impl FromStr for DiscountType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage" => Ok(DiscountType::Percentage),
            "fixed_amount" => Ok(DiscountType::FixedAmount),
            _ => Err(anyhow::anyhow!("Invalid discount type: {}", s)),
        }
    }
}

/// Promo code entity, scoped to an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PromoCode {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub event_id: Uuid,
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub is_active: bool,
    pub max_uses: Option<i32>,
    pub current_uses: i32,
    pub valid_from: DateTime<Utc>,
    /// Null means no expiry.
    pub valid_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PromoCode {
    /// Whether the code is inside its validity window at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        if now < self.valid_from {
            return false;
        }
        match self.valid_until {
            Some(until) => now <= until,
            None => true,
        }
    }

    /// Whether the usage cap (if any) still has room.
    pub fn has_uses_remaining(&self) -> bool {
        match self.max_uses {
            Some(max) => self.current_uses < max,
            None => true,
        }
    }

    /// Full redeemability check; returns the failure reason on rejection.
    pub fn check_redeemable(&self, now: DateTime<Utc>) -> Result<(), String> {
        if !self.is_active {
            return Err("Promo code is not active".to_string());
        }
        if !self.is_valid_at(now) {
            return Err("Promo code is not valid at this time".to_string());
        }
        if !self.has_uses_remaining() {
            return Err("Promo code has reached its usage limit".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn promo(now: DateTime<Utc>) -> PromoCode {
        PromoCode {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            code: "GALA10".to_string(),
            discount_type: DiscountType::Percentage,
            discount_value: 10,
            is_active: true,
            max_uses: Some(100),
            current_uses: 0,
            valid_from: now - Duration::days(1),
            valid_until: Some(now + Duration::days(1)),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_redeemable_inside_window() {
        let now = Utc::now();
        assert!(promo(now).check_redeemable(now).is_ok());
    }

    #[test]
    fn test_rejects_before_window() {
        let now = Utc::now();
        let mut p = promo(now);
        p.valid_from = now + Duration::hours(1);
        assert!(p.check_redeemable(now).is_err());
    }

    #[test]
    fn test_rejects_after_expiry() {
        let now = Utc::now();
        let mut p = promo(now);
        p.valid_until = Some(now - Duration::hours(1));
        assert!(p.check_redeemable(now).is_err());
    }

    #[test]
    fn test_null_expiry_means_no_expiry() {
        let now = Utc::now();
        let mut p = promo(now);
        p.valid_until = None;
        assert!(p.check_redeemable(now).is_ok());
    }

    #[test]
    fn test_usage_cap() {
        let now = Utc::now();
        let mut p = promo(now);
        p.current_uses = 100;
        assert!(p.check_redeemable(now).is_err());
        p.max_uses = None;
        assert!(p.check_redeemable(now).is_ok());
    }

    #[test]
    fn test_inactive_rejected() {
        let now = Utc::now();
        let mut p = promo(now);
        p.is_active = false;
        assert_eq!(
            p.check_redeemable(now).unwrap_err(),
            "Promo code is not active"
        );
    }
}
