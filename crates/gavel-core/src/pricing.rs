//! Order pricing
//!
//! The single source of truth for amount computation. `subtotal` is used both
//! when validating a promo code and when computing the final charge; callers
//! must never recompute the amount themselves. FULL_TABLE prices are the order
//! total as-is, every other product kind is priced per seat.

use crate::models::{DiscountType, ProductKind};

/// Compute the order subtotal in minor units (cents).
///
/// FULL_TABLE is a flat total regardless of quantity; INDIVIDUAL_TICKET and
/// CAPTAIN_COMMITMENT multiply the per-seat price by quantity.
pub fn subtotal(kind: ProductKind, price_cents: i64, quantity: i32) -> i64 {
    match kind {
        ProductKind::FullTable => price_cents,
        ProductKind::IndividualTicket | ProductKind::CaptainCommitment => {
            price_cents * quantity as i64
        }
    }
}

/// Compute the discount in cents for a promo code applied to a subtotal.
///
/// PERCENTAGE rounds to the nearest cent; FIXED_AMOUNT is capped at the
/// subtotal so the final amount can never go negative.
pub fn discount_cents(discount_type: DiscountType, value: i64, subtotal_cents: i64) -> i64 {
    let discount = match discount_type {
        DiscountType::Percentage => {
            ((subtotal_cents as i128 * value as i128 + 50) / 100) as i64
        }
        DiscountType::FixedAmount => value.min(subtotal_cents),
    };
    discount.clamp(0, subtotal_cents)
}

/// Final charge amount: subtotal minus discount, floored at zero.
pub fn final_amount_cents(subtotal_cents: i64, discount_cents: i64) -> i64 {
    (subtotal_cents - discount_cents).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_table_is_flat_total() {
        // A table priced at $5,000 stays $5,000 whatever quantity is passed.
        assert_eq!(subtotal(ProductKind::FullTable, 500_000, 10), 500_000);
        assert_eq!(subtotal(ProductKind::FullTable, 500_000, 1), 500_000);
    }

    #[test]
    fn test_per_seat_kinds_multiply() {
        assert_eq!(subtotal(ProductKind::IndividualTicket, 50_000, 3), 150_000);
        assert_eq!(subtotal(ProductKind::CaptainCommitment, 25_000, 4), 100_000);
        assert_eq!(subtotal(ProductKind::CaptainCommitment, 0, 8), 0);
    }

    #[test]
    fn test_percentage_discount_rounds_to_nearest_cent() {
        assert_eq!(discount_cents(DiscountType::Percentage, 10, 500_000), 50_000);
        // 15% of 333 cents = 49.95 -> 50
        assert_eq!(discount_cents(DiscountType::Percentage, 15, 333), 50);
        // 10% of 333 cents = 33.3 -> 33
        assert_eq!(discount_cents(DiscountType::Percentage, 10, 333), 33);
    }

    #[test]
    fn test_fixed_discount_never_exceeds_subtotal() {
        assert_eq!(discount_cents(DiscountType::FixedAmount, 10_000, 5_000), 5_000);
        assert_eq!(discount_cents(DiscountType::FixedAmount, 2_500, 5_000), 2_500);
    }

    #[test]
    fn test_final_amount_never_negative() {
        assert_eq!(final_amount_cents(5_000, 5_000), 0);
        assert_eq!(final_amount_cents(5_000, 9_000), 0);
        assert_eq!(final_amount_cents(450_000, 0), 450_000);
    }

    #[test]
    fn test_full_table_with_percentage_promo_scenario() {
        let sub = subtotal(ProductKind::FullTable, 500_000, 1);
        let discount = discount_cents(DiscountType::Percentage, 10, sub);
        assert_eq!(sub, 500_000);
        assert_eq!(discount, 50_000);
        assert_eq!(final_amount_cents(sub, discount), 450_000);
    }
}
