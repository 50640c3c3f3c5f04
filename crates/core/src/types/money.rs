//! Money helpers for NT$ amounts stored as `NUMERIC(10,2)`.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Round an amount to a whole dollar, halves away from zero.
///
/// The payment gateway only accepts integer totals.
#[must_use]
pub fn round_half_up(amount: Decimal) -> i64 {
    amount
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(0)
}

/// Convert an amount to `f64` for JSON responses that expect numbers.
#[must_use]
pub fn decimal_to_f64(amount: Decimal) -> f64 {
    amount.to_f64().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(Decimal::new(10050, 2)), 101);
        assert_eq!(round_half_up(Decimal::new(10049, 2)), 100);
        assert_eq!(round_half_up(Decimal::new(100, 0)), 100);
    }

    #[test]
    fn test_decimal_to_f64() {
        let value = decimal_to_f64(Decimal::new(25050, 2));
        assert!((value - 250.5).abs() < f64::EPSILON);
    }
}
