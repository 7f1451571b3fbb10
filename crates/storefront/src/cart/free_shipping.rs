//! Free-shipping progress, derived from the cart total alone.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Progress towards the free-shipping threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeShippingProgress {
    /// Whole percent, 0 to 100.
    pub percent: u8,
    /// Amount still missing; zero once reached.
    pub remaining: Decimal,
    pub reached: bool,
}

impl FreeShippingProgress {
    /// Compute progress for `total` against `target`.
    ///
    /// A missing or negative total counts as zero. A target of zero or less
    /// is always reached.
    #[must_use]
    pub fn new(total: Option<Decimal>, target: Decimal) -> Self {
        let total = total.unwrap_or(Decimal::ZERO).max(Decimal::ZERO);

        if target <= Decimal::ZERO || total >= target {
            return Self {
                percent: 100,
                remaining: Decimal::ZERO,
                reached: true,
            };
        }

        let percent = (total * Decimal::ONE_HUNDRED / target)
            .floor()
            .to_u8()
            .unwrap_or(0)
            .min(100);

        Self {
            percent,
            remaining: target - total,
            reached: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> Decimal {
        Decimal::new(1000, 0)
    }

    #[test]
    fn test_half_way() {
        let progress = FreeShippingProgress::new(Some(Decimal::new(500, 0)), target());
        assert_eq!(progress.percent, 50);
        assert_eq!(progress.remaining, Decimal::new(500, 0));
        assert!(!progress.reached);
    }

    #[test]
    fn test_zero_and_missing_total() {
        for total in [Some(Decimal::ZERO), None] {
            let progress = FreeShippingProgress::new(total, target());
            assert_eq!(progress.percent, 0);
            assert_eq!(progress.remaining, target());
        }
    }

    #[test]
    fn test_capped_at_hundred() {
        for total in [1000, 1500, 99_999] {
            let progress = FreeShippingProgress::new(Some(Decimal::new(total, 0)), target());
            assert_eq!(progress.percent, 100);
            assert_eq!(progress.remaining, Decimal::ZERO);
            assert!(progress.reached);
        }
    }

    #[test]
    fn test_percent_is_floored() {
        let progress = FreeShippingProgress::new(Some(Decimal::new(99999, 2)), target());
        assert_eq!(progress.percent, 99);
    }

    #[test]
    fn test_non_positive_target_is_reached() {
        assert!(FreeShippingProgress::new(None, Decimal::ZERO).reached);
    }
}
