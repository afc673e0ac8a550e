use dues_domain::CoverageStatus;

use crate::money::{covers, has_remainder, round_currency};

/// Pooled payments applied to obligations oldest first.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PaymentPool {
    remaining: f64,
    round_each_step: bool,
}

impl PaymentPool {
    /// Pool whose running value is rounded to cents after every step.
    pub(crate) fn rounded(remaining: f64) -> Self {
        Self {
            remaining: round_currency(remaining),
            round_each_step: true,
        }
    }

    /// Pool that keeps the unrounded running value.
    pub(crate) fn exact(remaining: f64) -> Self {
        Self {
            remaining,
            round_each_step: false,
        }
    }

    pub(crate) fn remaining(&self) -> f64 {
        self.remaining
    }

    pub(crate) fn has_credit(&self) -> bool {
        has_remainder(self.remaining)
    }

    /// Applies the pool to one obligation, returning its status and covered amount.
    ///
    /// Obligations of zero or less consume nothing; they are paid unless an earlier
    /// obligation left the pool in deficit.
    pub(crate) fn apply(&mut self, due: f64) -> (CoverageStatus, f64) {
        if due <= 0.0 {
            let status = if covers(self.remaining, 0.0) {
                CoverageStatus::Paid
            } else {
                CoverageStatus::Unpaid
            };
            return (status, 0.0);
        }
        if covers(self.remaining, due) {
            self.remaining -= due;
            if self.round_each_step {
                self.remaining = round_currency(self.remaining);
            }
            (CoverageStatus::Paid, due)
        } else if has_remainder(self.remaining) {
            let covered = self.remaining;
            self.remaining = 0.0;
            (CoverageStatus::Partial, covered)
        } else {
            (CoverageStatus::Unpaid, 0.0)
        }
    }

    /// Like [`PaymentPool::apply`], but a shortfall stays owed: the pool drops by the
    /// full obligation, so later periods see the deficit.
    pub(crate) fn settle(&mut self, due: f64) -> (CoverageStatus, f64) {
        let before = self.remaining;
        let outcome = self.apply(due);
        if outcome.0 != CoverageStatus::Paid {
            self.remaining = before - due;
            if self.round_each_step {
                self.remaining = round_currency(self.remaining);
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consumes_full_then_partial_then_nothing() {
        let mut pool = PaymentPool::rounded(1200.0);
        assert_eq!(pool.apply(500.0), (CoverageStatus::Paid, 500.0));
        assert_eq!(pool.apply(500.0), (CoverageStatus::Paid, 500.0));
        assert_eq!(pool.apply(500.0), (CoverageStatus::Partial, 200.0));
        assert_eq!(pool.apply(500.0), (CoverageStatus::Unpaid, 0.0));
        assert_eq!(pool.remaining(), 0.0);
    }

    #[test]
    fn zero_fee_is_paid_without_consuming() {
        let mut pool = PaymentPool::exact(0.0);
        assert_eq!(pool.apply(0.0), (CoverageStatus::Paid, 0.0));
        assert_eq!(pool.apply(-5.0), (CoverageStatus::Paid, 0.0));
        assert_eq!(pool.remaining(), 0.0);
    }

    #[test]
    fn zero_fee_is_unpaid_while_in_deficit() {
        let mut pool = PaymentPool::rounded(-200.0);
        assert_eq!(pool.apply(0.0), (CoverageStatus::Unpaid, 0.0));
        let mut pool = PaymentPool::exact(-0.01);
        assert_eq!(pool.apply(0.0), (CoverageStatus::Paid, 0.0));
    }

    #[test]
    fn settle_carries_the_shortfall_forward() {
        let mut pool = PaymentPool::exact(150.0);
        assert_eq!(pool.settle(200.0), (CoverageStatus::Partial, 150.0));
        assert_eq!(pool.remaining(), -50.0);
        assert_eq!(pool.apply(0.0), (CoverageStatus::Unpaid, 0.0));

        let mut pool = PaymentPool::exact(300.0);
        assert_eq!(pool.settle(200.0), (CoverageStatus::Paid, 200.0));
        assert_eq!(pool.remaining(), 100.0);
    }

    #[test]
    fn negative_pool_never_covers() {
        let mut pool = PaymentPool::rounded(-300.0);
        assert_eq!(pool.apply(500.0), (CoverageStatus::Unpaid, 0.0));
        assert!(!pool.has_credit());
    }
}
