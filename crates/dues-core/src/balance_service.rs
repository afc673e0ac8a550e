//! Reduces a member and their payments to a single running balance.

use chrono::NaiveDate;

use dues_domain::{BalanceSummary, CoverageStatus, Member, MonthKey, Payment};

use crate::{
    money::{round_currency, sanitize_amount, sum_rounded},
    pool::PaymentPool,
};

/// Computes balance summaries by pooling payments against obligations oldest first.
pub struct BalanceService;

impl BalanceService {
    /// Summarizes `member` as of `today`.
    ///
    /// `payments` may contain other members' records; only those owned by `member`
    /// are pooled. Period tags on payments are ignored here.
    pub fn compute(member: &Member, payments: &[Payment], today: NaiveDate) -> BalanceSummary {
        let total_paid = sum_rounded(
            payments
                .iter()
                .filter(|payment| payment.member_id == member.id)
                .map(|payment| payment.amount),
        );
        let opening_dues = round_currency(sanitize_amount(member.opening_balance));
        let monthly_fee = round_currency(sanitize_amount(member.subscription_amount));

        let mut pool = PaymentPool::rounded(total_paid - opening_dues);
        let mut unpaid_months_count = 0u32;
        let mut total_months_count = 0u32;

        let last = MonthKey::containing(today);
        let mut current = member.join_month();
        while current <= last {
            total_months_count += 1;
            let (status, _) = pool.apply(monthly_fee);
            if status != CoverageStatus::Paid {
                unpaid_months_count += 1;
            }
            current = current.next();
        }

        let total_obligation =
            round_currency(total_months_count as f64 * monthly_fee + opening_dues);
        let balance = round_currency(total_obligation - total_paid);

        BalanceSummary {
            balance,
            total_due: if balance > 0.0 { balance } else { 0.0 },
            advance_credit: if balance < 0.0 { -balance } else { 0.0 },
            unpaid_months_count,
            total_months_count,
            opening_dues,
            total_paid,
        }
    }
}
