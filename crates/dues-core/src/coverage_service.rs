//! Expands a member's payment pool into a month-by-month coverage ledger and
//! decides what interacting with a ledger entry should do.

use chrono::NaiveDate;
use uuid::Uuid;

use dues_domain::{
    CoverageStatus, Member, MonthKey, Payment, PeriodEntry, PeriodKind,
};

use crate::{
    money::{round_currency, sanitize_amount, sum_exact},
    pool::PaymentPool,
    CoreError,
};

/// Upper bound on month entries in a single ledger (ten years). The opening entry
/// does not count toward it.
pub const MAX_LEDGER_MONTHS: usize = 120;

/// What selecting a ledger entry resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum ToggleAction {
    /// The month is paid by a payment tagged to it; deleting that payment reverts it.
    Revert { payment: Payment },
    /// The month is unpaid or partial; a payment should be recorded for it.
    RecordPayment {
        period: MonthKey,
        status: CoverageStatus,
        suggested_amount: f64,
    },
}

/// Builds coverage ledgers and resolves grid interactions.
pub struct CoverageService;

impl CoverageService {
    /// Returns the ledger for `member`, oldest entry first.
    ///
    /// An opening entry comes first when the member joined owing dues. Months run
    /// from the join month through the month after `today`, and keep going while
    /// pooled credit remains, so prepaid months show as paid. At most
    /// [`MAX_LEDGER_MONTHS`] month entries are produced.
    pub fn build_ledger(member: &Member, payments: &[Payment], today: NaiveDate) -> Vec<PeriodEntry> {
        let monthly_fee = sanitize_amount(member.subscription_amount);
        let opening_dues = sanitize_amount(member.opening_balance);
        let mut pool = PaymentPool::exact(round_currency(sum_exact(
            owned_by(member.id, payments).map(|payment| payment.amount),
        )));

        let mut entries = Vec::new();
        if opening_dues > 0.0 {
            let (status, covered) = pool.settle(opening_dues);
            entries.push(PeriodEntry::opening(
                status,
                round_currency(covered),
                opening_dues,
            ));
        }

        let horizon = MonthKey::containing(today).next();
        let mut current = member.join_month();
        let mut months = 0usize;
        while months < MAX_LEDGER_MONTHS {
            let prepaid = monthly_fee > 0.0 && pool.has_credit();
            if current > horizon && !prepaid {
                break;
            }
            let (status, covered) = pool.apply(monthly_fee);
            entries.push(PeriodEntry::month(
                current,
                status,
                round_currency(covered),
                monthly_fee,
            ));
            months += 1;
            current = current.next();
        }

        tracing::debug!(
            member = %member.id,
            entries = entries.len(),
            leftover = pool.remaining(),
            "built coverage ledger"
        );
        entries
    }

    /// Looks up the ledger entry for `period`.
    pub fn entry_for(entries: &[PeriodEntry], period: MonthKey) -> Option<&PeriodEntry> {
        entries.iter().find(|entry| entry.period() == Some(period))
    }

    /// Decides what selecting `entry` should do.
    ///
    /// Paid months revert only through a payment tagged to exactly that month; when
    /// the month was covered by pooled credit the result is
    /// [`CoreError::NotRevertible`]. Opening entries are never toggleable.
    pub fn resolve_toggle(
        member: &Member,
        payments: &[Payment],
        entry: &PeriodEntry,
    ) -> Result<ToggleAction, CoreError> {
        let period = match entry.kind {
            PeriodKind::Opening => return Err(CoreError::OpeningNotToggleable),
            PeriodKind::Month { period } => period,
        };

        match entry.status {
            CoverageStatus::Paid => Self::tagged_payment(member, payments, period)
                .cloned()
                .map(|payment| ToggleAction::Revert { payment })
                .ok_or(CoreError::NotRevertible(period)),
            status => Ok(ToggleAction::RecordPayment {
                period,
                status,
                suggested_amount: round_currency(sanitize_amount(member.subscription_amount)),
            }),
        }
    }

    /// Builds the ledger and resolves the toggle for `period`.
    pub fn resolve_toggle_for_period(
        member: &Member,
        payments: &[Payment],
        period: MonthKey,
        today: NaiveDate,
    ) -> Result<ToggleAction, CoreError> {
        let ledger = Self::build_ledger(member, payments, today);
        let entry = Self::entry_for(&ledger, period).ok_or_else(|| {
            CoreError::Validation(format!(
                "{} is not part of {}'s ledger",
                period.label(),
                member.name
            ))
        })?;
        Self::resolve_toggle(member, payments, entry)
    }

    /// The most recently recorded payment tagged to `period`.
    pub fn tagged_payment<'a>(
        member: &Member,
        payments: &'a [Payment],
        period: MonthKey,
    ) -> Option<&'a Payment> {
        owned_by(member.id, payments)
            .filter(|payment| payment.is_for(period))
            .max_by_key(|payment| payment.date)
    }

    /// Payments earmarked for a month, newest first.
    pub fn month_wise_history<'a>(member: &Member, payments: &'a [Payment]) -> Vec<&'a Payment> {
        let mut tagged: Vec<_> = owned_by(member.id, payments)
            .filter(|payment| payment.is_tagged())
            .collect();
        tagged.sort_by(|a, b| b.date.cmp(&a.date));
        tagged
    }

    /// Number of unpaid-or-partial months up to and including `today`'s month.
    pub fn outstanding_months(entries: &[PeriodEntry], today: NaiveDate) -> usize {
        let current = MonthKey::containing(today);
        entries
            .iter()
            .filter(|entry| {
                entry
                    .period()
                    .is_some_and(|period| period <= current && entry.status.is_outstanding())
            })
            .count()
    }
}

fn owned_by(member_id: Uuid, payments: &[Payment]) -> impl Iterator<Item = &Payment> {
    payments
        .iter()
        .filter(move |payment| payment.member_id == member_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use dues_domain::{NewPayment, PaymentMode};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn month(y: i32, m: u32) -> MonthKey {
        MonthKey::new(y, m).unwrap()
    }

    fn member(fee: f64, opening: f64, joined: NaiveDate) -> Member {
        Member::new("Ledger", "111", fee, joined, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
            .with_opening_balance(opening)
    }

    fn pooled(member: &Member, amount: f64) -> Payment {
        NewPayment::pooled(member.id, amount, Utc::now()).into_payment()
    }

    fn tagged(member: &Member, amount: f64, period: MonthKey) -> Payment {
        NewPayment::for_period(member.id, amount, Utc::now(), period, PaymentMode::FullPayment)
            .into_payment()
    }

    fn statuses(entries: &[PeriodEntry]) -> Vec<CoverageStatus> {
        entries.iter().map(|entry| entry.status).collect()
    }

    #[test]
    fn runs_through_the_month_after_today() {
        let m = member(500.0, 0.0, date(2025, 3, 9));
        let ledger = CoverageService::build_ledger(&m, &[], date(2025, 5, 20));
        let periods: Vec<_> = ledger.iter().filter_map(PeriodEntry::period).collect();
        assert_eq!(
            periods,
            vec![month(2025, 3), month(2025, 4), month(2025, 5), month(2025, 6)]
        );
        assert!(ledger
            .iter()
            .all(|entry| entry.status == CoverageStatus::Unpaid));
    }

    #[test]
    fn opening_dues_are_covered_before_any_month() {
        let m = member(500.0, 200.0, date(2025, 5, 1));
        let payments = vec![pooled(&m, 200.0)];
        let ledger = CoverageService::build_ledger(&m, &payments, date(2025, 5, 15));
        assert!(ledger[0].is_opening());
        assert_eq!(ledger[0].status, CoverageStatus::Paid);
        assert_eq!(ledger[0].coverage_amount, 200.0);
        assert_eq!(ledger[1].period(), Some(month(2025, 5)));
        assert_eq!(ledger[1].status, CoverageStatus::Unpaid);
    }

    #[test]
    fn partially_covered_opening_consumes_the_whole_pool() {
        let m = member(500.0, 800.0, date(2025, 5, 1));
        let payments = vec![pooled(&m, 300.0)];
        let ledger = CoverageService::build_ledger(&m, &payments, date(2025, 5, 15));
        assert_eq!(ledger[0].status, CoverageStatus::Partial);
        assert_eq!(ledger[0].coverage_amount, 300.0);
        assert_eq!(ledger[0].due_amount, 800.0);
        assert!(ledger[1..]
            .iter()
            .all(|entry| entry.status == CoverageStatus::Unpaid));
    }

    #[test]
    fn epsilon_boundary_separates_partial_from_paid() {
        let joined = date(2025, 5, 1);
        let today = date(2025, 5, 10);
        let m = member(500.0, 0.0, joined);

        let ledger = CoverageService::build_ledger(&m, &[pooled(&m, 499.98)], today);
        assert_eq!(ledger[0].status, CoverageStatus::Partial);
        assert_eq!(ledger[0].coverage_amount, 499.98);

        let ledger = CoverageService::build_ledger(&m, &[pooled(&m, 499.99)], today);
        assert_eq!(ledger[0].status, CoverageStatus::Paid);
        assert_eq!(ledger[0].coverage_amount, 500.0);
    }

    #[test]
    fn prepaid_credit_extends_into_future_months() {
        let m = member(500.0, 0.0, date(2025, 1, 1));
        // Jan..Apr is through the month after today; 3250 covers 6.5 months.
        let payments = vec![pooled(&m, 3250.0)];
        let ledger = CoverageService::build_ledger(&m, &payments, date(2025, 3, 5));
        assert_eq!(ledger.len(), 7);
        assert_eq!(
            statuses(&ledger),
            vec![
                CoverageStatus::Paid,
                CoverageStatus::Paid,
                CoverageStatus::Paid,
                CoverageStatus::Paid,
                CoverageStatus::Paid,
                CoverageStatus::Paid,
                CoverageStatus::Partial,
            ]
        );
        assert_eq!(ledger[6].period(), Some(month(2025, 7)));
        assert_eq!(ledger[6].coverage_amount, 250.0);
    }

    #[test]
    fn exact_prepayment_stops_at_the_last_covered_month() {
        let m = member(100.0, 0.0, date(2025, 1, 1));
        let payments = vec![pooled(&m, 600.0)];
        let ledger = CoverageService::build_ledger(&m, &payments, date(2025, 1, 5));
        assert_eq!(ledger.len(), 6);
        assert!(ledger
            .iter()
            .all(|entry| entry.status == CoverageStatus::Paid));
    }

    #[test]
    fn large_credit_is_capped_at_ten_years() {
        let m = member(100.0, 50.0, date(2025, 1, 1));
        let payments = vec![pooled(&m, 1_000_000.0)];
        let ledger = CoverageService::build_ledger(&m, &payments, date(2025, 1, 5));
        let months = ledger.iter().filter(|entry| !entry.is_opening()).count();
        assert_eq!(months, MAX_LEDGER_MONTHS);
        assert_eq!(ledger.len(), MAX_LEDGER_MONTHS + 1);
        assert_eq!(ledger.last().and_then(PeriodEntry::period), Some(month(2034, 12)));
    }

    #[test]
    fn zero_fee_never_extends_past_the_horizon() {
        let m = member(0.0, 0.0, date(2025, 1, 1));
        let payments = vec![pooled(&m, 1000.0)];
        let ledger = CoverageService::build_ledger(&m, &payments, date(2025, 2, 5));
        assert_eq!(ledger.len(), 3);
        assert!(ledger
            .iter()
            .all(|entry| entry.status == CoverageStatus::Paid));
    }

    #[test]
    fn future_join_without_credit_has_no_months() {
        let m = member(500.0, 0.0, date(2026, 1, 1));
        let ledger = CoverageService::build_ledger(&m, &[], date(2025, 6, 1));
        assert!(ledger.is_empty());
    }

    #[test]
    fn duplicate_tags_are_tolerated() {
        let m = member(500.0, 0.0, date(2025, 1, 1));
        let payments = vec![
            tagged(&m, 500.0, month(2025, 1)),
            tagged(&m, 500.0, month(2025, 1)),
        ];
        let ledger = CoverageService::build_ledger(&m, &payments, date(2025, 2, 10));
        assert_eq!(
            statuses(&ledger),
            vec![CoverageStatus::Paid, CoverageStatus::Paid, CoverageStatus::Unpaid]
        );
    }

    #[test]
    fn paid_month_with_tag_resolves_to_revert() {
        let m = member(500.0, 0.0, date(2025, 1, 1));
        let mut older = tagged(&m, 500.0, month(2025, 1));
        older.date -= Duration::days(3);
        let newer = tagged(&m, 500.0, month(2025, 1));
        let payments = vec![older, newer.clone()];
        let action = CoverageService::resolve_toggle_for_period(
            &m,
            &payments,
            month(2025, 1),
            date(2025, 1, 20),
        )
        .expect("toggle resolves");
        assert_eq!(action, ToggleAction::Revert { payment: newer });
    }

    #[test]
    fn paid_month_from_rollover_is_not_revertible() {
        let m = member(500.0, 0.0, date(2025, 1, 1));
        let payments = vec![tagged(&m, 1000.0, month(2025, 1))];
        let err = CoverageService::resolve_toggle_for_period(
            &m,
            &payments,
            month(2025, 2),
            date(2025, 2, 20),
        )
        .expect_err("rollover month cannot be reverted");
        assert!(matches!(err, CoreError::NotRevertible(period) if period == month(2025, 2)));
    }

    #[test]
    fn unpaid_and_partial_months_resolve_to_recording() {
        let m = member(500.0, 0.0, date(2025, 1, 1));
        let payments = vec![pooled(&m, 200.0)];
        let ledger = CoverageService::build_ledger(&m, &payments, date(2025, 2, 3));

        let partial = CoverageService::resolve_toggle(&m, &payments, &ledger[0]).unwrap();
        assert_eq!(
            partial,
            ToggleAction::RecordPayment {
                period: month(2025, 1),
                status: CoverageStatus::Partial,
                suggested_amount: 500.0,
            }
        );

        let unpaid = CoverageService::resolve_toggle(&m, &payments, &ledger[1]).unwrap();
        assert!(matches!(
            unpaid,
            ToggleAction::RecordPayment {
                status: CoverageStatus::Unpaid,
                ..
            }
        ));
    }

    #[test]
    fn opening_entry_is_never_toggleable() {
        let m = member(500.0, 100.0, date(2025, 1, 1));
        let ledger = CoverageService::build_ledger(&m, &[], date(2025, 1, 3));
        let err = CoverageService::resolve_toggle(&m, &[], &ledger[0]).unwrap_err();
        assert!(matches!(err, CoreError::OpeningNotToggleable));
    }

    #[test]
    fn month_outside_ledger_is_rejected() {
        let m = member(500.0, 0.0, date(2025, 3, 1));
        let err = CoverageService::resolve_toggle_for_period(
            &m,
            &[],
            month(2024, 12),
            date(2025, 3, 3),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn month_wise_history_keeps_only_tagged_payments() {
        let m = member(500.0, 0.0, date(2025, 1, 1));
        let payments = vec![pooled(&m, 100.0), tagged(&m, 500.0, month(2025, 1))];
        let history = CoverageService::month_wise_history(&m, &payments);
        assert_eq!(history.len(), 1);
        assert!(history[0].is_tagged());
    }

    #[test]
    fn tagged_lookup_outlives_the_member_borrow() {
        let m = member(500.0, 0.0, date(2025, 1, 1));
        let other = member(500.0, 0.0, date(2025, 1, 1));
        let payments = vec![
            tagged(&other, 500.0, month(2025, 1)),
            tagged(&m, 500.0, month(2025, 1)),
        ];
        let found = {
            let snapshot = m.clone();
            CoverageService::tagged_payment(&snapshot, &payments, month(2025, 1))
        };
        assert_eq!(found.map(|payment| payment.member_id), Some(m.id));
    }
}
