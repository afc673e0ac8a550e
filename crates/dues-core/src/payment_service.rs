//! Recording, reverting and toggling payments.

use tracing::{debug, info};
use uuid::Uuid;

use dues_domain::{MonthKey, NewPayment, Payment, PaymentMode};

use crate::{
    coverage_service::{CoverageService, ToggleAction},
    member_service::MemberService,
    money::{round_currency, sanitize_amount},
    storage::DuesStorage,
    time::Clock,
    CoreError,
};

/// Ledger entry selected for a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleTarget {
    Opening,
    Month(MonthKey),
}

/// What a toggle ended up doing.
#[derive(Debug, Clone, PartialEq)]
pub enum ToggleOutcome {
    /// The tagged payment was deleted.
    Reverted(Payment),
    /// A full payment was recorded for the month.
    Recorded(Payment),
}

pub struct PaymentService;

impl PaymentService {
    /// Records the member's monthly fee against `period`.
    pub fn record_full(
        store: &dyn DuesStorage,
        clock: &dyn Clock,
        member_id: Uuid,
        period: MonthKey,
    ) -> Result<Payment, CoreError> {
        let member = MemberService::get(store, member_id)?;
        let amount = round_currency(sanitize_amount(member.subscription_amount));
        if amount <= 0.0 {
            return Err(CoreError::Validation(format!(
                "{} has no monthly fee to record",
                member.name
            )));
        }
        let payment = NewPayment::for_period(
            member_id,
            amount,
            clock.now(),
            period,
            PaymentMode::FullPayment,
        )
        .into_payment();
        Self::insert(store, payment)
    }

    /// Records an arbitrary amount, optionally earmarked for `period`.
    pub fn record_custom(
        store: &dyn DuesStorage,
        clock: &dyn Clock,
        member_id: Uuid,
        amount: f64,
        period: Option<MonthKey>,
    ) -> Result<Payment, CoreError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(CoreError::Validation(format!(
                "payment amount must be a positive number, got {}",
                amount
            )));
        }
        MemberService::get(store, member_id)?;
        let amount = round_currency(amount);
        let payment = match period {
            Some(period) => NewPayment::for_period(
                member_id,
                amount,
                clock.now(),
                period,
                PaymentMode::PartialPayment,
            ),
            None => NewPayment::pooled(member_id, amount, clock.now()),
        }
        .into_payment();
        Self::insert(store, payment)
    }

    /// Deletes a payment and returns the removed record.
    pub fn revert(store: &dyn DuesStorage, payment_id: Uuid) -> Result<Payment, CoreError> {
        let payment = store
            .list_payments(None)?
            .into_iter()
            .find(|payment| payment.id == payment_id)
            .ok_or(CoreError::PaymentNotFound(payment_id))?;
        store.delete_payment(payment_id)?;
        info!(
            payment = %payment.id,
            member = %payment.member_id,
            amount = payment.amount,
            "payment reverted"
        );
        Ok(payment)
    }

    /// Flips a ledger entry: paid months revert through their tagged payment,
    /// outstanding months get a full payment.
    pub fn toggle(
        store: &dyn DuesStorage,
        clock: &dyn Clock,
        member_id: Uuid,
        target: ToggleTarget,
    ) -> Result<ToggleOutcome, CoreError> {
        let action = Self::plan_toggle(store, clock, member_id, target)?;
        Self::apply_toggle(store, clock, member_id, action)
    }

    /// Resolves what toggling `target` would do without touching storage.
    pub fn plan_toggle(
        store: &dyn DuesStorage,
        clock: &dyn Clock,
        member_id: Uuid,
        target: ToggleTarget,
    ) -> Result<ToggleAction, CoreError> {
        let period = match target {
            ToggleTarget::Opening => return Err(CoreError::OpeningNotToggleable),
            ToggleTarget::Month(period) => period,
        };
        let member = MemberService::get(store, member_id)?;
        let payments = store.list_payments(Some(member_id))?;
        let action =
            CoverageService::resolve_toggle_for_period(&member, &payments, period, clock.today())?;
        debug!(member = %member_id, %period, ?action, "toggle resolved");
        Ok(action)
    }

    /// Carries out a planned toggle.
    pub fn apply_toggle(
        store: &dyn DuesStorage,
        clock: &dyn Clock,
        member_id: Uuid,
        action: ToggleAction,
    ) -> Result<ToggleOutcome, CoreError> {
        match action {
            ToggleAction::Revert { payment } => {
                Self::revert(store, payment.id).map(ToggleOutcome::Reverted)
            }
            ToggleAction::RecordPayment { period, .. } => {
                Self::record_full(store, clock, member_id, period).map(ToggleOutcome::Recorded)
            }
        }
    }

    /// Payment history for a member, newest first. `month_wise` keeps tagged payments only.
    pub fn history(
        store: &dyn DuesStorage,
        member_id: Uuid,
        month_wise: bool,
    ) -> Result<Vec<Payment>, CoreError> {
        let member = MemberService::get(store, member_id)?;
        let payments = store.list_payments(Some(member_id))?;
        if month_wise {
            return Ok(CoverageService::month_wise_history(&member, &payments)
                .into_iter()
                .cloned()
                .collect());
        }
        let mut payments = payments;
        payments.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(payments)
    }

    fn insert(store: &dyn DuesStorage, payment: Payment) -> Result<Payment, CoreError> {
        store.insert_payment(payment.clone())?;
        info!(
            payment = %payment.id,
            member = %payment.member_id,
            amount = payment.amount,
            period = %payment.period_label(),
            "payment recorded"
        );
        Ok(payment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FixedClock, MemoryDuesStorage};
    use chrono::NaiveDate;
    use dues_domain::{Member, NewMember};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn month(y: i32, m: u32) -> MonthKey {
        MonthKey::new(y, m).unwrap()
    }

    fn setup(fee: f64) -> (MemoryDuesStorage, FixedClock, Member) {
        let store = MemoryDuesStorage::new();
        let clock = FixedClock::on(date(2025, 3, 10));
        let member = MemberService::add(
            &store,
            &clock,
            NewMember::new("Payer", "1", fee, date(2025, 1, 1)),
        )
        .unwrap();
        (store, clock, member)
    }

    #[test]
    fn custom_amounts_are_validated_before_any_write() {
        let (store, clock, member) = setup(500.0);
        for bad in [0.0, -10.0, f64::NAN, f64::INFINITY] {
            let err = PaymentService::record_custom(&store, &clock, member.id, bad, None)
                .unwrap_err();
            assert!(matches!(err, CoreError::Validation(_)), "{bad}");
        }
        assert_eq!(store.payment_count().unwrap(), 0);
    }

    #[test]
    fn custom_payment_mode_depends_on_tag() {
        let (store, clock, member) = setup(500.0);
        let tagged =
            PaymentService::record_custom(&store, &clock, member.id, 120.0, Some(month(2025, 2)))
                .unwrap();
        assert_eq!(tagged.mode, PaymentMode::PartialPayment);
        assert_eq!(tagged.for_month, Some(2));
        assert_eq!(tagged.for_year, Some(2025));

        let pooled = PaymentService::record_custom(&store, &clock, member.id, 80.0, None).unwrap();
        assert_eq!(pooled.mode, PaymentMode::Payment);
        assert!(!pooled.is_tagged());
    }

    #[test]
    fn record_full_uses_the_monthly_fee() {
        let (store, clock, member) = setup(500.0);
        let payment =
            PaymentService::record_full(&store, &clock, member.id, month(2025, 1)).unwrap();
        assert_eq!(payment.amount, 500.0);
        assert_eq!(payment.mode, PaymentMode::FullPayment);
        assert_eq!(payment.date, clock.now());
    }

    #[test]
    fn toggle_records_then_reverts() {
        let (store, clock, member) = setup(500.0);
        let target = ToggleTarget::Month(month(2025, 1));

        let recorded = PaymentService::toggle(&store, &clock, member.id, target).unwrap();
        let ToggleOutcome::Recorded(payment) = recorded else {
            panic!("expected a recorded payment");
        };
        assert!(payment.is_for(month(2025, 1)));

        let reverted = PaymentService::toggle(&store, &clock, member.id, target).unwrap();
        assert_eq!(reverted, ToggleOutcome::Reverted(payment));
        assert_eq!(store.payment_count().unwrap(), 0);
    }

    #[test]
    fn planning_a_revert_leaves_the_payment_in_place() {
        let (store, clock, member) = setup(500.0);
        let payment =
            PaymentService::record_full(&store, &clock, member.id, month(2025, 1)).unwrap();

        let target = ToggleTarget::Month(month(2025, 1));
        let action = PaymentService::plan_toggle(&store, &clock, member.id, target).unwrap();
        assert_eq!(action, ToggleAction::Revert { payment: payment.clone() });
        assert_eq!(store.payment_count().unwrap(), 1);

        let outcome = PaymentService::apply_toggle(&store, &clock, member.id, action).unwrap();
        assert_eq!(outcome, ToggleOutcome::Reverted(payment));
        assert_eq!(store.payment_count().unwrap(), 0);
    }

    #[test]
    fn toggle_refuses_pool_covered_months_and_opening() {
        let (store, clock, member) = setup(500.0);
        PaymentService::record_custom(&store, &clock, member.id, 1000.0, None).unwrap();

        let err = PaymentService::toggle(&store, &clock, member.id, ToggleTarget::Month(month(2025, 2)))
            .unwrap_err();
        assert!(matches!(err, CoreError::NotRevertible(period) if period == month(2025, 2)));

        let err = PaymentService::toggle(&store, &clock, member.id, ToggleTarget::Opening)
            .unwrap_err();
        assert!(matches!(err, CoreError::OpeningNotToggleable));
        assert_eq!(store.payment_count().unwrap(), 1);
    }

    #[test]
    fn revert_unknown_payment_is_not_found() {
        let (store, _, _) = setup(500.0);
        let id = Uuid::new_v4();
        assert!(matches!(
            PaymentService::revert(&store, id),
            Err(CoreError::PaymentNotFound(found)) if found == id
        ));
    }

    #[test]
    fn history_is_newest_first_with_month_wise_filter() {
        let (store, clock, member) = setup(500.0);
        let first =
            PaymentService::record_full(&store, &clock, member.id, month(2025, 1)).unwrap();
        let later_clock = FixedClock::on(date(2025, 3, 12));
        let second =
            PaymentService::record_custom(&store, &later_clock, member.id, 50.0, None).unwrap();

        let all = PaymentService::history(&store, member.id, false).unwrap();
        assert_eq!(all.iter().map(|p| p.id).collect::<Vec<_>>(), vec![second.id, first.id]);

        let month_wise = PaymentService::history(&store, member.id, true).unwrap();
        assert_eq!(month_wise, vec![first]);
    }
}
