use chrono::NaiveDate;

use dues_core::{
    build_ledger, compute_balance, money::COVERAGE_EPSILON, Clock, CoreError, CoverageService,
    DuesStorage, FixedClock, MemberService, MemoryDuesStorage, PaymentService, ToggleOutcome,
    ToggleTarget, MAX_LEDGER_MONTHS,
};
use dues_domain::{CoverageStatus, MonthKey, NewMember};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn month(y: i32, m: u32) -> MonthKey {
    MonthKey::new(y, m).expect("valid month")
}

struct Fixture {
    store: MemoryDuesStorage,
    clock: FixedClock,
}

impl Fixture {
    fn new(today: NaiveDate) -> Self {
        Self {
            store: MemoryDuesStorage::new(),
            clock: FixedClock::on(today),
        }
    }

    fn member(&self, fee: f64, joined: NaiveDate) -> uuid::Uuid {
        MemberService::add(
            &self.store,
            &self.clock,
            NewMember::new("Fixture", "0", fee, joined),
        )
        .expect("add member")
        .id
    }

    fn clock_today(&self) -> NaiveDate {
        self.clock.today()
    }

    fn ledger_status(&self, id: uuid::Uuid, period: MonthKey) -> CoverageStatus {
        let member = MemberService::get(&self.store, id).expect("member");
        let payments = self.store.list_payments(Some(id)).expect("payments");
        let ledger = build_ledger(&member, &payments, self.clock_today());
        CoverageService::entry_for(&ledger, period)
            .expect("entry")
            .status
    }
}

#[test]
fn partial_threshold_is_inclusive_of_the_epsilon() {
    assert_eq!(COVERAGE_EPSILON, 0.01);
    let fx = Fixture::new(date(2025, 1, 20));

    let paid = fx.member(500.0, date(2025, 1, 1));
    PaymentService::record_custom(&fx.store, &fx.clock, paid, 499.99, Some(month(2025, 1)))
        .expect("record");
    assert_eq!(fx.ledger_status(paid, month(2025, 1)), CoverageStatus::Paid);

    let partial = fx.member(500.0, date(2025, 1, 1));
    PaymentService::record_custom(&fx.store, &fx.clock, partial, 499.98, Some(month(2025, 1)))
        .expect("record");
    assert_eq!(fx.ledger_status(partial, month(2025, 1)), CoverageStatus::Partial);
}

#[test]
fn prepaid_credit_extends_the_ledger_until_exhausted() {
    let fx = Fixture::new(date(2025, 1, 20));
    let id = fx.member(200.0, date(2025, 1, 1));
    PaymentService::record_custom(&fx.store, &fx.clock, id, 1100.0, None).expect("record");

    let member = MemberService::get(&fx.store, id).expect("member");
    let payments = fx.store.list_payments(Some(id)).expect("payments");
    let ledger = build_ledger(&member, &payments, fx.clock_today());

    let statuses: Vec<_> = ledger.iter().map(|entry| entry.status).collect();
    assert_eq!(
        statuses,
        vec![
            CoverageStatus::Paid,
            CoverageStatus::Paid,
            CoverageStatus::Paid,
            CoverageStatus::Paid,
            CoverageStatus::Paid,
            CoverageStatus::Partial,
        ]
    );
    assert_eq!(ledger.last().and_then(|entry| entry.period()), Some(month(2025, 6)));
    assert_eq!(ledger.last().map(|entry| entry.coverage_amount), Some(100.0));

    let summary = compute_balance(&member, &payments, fx.clock_today());
    assert_eq!(summary.advance_credit, 1100.0 - 200.0);
}

#[test]
fn huge_credit_is_capped() {
    let fx = Fixture::new(date(2025, 1, 20));
    let id = fx.member(1.0, date(2025, 1, 1));
    PaymentService::record_custom(&fx.store, &fx.clock, id, 10_000.0, None).expect("record");

    let member = MemberService::get(&fx.store, id).expect("member");
    let payments = fx.store.list_payments(Some(id)).expect("payments");
    let ledger = build_ledger(&member, &payments, fx.clock_today());
    assert_eq!(ledger.len(), MAX_LEDGER_MONTHS);
    assert!(ledger.iter().all(|entry| entry.status == CoverageStatus::Paid));
}

#[test]
fn grid_toggle_round_trip_leaves_no_payments_behind() {
    let fx = Fixture::new(date(2025, 1, 20));
    let id = fx.member(500.0, date(2025, 1, 1));
    let target = ToggleTarget::Month(month(2025, 1));

    let outcome = PaymentService::toggle(&fx.store, &fx.clock, id, target).expect("record");
    assert!(matches!(outcome, ToggleOutcome::Recorded(_)));
    assert_eq!(fx.ledger_status(id, month(2025, 1)), CoverageStatus::Paid);

    let outcome = PaymentService::toggle(&fx.store, &fx.clock, id, target).expect("revert");
    assert!(matches!(outcome, ToggleOutcome::Reverted(_)));
    assert_eq!(fx.ledger_status(id, month(2025, 1)), CoverageStatus::Unpaid);
    assert!(fx.store.list_payments(Some(id)).expect("payments").is_empty());
}

#[test]
fn cascading_delete_removes_every_payment() {
    let fx = Fixture::new(date(2025, 1, 20));
    let id = fx.member(500.0, date(2024, 6, 1));
    for _ in 0..5 {
        PaymentService::record_custom(&fx.store, &fx.clock, id, 100.0, None).expect("record");
    }
    fx.store.delete_member(id).expect("delete");

    assert!(fx.store.list_payments(Some(id)).expect("payments").is_empty());
    assert!(matches!(
        MemberService::balance(&fx.store, id, date(2025, 1, 20)),
        Err(CoreError::MemberNotFound(_))
    ));
}
