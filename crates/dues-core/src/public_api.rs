//! Stable entry points for frontends that only need the calculators.

use chrono::NaiveDate;

use dues_domain::{BalanceSummary, DashboardStats, Member, Payment, PeriodEntry};

use crate::{
    balance_service::BalanceService, coverage_service::CoverageService,
    dashboard_service::DashboardService,
};

/// Balance of `member` as of `today`, pooling every payment the member owns.
pub fn compute_balance(member: &Member, payments: &[Payment], today: NaiveDate) -> BalanceSummary {
    BalanceService::compute(member, payments, today)
}

/// Coverage ledger of `member`, opening entry first, then months in order.
pub fn build_ledger(member: &Member, payments: &[Payment], today: NaiveDate) -> Vec<PeriodEntry> {
    CoverageService::build_ledger(member, payments, today)
}

pub fn compute_dashboard(
    members: &[Member],
    payments: &[Payment],
    today: NaiveDate,
) -> DashboardStats {
    DashboardService::compute(members, payments, today)
}
