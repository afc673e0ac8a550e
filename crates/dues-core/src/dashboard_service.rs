//! Organization-wide totals composed from per-member balances.

use chrono::NaiveDate;

use dues_domain::{DashboardStats, Member, MemberBalance, Payment};

use crate::{
    balance_service::BalanceService,
    money::{round_currency, sum_rounded},
};

pub struct DashboardService;

impl DashboardService {
    /// Runs the balance calculator for every member and aggregates the results.
    ///
    /// `total_collected` covers every payment in `payments`, including any whose
    /// member no longer exists.
    pub fn compute(members: &[Member], payments: &[Payment], today: NaiveDate) -> DashboardStats {
        let balances: Vec<MemberBalance> = members
            .iter()
            .map(|member| MemberBalance {
                member: member.clone(),
                summary: BalanceService::compute(member, payments, today),
            })
            .collect();

        let total_collected = sum_rounded(payments.iter().map(|payment| payment.amount));
        let total_pending = balances.iter().fold(0.0, |total, entry| {
            round_currency(total + entry.summary.balance.max(0.0))
        });
        let pending_members: Vec<MemberBalance> = balances
            .iter()
            .filter(|entry| entry.summary.owes())
            .cloned()
            .collect();

        DashboardStats {
            total_members: members.len(),
            active_members: members.iter().filter(|member| member.active).count(),
            total_collected,
            total_pending,
            members: balances,
            pending_members,
        }
    }
}
