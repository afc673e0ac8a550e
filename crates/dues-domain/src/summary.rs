//! Derived balance and dashboard views.

use serde::{Deserialize, Serialize};

use crate::member::Member;

/// Where a member stands after pooling every payment against their obligations.
///
/// `balance > 0` means money is owed, `balance < 0` means advance credit.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSummary {
    pub balance: f64,
    pub total_due: f64,
    pub advance_credit: f64,
    /// Months in the obligation window not fully covered (partial months included).
    pub unpaid_months_count: u32,
    pub total_months_count: u32,
    pub opening_dues: f64,
    pub total_paid: f64,
}

impl BalanceSummary {
    pub fn owes(&self) -> bool {
        self.balance > 0.0
    }

    pub fn has_credit(&self) -> bool {
        self.balance < 0.0
    }
}

/// A member paired with their computed balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberBalance {
    pub member: Member,
    pub summary: BalanceSummary,
}

/// Organization-wide totals.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_members: usize,
    pub active_members: usize,
    pub total_collected: f64,
    pub total_pending: f64,
    pub members: Vec<MemberBalance>,
    pub pending_members: Vec<MemberBalance>,
}
