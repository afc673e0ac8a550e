//! Collection reports over recorded payments.

use std::{collections::HashMap, fmt};

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use dues_domain::{Member, MonthKey, Payment, PaymentMode};

use crate::money::sum_rounded;

/// Window over the payment's recorded date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportRange {
    Today,
    ThisMonth,
    #[default]
    AllTime,
}

impl ReportRange {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "today" | "day" => Some(ReportRange::Today),
            "month" | "this-month" | "thismonth" => Some(ReportRange::ThisMonth),
            "all" | "all-time" | "alltime" => Some(ReportRange::AllTime),
            _ => None,
        }
    }

    pub fn contains(self, recorded: NaiveDate, today: NaiveDate) -> bool {
        match self {
            ReportRange::Today => recorded == today,
            ReportRange::ThisMonth => MonthKey::containing(recorded) == MonthKey::containing(today),
            ReportRange::AllTime => true,
        }
    }
}

impl fmt::Display for ReportRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ReportRange::Today => "Today",
            ReportRange::ThisMonth => "This Month",
            ReportRange::AllTime => "All Time",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub payment_id: Uuid,
    pub member_name: String,
    pub amount: f64,
    /// Short month label, or `Manual` for pooled payments.
    pub period_label: String,
    pub date: DateTime<Utc>,
    pub mode: PaymentMode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectionReport {
    pub range: ReportRange,
    /// Newest first.
    pub rows: Vec<ReportRow>,
    pub total_collected: f64,
}

pub struct ReportService;

impl ReportService {
    pub fn collection(
        members: &[Member],
        payments: &[Payment],
        range: ReportRange,
        today: NaiveDate,
    ) -> CollectionReport {
        let names: HashMap<Uuid, &str> = members
            .iter()
            .map(|member| (member.id, member.name.as_str()))
            .collect();

        let mut selected: Vec<&Payment> = payments
            .iter()
            .filter(|payment| range.contains(payment.date.date_naive(), today))
            .collect();
        selected.sort_by(|a, b| b.date.cmp(&a.date));

        let rows: Vec<ReportRow> = selected
            .into_iter()
            .map(|payment| ReportRow {
                payment_id: payment.id,
                member_name: names
                    .get(&payment.member_id)
                    .copied()
                    .unwrap_or("Unknown")
                    .to_string(),
                amount: payment.amount,
                period_label: payment.period_label(),
                date: payment.date,
                mode: payment.mode,
            })
            .collect();
        let total_collected = sum_rounded(rows.iter().map(|row| row.amount));

        CollectionReport {
            range,
            rows,
            total_collected,
        }
    }
}
