//! Payment records and their descriptive modes.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::*;

/// Money received from a member.
///
/// `date` is when the payment was recorded. The optional `for_month`/`for_year`
/// pair earmarks the payment for a billing month; the tag is advisory for
/// display and grid reverts, balances always pool every payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub member_id: Uuid,
    pub amount: f64,
    pub date: DateTime<Utc>,
    /// Calendar month, 1-12.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub for_month: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub for_year: Option<i32>,
    #[serde(default)]
    pub mode: PaymentMode,
}

impl Payment {
    /// Returns the earmarked month, if both halves of the tag are present and valid.
    pub fn period(&self) -> Option<MonthKey> {
        match (self.for_year, self.for_month) {
            (Some(year), Some(month)) => MonthKey::new(year, month),
            _ => None,
        }
    }

    pub fn is_tagged(&self) -> bool {
        self.period().is_some()
    }

    pub fn is_for(&self, period: MonthKey) -> bool {
        self.period() == Some(period)
    }

    /// Label for the covered period, or `Manual` for pool payments.
    pub fn period_label(&self) -> String {
        self.period()
            .map(|period| period.short_label())
            .unwrap_or_else(|| "Manual".to_string())
    }
}

impl Identifiable for Payment {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Amounted for Payment {
    fn amount(&self) -> f64 {
        self.amount
    }
}

impl Displayable for Payment {
    fn display_label(&self) -> String {
        format!("payment:{} [{} {}]", self.id, self.mode, self.period_label())
    }
}

/// Descriptive tag recorded with each payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaymentMode {
    #[serde(rename = "Full Payment")]
    FullPayment,
    #[serde(rename = "Partial Payment")]
    PartialPayment,
    #[serde(rename = "Monthly Fee")]
    MonthlyFee,
    #[default]
    #[serde(rename = "Payment")]
    Payment,
}

impl fmt::Display for PaymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PaymentMode::FullPayment => "Full Payment",
            PaymentMode::PartialPayment => "Partial Payment",
            PaymentMode::MonthlyFee => "Monthly Fee",
            PaymentMode::Payment => "Payment",
        };
        f.write_str(label)
    }
}

/// Input for recording a payment; identity is assigned on insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPayment {
    pub member_id: Uuid,
    pub amount: f64,
    pub date: DateTime<Utc>,
    pub period: Option<MonthKey>,
    pub mode: PaymentMode,
}

impl NewPayment {
    /// Untagged contribution to the member's pool.
    pub fn pooled(member_id: Uuid, amount: f64, date: DateTime<Utc>) -> Self {
        Self {
            member_id,
            amount,
            date,
            period: None,
            mode: PaymentMode::Payment,
        }
    }

    /// Payment earmarked for `period`.
    pub fn for_period(
        member_id: Uuid,
        amount: f64,
        date: DateTime<Utc>,
        period: MonthKey,
        mode: PaymentMode,
    ) -> Self {
        Self {
            member_id,
            amount,
            date,
            period: Some(period),
            mode,
        }
    }

    pub fn into_payment(self) -> Payment {
        Payment {
            id: Uuid::new_v4(),
            member_id: self.member_id,
            amount: self.amount,
            date: self.date,
            for_month: self.period.map(|period| period.month),
            for_year: self.period.map(|period| period.year),
            mode: self.mode,
        }
    }
}
