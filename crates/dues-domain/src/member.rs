//! Member records and the inputs used to create or edit them.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::*;

/// A subscribing member of the organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub subscription_amount: f64,
    #[serde(default)]
    pub subscription_type: SubscriptionType,
    /// Dues owed as of `join_date`.
    #[serde(default)]
    pub opening_balance: f64,
    /// Day-of-month is ignored by all period math.
    pub join_date: NaiveDate,
    #[serde(default = "Member::default_active")]
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Member {
    pub fn new(
        name: impl Into<String>,
        phone: impl Into<String>,
        subscription_amount: f64,
        join_date: NaiveDate,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            phone: phone.into(),
            email: None,
            subscription_amount,
            subscription_type: SubscriptionType::default(),
            opening_balance: 0.0,
            join_date,
            active: true,
            created_at,
        }
    }

    pub fn with_opening_balance(mut self, opening_balance: f64) -> Self {
        self.opening_balance = opening_balance;
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// First billing month.
    pub fn join_month(&self) -> MonthKey {
        MonthKey::containing(self.join_date)
    }

    /// Case-insensitive name match or plain phone substring match.
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.trim();
        if needle.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&needle.to_lowercase()) || self.phone.contains(needle)
    }

    /// Applies the populated fields of `update`.
    pub fn apply(&mut self, update: &MemberUpdate) {
        if let Some(name) = &update.name {
            self.name = name.clone();
        }
        if let Some(phone) = &update.phone {
            self.phone = phone.clone();
        }
        if let Some(email) = &update.email {
            self.email = email.clone();
        }
        if let Some(amount) = update.subscription_amount {
            self.subscription_amount = amount;
        }
        if let Some(kind) = update.subscription_type {
            self.subscription_type = kind;
        }
        if let Some(date) = update.join_date {
            self.join_date = date;
        }
        if let Some(active) = update.active {
            self.active = active;
        }
    }

    fn default_active() -> bool {
        true
    }
}

impl Identifiable for Member {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl NamedEntity for Member {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Displayable for Member {
    fn display_label(&self) -> String {
        format!("{} ({})", self.name, self.phone)
    }
}

/// Informational billing cadence. Period math is always monthly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SubscriptionType {
    #[default]
    Monthly,
    Yearly,
    #[serde(rename = "One-Time", alias = "OneTime")]
    OneTime,
}

impl SubscriptionType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "monthly" => Some(SubscriptionType::Monthly),
            "yearly" => Some(SubscriptionType::Yearly),
            "one-time" | "onetime" | "one_time" => Some(SubscriptionType::OneTime),
            _ => None,
        }
    }
}

impl fmt::Display for SubscriptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SubscriptionType::Monthly => "Monthly",
            SubscriptionType::Yearly => "Yearly",
            SubscriptionType::OneTime => "One-Time",
        };
        f.write_str(label)
    }
}

/// Input for registering a member; identity and timestamps are assigned on insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMember {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub subscription_amount: f64,
    pub subscription_type: SubscriptionType,
    pub opening_balance: f64,
    pub join_date: NaiveDate,
}

impl NewMember {
    pub fn new(
        name: impl Into<String>,
        phone: impl Into<String>,
        subscription_amount: f64,
        join_date: NaiveDate,
    ) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
            email: None,
            subscription_amount,
            subscription_type: SubscriptionType::default(),
            opening_balance: 0.0,
            join_date,
        }
    }

    pub fn with_opening_balance(mut self, opening_balance: f64) -> Self {
        self.opening_balance = opening_balance;
        self
    }

    pub fn into_member(self, created_at: DateTime<Utc>) -> Member {
        Member {
            id: Uuid::new_v4(),
            name: self.name,
            phone: self.phone,
            email: self.email,
            subscription_amount: self.subscription_amount,
            subscription_type: self.subscription_type,
            opening_balance: self.opening_balance,
            join_date: self.join_date,
            active: true,
            created_at,
        }
    }
}

/// Partial edit of a member. The opening balance is fixed at registration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemberUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    /// `Some(None)` clears the email.
    pub email: Option<Option<String>>,
    pub subscription_amount: Option<f64>,
    pub subscription_type: Option<SubscriptionType>,
    pub join_date: Option<NaiveDate>,
    pub active: Option<bool>,
}

impl MemberUpdate {
    pub fn is_empty(&self) -> bool {
        self == &MemberUpdate::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Member {
        Member::new(
            "Asha Rao",
            "98450 12345",
            500.0,
            NaiveDate::from_ymd_opt(2024, 5, 17).unwrap(),
            Utc::now(),
        )
    }

    #[test]
    fn matches_name_case_insensitively_and_phone_verbatim() {
        let member = sample();
        assert!(member.matches("asha"));
        assert!(member.matches("RAO"));
        assert!(member.matches("12345"));
        assert!(!member.matches("ravi"));
        assert!(member.matches("  "));
    }

    #[test]
    fn apply_leaves_unset_fields_untouched() {
        let mut member = sample().with_email("asha@example.org");
        member.apply(&MemberUpdate {
            subscription_amount: Some(750.0),
            active: Some(false),
            ..MemberUpdate::default()
        });
        assert_eq!(member.subscription_amount, 750.0);
        assert!(!member.active);
        assert_eq!(member.name, "Asha Rao");
        assert_eq!(member.email.as_deref(), Some("asha@example.org"));

        member.apply(&MemberUpdate {
            email: Some(None),
            ..MemberUpdate::default()
        });
        assert!(member.email.is_none());
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let member = sample().with_opening_balance(200.0);
        let json = serde_json::to_string(&member).expect("serialize");
        assert!(json.contains("\"subscriptionAmount\":500.0"));
        assert!(json.contains("\"openingBalance\":200.0"));
        assert!(json.contains("\"joinDate\":\"2024-05-17\""));
        assert!(json.contains("\"subscriptionType\":\"Monthly\""));
    }

    #[test]
    fn subscription_type_accepts_one_time_spellings() {
        assert_eq!(
            SubscriptionType::parse("One-Time"),
            Some(SubscriptionType::OneTime)
        );
        let parsed: SubscriptionType = serde_json::from_str("\"One-Time\"").unwrap();
        assert_eq!(parsed, SubscriptionType::OneTime);
        assert_eq!(SubscriptionType::parse("weekly"), None);
    }
}
