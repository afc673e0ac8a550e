//! Shared traits and calendar-month helpers for dues accounting.

use std::{fmt, str::FromStr};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Exposes a stable identifier for stored entities.
pub trait Identifiable {
    fn id(&self) -> Uuid;
}

/// Provides read-only access to an entity's display name.
pub trait NamedEntity {
    fn name(&self) -> &str;
}

/// Supplies a common contract for retrieving monetary amounts.
pub trait Amounted {
    fn amount(&self) -> f64;
}

/// Converts an entity into a user-facing display label.
pub trait Displayable {
    fn display_label(&self) -> String;
}

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// One calendar month of subscription obligation, normalized to its first day.
///
/// Ordering follows the calendar: `year` first, then `month` (1-12).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    /// Builds a key, rejecting months outside `1..=12`.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    /// Returns the month that contains `date`.
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// First calendar day of the month.
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Linear month index, used for month arithmetic.
    pub fn index(&self) -> i64 {
        self.year as i64 * 12 + (self.month as i64 - 1)
    }

    pub fn from_index(index: i64) -> Self {
        Self {
            year: index.div_euclid(12) as i32,
            month: index.rem_euclid(12) as u32 + 1,
        }
    }

    pub fn shift(&self, months: i64) -> Self {
        Self::from_index(self.index() + months)
    }

    pub fn next(&self) -> Self {
        self.shift(1)
    }

    /// Number of months from `self` to `other` (negative when `other` is earlier).
    pub fn months_until(&self, other: MonthKey) -> i64 {
        other.index() - self.index()
    }

    pub fn month_name(&self) -> &'static str {
        MONTH_NAMES[(self.month.clamp(1, 12) - 1) as usize]
    }

    /// Human label such as `January 2025`.
    pub fn label(&self) -> String {
        format!("{} {}", self.month_name(), self.year)
    }

    /// Short label such as `Jan 2025`.
    pub fn short_label(&self) -> String {
        format!("{} {}", &self.month_name()[..3], self.year)
    }
}

impl From<NaiveDate> for MonthKey {
    fn from(date: NaiveDate) -> Self {
        MonthKey::containing(date)
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = MonthKeyParseError;

    /// Parses `YYYY-MM`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let (year, month) = trimmed
            .split_once('-')
            .ok_or_else(|| MonthKeyParseError(trimmed.to_string()))?;
        let year: i32 = year
            .parse()
            .map_err(|_| MonthKeyParseError(trimmed.to_string()))?;
        let month: u32 = month
            .parse()
            .map_err(|_| MonthKeyParseError(trimmed.to_string()))?;
        MonthKey::new(year, month).ok_or_else(|| MonthKeyParseError(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthKeyParseError(pub String);

impl fmt::Display for MonthKeyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid month `{}` (use YYYY-MM)", self.0)
    }
}

impl std::error::Error for MonthKeyParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_crosses_year_boundaries() {
        let dec = MonthKey::new(2024, 12).unwrap();
        assert_eq!(dec.next(), MonthKey::new(2025, 1).unwrap());
        assert_eq!(dec.shift(-12), MonthKey::new(2023, 12).unwrap());
        assert_eq!(dec.shift(-11), MonthKey::new(2024, 1).unwrap());
    }

    #[test]
    fn containing_ignores_day_of_month() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();
        let key = MonthKey::containing(date);
        assert_eq!(key.first_day(), NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        assert_eq!(key.label(), "March 2025");
        assert_eq!(key.short_label(), "Mar 2025");
    }

    #[test]
    fn parses_and_displays_year_month() {
        let key: MonthKey = "2025-07".parse().expect("valid key");
        assert_eq!(key.to_string(), "2025-07");
        assert!("2025-13".parse::<MonthKey>().is_err());
        assert!("July".parse::<MonthKey>().is_err());
    }

    #[test]
    fn months_until_counts_calendar_steps() {
        let start = MonthKey::new(2024, 11).unwrap();
        let end = MonthKey::new(2025, 2).unwrap();
        assert_eq!(start.months_until(end), 3);
        assert_eq!(end.months_until(start), -3);
    }
}
