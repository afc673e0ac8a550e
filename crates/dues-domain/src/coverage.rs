//! Derived, non-persisted ledger entries describing how far payments reach.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::MonthKey;

/// How much of an obligation the payment pool covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverageStatus {
    Paid,
    Partial,
    Unpaid,
}

impl CoverageStatus {
    /// Partial periods count as outstanding in aggregates.
    pub fn is_outstanding(self) -> bool {
        !matches!(self, CoverageStatus::Paid)
    }
}

impl fmt::Display for CoverageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CoverageStatus::Paid => "Paid",
            CoverageStatus::Partial => "Part Paid",
            CoverageStatus::Unpaid => "Unpaid",
        };
        f.write_str(label)
    }
}

/// What an entry stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PeriodKind {
    /// Lump sum owed at join time.
    Opening,
    Month { period: MonthKey },
}

/// One row of the coverage ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodEntry {
    #[serde(flatten)]
    pub kind: PeriodKind,
    pub status: CoverageStatus,
    /// Portion of `due_amount` covered by the pool.
    pub coverage_amount: f64,
    pub due_amount: f64,
}

impl PeriodEntry {
    pub fn opening(status: CoverageStatus, coverage_amount: f64, due_amount: f64) -> Self {
        Self {
            kind: PeriodKind::Opening,
            status,
            coverage_amount,
            due_amount,
        }
    }

    pub fn month(
        period: MonthKey,
        status: CoverageStatus,
        coverage_amount: f64,
        due_amount: f64,
    ) -> Self {
        Self {
            kind: PeriodKind::Month { period },
            status,
            coverage_amount,
            due_amount,
        }
    }

    pub fn period(&self) -> Option<MonthKey> {
        match self.kind {
            PeriodKind::Opening => None,
            PeriodKind::Month { period } => Some(period),
        }
    }

    pub fn is_opening(&self) -> bool {
        matches!(self.kind, PeriodKind::Opening)
    }

    pub fn label(&self) -> String {
        match self.kind {
            PeriodKind::Opening => "Opening Due".to_string(),
            PeriodKind::Month { period } => period.label(),
        }
    }
}

/// Paid / partial / pending tallies over a set of entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageCounts {
    pub paid: usize,
    pub partial: usize,
    pub unpaid: usize,
}

impl CoverageCounts {
    pub fn tally<'a>(entries: impl IntoIterator<Item = &'a PeriodEntry>) -> Self {
        entries
            .into_iter()
            .fold(CoverageCounts::default(), |mut counts, entry| {
                match entry.status {
                    CoverageStatus::Paid => counts.paid += 1,
                    CoverageStatus::Partial => counts.partial += 1,
                    CoverageStatus::Unpaid => counts.unpaid += 1,
                }
                counts
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_distinguish_opening_from_months() {
        let opening = PeriodEntry::opening(CoverageStatus::Paid, 200.0, 200.0);
        assert_eq!(opening.label(), "Opening Due");
        assert!(opening.period().is_none());

        let month = PeriodEntry::month(
            MonthKey::new(2025, 1).unwrap(),
            CoverageStatus::Partial,
            120.0,
            500.0,
        );
        assert_eq!(month.label(), "January 2025");
        assert!(month.status.is_outstanding());
    }

    #[test]
    fn serializes_kind_as_type_tag() {
        let entry = PeriodEntry::month(
            MonthKey::new(2025, 2).unwrap(),
            CoverageStatus::Unpaid,
            0.0,
            500.0,
        );
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"type\":\"month\""));
        assert!(json.contains("\"status\":\"unpaid\""));
        assert!(json.contains("\"coverageAmount\":0.0"));
    }

    #[test]
    fn tally_counts_each_status() {
        let entries = vec![
            PeriodEntry::opening(CoverageStatus::Paid, 1.0, 1.0),
            PeriodEntry::month(MonthKey::new(2025, 1).unwrap(), CoverageStatus::Paid, 5.0, 5.0),
            PeriodEntry::month(MonthKey::new(2025, 2).unwrap(), CoverageStatus::Partial, 2.0, 5.0),
            PeriodEntry::month(MonthKey::new(2025, 3).unwrap(), CoverageStatus::Unpaid, 0.0, 5.0),
        ];
        let counts = CoverageCounts::tally(&entries);
        assert_eq!(
            counts,
            CoverageCounts {
                paid: 2,
                partial: 1,
                unpaid: 1
            }
        );
    }
}
