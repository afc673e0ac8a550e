//! Storage collaborator contract and data integrity checks.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use dues_domain::{DuesSnapshot, Member, MemberUpdate, MonthKey, Payment};

use crate::CoreError;

/// Abstraction over persistence backends holding members and their payments.
///
/// Writes are atomic per record. Callers re-read and recompute after every mutation.
pub trait DuesStorage: Send + Sync {
    fn list_members(&self) -> Result<Vec<Member>, CoreError>;
    fn get_member(&self, id: Uuid) -> Result<Option<Member>, CoreError>;
    /// All payments, or only those owned by `member_id`.
    fn list_payments(&self, member_id: Option<Uuid>) -> Result<Vec<Payment>, CoreError>;
    fn insert_member(&self, member: Member) -> Result<Uuid, CoreError>;
    fn update_member(&self, id: Uuid, update: &MemberUpdate) -> Result<(), CoreError>;
    fn insert_payment(&self, payment: Payment) -> Result<Uuid, CoreError>;
    fn delete_payment(&self, id: Uuid) -> Result<(), CoreError>;

    /// Removes the member record only. Use [`DuesStorage::delete_member`] instead.
    fn remove_member_record(&self, id: Uuid) -> Result<(), CoreError>;

    /// Deletes a member and every payment it owns.
    ///
    /// Payments go first: an interruption leaves orphaned payments, never a member
    /// whose payments have vanished.
    fn delete_member(&self, id: Uuid) -> Result<(), CoreError> {
        if self.get_member(id)?.is_none() {
            return Err(CoreError::member_not_found(id));
        }
        for payment in self.list_payments(Some(id))? {
            self.delete_payment(payment.id)?;
        }
        self.remove_member_record(id)
    }

    /// Captures every member and payment.
    fn export_snapshot(&self, timestamp: DateTime<Utc>) -> Result<DuesSnapshot, CoreError> {
        Ok(DuesSnapshot::with_data(
            timestamp,
            self.list_members()?,
            self.list_payments(None)?,
        ))
    }

    /// Replaces all stored data with `snapshot`.
    fn import_snapshot(&self, snapshot: &DuesSnapshot) -> Result<(), CoreError>;
}

/// Detects dangling references and other anomalies within a dataset.
pub fn integrity_warnings(members: &[Member], payments: &[Payment]) -> Vec<String> {
    let member_ids: HashSet<_> = members.iter().map(|member| member.id).collect();
    let mut seen_tags: HashMap<(Uuid, MonthKey), usize> = HashMap::new();
    let mut warnings = Vec::new();

    for payment in payments {
        if !member_ids.contains(&payment.member_id) {
            warnings.push(format!(
                "payment {} references unknown member {}",
                payment.id, payment.member_id
            ));
        }
        if !(payment.amount.is_finite() && payment.amount > 0.0) {
            warnings.push(format!(
                "payment {} has a non-positive amount {}",
                payment.id, payment.amount
            ));
        }
        if let Some(period) = payment.period() {
            *seen_tags.entry((payment.member_id, period)).or_default() += 1;
        }
    }

    let mut duplicates: Vec<_> = seen_tags
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .collect();
    duplicates.sort_by_key(|((member, period), _)| (*member, *period));
    for ((member, period), count) in duplicates {
        warnings.push(format!(
            "member {} has {} payments tagged to {}",
            member, count, period
        ));
    }
    warnings
}

/// Validates a snapshot before it replaces stored data.
pub fn validate_snapshot(snapshot: &DuesSnapshot) -> Result<(), CoreError> {
    if snapshot.version > dues_domain::SNAPSHOT_SCHEMA_VERSION {
        return Err(CoreError::Validation(format!(
            "snapshot version {} is newer than supported version {}",
            snapshot.version,
            dues_domain::SNAPSHOT_SCHEMA_VERSION
        )));
    }
    let mut ids = HashSet::new();
    for member in &snapshot.members {
        if !ids.insert(member.id) {
            return Err(CoreError::Validation(format!(
                "snapshot contains member {} twice",
                member.id
            )));
        }
    }
    let mut payment_ids = HashSet::new();
    for payment in &snapshot.payments {
        if !payment_ids.insert(payment.id) {
            return Err(CoreError::Validation(format!(
                "snapshot contains payment {} twice",
                payment.id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use dues_domain::{NewPayment, PaymentMode};

    #[test]
    fn reports_orphans_and_duplicate_tags() {
        let member = Member::new(
            "Known",
            "1",
            100.0,
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            Utc::now(),
        );
        let period = MonthKey::new(2025, 1).unwrap();
        let payments = vec![
            NewPayment::for_period(member.id, 100.0, Utc::now(), period, PaymentMode::FullPayment)
                .into_payment(),
            NewPayment::for_period(member.id, 100.0, Utc::now(), period, PaymentMode::FullPayment)
                .into_payment(),
            NewPayment::pooled(Uuid::new_v4(), 50.0, Utc::now()).into_payment(),
        ];

        let warnings = integrity_warnings(&[member], &payments);
        assert_eq!(warnings.len(), 2, "{warnings:?}");
        assert!(warnings[0].contains("unknown member"));
        assert!(warnings[1].contains("2 payments tagged to 2025-01"));
    }

    #[test]
    fn rejects_snapshots_from_newer_schema() {
        let mut snapshot = DuesSnapshot::new(Utc::now());
        snapshot.version = dues_domain::SNAPSHOT_SCHEMA_VERSION + 1;
        assert!(matches!(
            validate_snapshot(&snapshot),
            Err(CoreError::Validation(_))
        ));
    }
}
