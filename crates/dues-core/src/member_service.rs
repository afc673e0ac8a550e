//! Member registration, edits, lookups and the per-member detail view.

use chrono::NaiveDate;
use tracing::info;
use uuid::Uuid;

use dues_domain::{
    BalanceSummary, CoverageCounts, Member, MemberUpdate, NewMember, Payment, PeriodEntry,
};

use crate::{
    balance_service::BalanceService, coverage_service::CoverageService, storage::DuesStorage,
    time::Clock, CoreError,
};

/// Everything the member screen shows.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberDetail {
    pub member: Member,
    pub summary: BalanceSummary,
    /// Oldest first; renderers reverse it.
    pub ledger: Vec<PeriodEntry>,
    pub counts: CoverageCounts,
    /// Newest first.
    pub payments: Vec<Payment>,
}

pub struct MemberService;

impl MemberService {
    pub fn add(
        store: &dyn DuesStorage,
        clock: &dyn Clock,
        input: NewMember,
    ) -> Result<Member, CoreError> {
        let input = NewMember {
            name: input.name.trim().to_string(),
            phone: input.phone.trim().to_string(),
            email: normalize_email(input.email),
            ..input
        };
        Self::validate_contact(&input.name, &input.phone)?;
        Self::validate_amount("subscription amount", input.subscription_amount)?;
        Self::validate_amount("opening balance", input.opening_balance)?;

        let member = input.into_member(clock.now());
        store.insert_member(member.clone())?;
        info!(member = %member.id, name = %member.name, "member added");
        Ok(member)
    }

    pub fn update(
        store: &dyn DuesStorage,
        id: Uuid,
        update: MemberUpdate,
    ) -> Result<Member, CoreError> {
        let mut update = update;
        if let Some(name) = update.name.as_mut() {
            *name = name.trim().to_string();
        }
        if let Some(phone) = update.phone.as_mut() {
            *phone = phone.trim().to_string();
        }
        if let Some(email) = update.email.take() {
            update.email = Some(normalize_email(email));
        }

        let current = Self::get(store, id)?;
        let mut candidate = current.clone();
        candidate.apply(&update);
        Self::validate_contact(&candidate.name, &candidate.phone)?;
        if let Some(amount) = update.subscription_amount {
            Self::validate_amount("subscription amount", amount)?;
        }
        if update.is_empty() {
            return Ok(current);
        }

        store.update_member(id, &update)?;
        info!(member = %id, "member updated");
        Ok(candidate)
    }

    /// Deletes the member and its payments, returning how many payments went with it.
    pub fn remove(store: &dyn DuesStorage, id: Uuid) -> Result<usize, CoreError> {
        let payments = store.list_payments(Some(id))?.len();
        store.delete_member(id)?;
        info!(member = %id, payments, "member deleted");
        Ok(payments)
    }

    pub fn get(store: &dyn DuesStorage, id: Uuid) -> Result<Member, CoreError> {
        store
            .get_member(id)?
            .ok_or_else(|| CoreError::member_not_found(id))
    }

    /// All members sorted by name.
    pub fn list(store: &dyn DuesStorage) -> Result<Vec<Member>, CoreError> {
        let mut members = store.list_members()?;
        members.sort_by_key(|member| member.name.to_lowercase());
        Ok(members)
    }

    pub fn search(store: &dyn DuesStorage, needle: &str) -> Result<Vec<Member>, CoreError> {
        Ok(Self::list(store)?
            .into_iter()
            .filter(|member| member.matches(needle))
            .collect())
    }

    /// Finds a member by full id, id prefix, exact name or unique search match.
    pub fn resolve(store: &dyn DuesStorage, token: &str) -> Result<Member, CoreError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(CoreError::Validation("member reference is empty".into()));
        }
        if let Ok(id) = Uuid::parse_str(token) {
            return Self::get(store, id);
        }

        let members = Self::list(store)?;
        let lowered = token.to_lowercase();
        if let Some(member) = members
            .iter()
            .find(|member| member.name.to_lowercase() == lowered)
        {
            return Ok(member.clone());
        }
        if token.len() >= 4 {
            let by_prefix: Vec<_> = members
                .iter()
                .filter(|member| member.id.to_string().starts_with(&lowered))
                .collect();
            if let [member] = by_prefix.as_slice() {
                return Ok((*member).clone());
            }
        }

        let mut matches: Vec<_> = members
            .into_iter()
            .filter(|member| member.matches(token))
            .collect();
        if matches.len() > 1 {
            return Err(CoreError::InvalidOperation(format!(
                "`{}` matches {} members; use the member id",
                token,
                matches.len()
            )));
        }
        matches
            .pop()
            .ok_or_else(|| CoreError::MemberNotFound(token.to_string()))
    }

    pub fn balance(
        store: &dyn DuesStorage,
        id: Uuid,
        today: NaiveDate,
    ) -> Result<BalanceSummary, CoreError> {
        let member = Self::get(store, id)?;
        let payments = store.list_payments(Some(id))?;
        Ok(BalanceService::compute(&member, &payments, today))
    }

    pub fn detail(
        store: &dyn DuesStorage,
        id: Uuid,
        today: NaiveDate,
    ) -> Result<MemberDetail, CoreError> {
        let member = Self::get(store, id)?;
        let mut payments = store.list_payments(Some(id))?;
        let summary = BalanceService::compute(&member, &payments, today);
        let ledger = CoverageService::build_ledger(&member, &payments, today);
        let counts = CoverageCounts::tally(&ledger);
        payments.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(MemberDetail {
            member,
            summary,
            ledger,
            counts,
            payments,
        })
    }

    fn validate_contact(name: &str, phone: &str) -> Result<(), CoreError> {
        if name.trim().is_empty() {
            return Err(CoreError::Validation("member name is required".into()));
        }
        if phone.trim().is_empty() {
            return Err(CoreError::Validation("phone number is required".into()));
        }
        Ok(())
    }

    fn validate_amount(field: &str, amount: f64) -> Result<(), CoreError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(CoreError::Validation(format!(
                "{} must be a non-negative number, got {}",
                field, amount
            )));
        }
        Ok(())
    }
}

fn normalize_email(email: Option<String>) -> Option<String> {
    email
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FixedClock, MemoryDuesStorage};
    use dues_domain::NewPayment;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn setup() -> (MemoryDuesStorage, FixedClock) {
        (MemoryDuesStorage::new(), FixedClock::on(date(2025, 3, 15)))
    }

    #[test]
    fn add_trims_and_validates_input() {
        let (store, clock) = setup();
        let member = MemberService::add(
            &store,
            &clock,
            NewMember::new("  Meera  ", " 9000 ", 500.0, date(2025, 1, 1)),
        )
        .expect("add member");
        assert_eq!(member.name, "Meera");
        assert_eq!(member.phone, "9000");
        assert_eq!(member.created_at, clock.now());
        assert!(member.active);

        let err = MemberService::add(&store, &clock, NewMember::new(" ", "1", 1.0, date(2025, 1, 1)))
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        let err = MemberService::add(
            &store,
            &clock,
            NewMember::new("Neg", "1", 100.0, date(2025, 1, 1)).with_opening_balance(-5.0),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        let err = MemberService::add(
            &store,
            &clock,
            NewMember::new("Nan", "1", f64::NAN, date(2025, 1, 1)),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(store.member_count().unwrap(), 1);
    }

    #[test]
    fn update_rejects_blank_names_and_negative_fees() {
        let (store, clock) = setup();
        let member = MemberService::add(
            &store,
            &clock,
            NewMember::new("Ravi", "1", 500.0, date(2025, 1, 1)),
        )
        .unwrap();

        let err = MemberService::update(
            &store,
            member.id,
            MemberUpdate {
                name: Some("   ".into()),
                ..MemberUpdate::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        let err = MemberService::update(
            &store,
            member.id,
            MemberUpdate {
                subscription_amount: Some(-1.0),
                ..MemberUpdate::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        let updated = MemberService::update(
            &store,
            member.id,
            MemberUpdate {
                subscription_amount: Some(650.0),
                email: Some(Some(" ravi@example.org ".into())),
                ..MemberUpdate::default()
            },
        )
        .unwrap();
        assert_eq!(updated.subscription_amount, 650.0);
        assert_eq!(updated.email.as_deref(), Some("ravi@example.org"));
        assert_eq!(MemberService::get(&store, member.id).unwrap(), updated);
    }

    #[test]
    fn resolve_accepts_ids_names_and_unique_matches() {
        let (store, clock) = setup();
        let asha = MemberService::add(
            &store,
            &clock,
            NewMember::new("Asha Rao", "98450", 500.0, date(2025, 1, 1)),
        )
        .unwrap();
        MemberService::add(
            &store,
            &clock,
            NewMember::new("Asha Menon", "77000", 500.0, date(2025, 1, 1)),
        )
        .unwrap();

        assert_eq!(MemberService::resolve(&store, &asha.id.to_string()).unwrap().id, asha.id);
        assert_eq!(MemberService::resolve(&store, "asha rao").unwrap().id, asha.id);
        assert_eq!(MemberService::resolve(&store, "98450").unwrap().id, asha.id);
        assert!(matches!(
            MemberService::resolve(&store, "asha"),
            Err(CoreError::InvalidOperation(_))
        ));
        assert!(matches!(
            MemberService::resolve(&store, "nobody"),
            Err(CoreError::MemberNotFound(_))
        ));
    }

    #[test]
    fn missing_member_is_an_error_not_a_zero_balance() {
        let (store, _) = setup();
        let err = MemberService::balance(&store, Uuid::new_v4(), date(2025, 3, 1)).unwrap_err();
        assert!(matches!(err, CoreError::MemberNotFound(_)));
    }

    #[test]
    fn detail_combines_summary_ledger_and_history() {
        let (store, clock) = setup();
        let member = MemberService::add(
            &store,
            &clock,
            NewMember::new("Detail", "1", 500.0, date(2025, 2, 1)),
        )
        .unwrap();
        let mut older = NewPayment::pooled(member.id, 300.0, clock.now()).into_payment();
        older.date -= chrono::Duration::days(10);
        store.insert_payment(older.clone()).unwrap();
        let newer = NewPayment::pooled(member.id, 200.0, clock.now()).into_payment();
        store.insert_payment(newer.clone()).unwrap();

        let detail = MemberService::detail(&store, member.id, clock.today()).unwrap();
        assert_eq!(detail.summary.balance, 500.0);
        assert_eq!(detail.payments[0].id, newer.id);
        assert_eq!(detail.ledger.len(), 3);
        assert_eq!(
            detail.counts,
            CoverageCounts {
                paid: 1,
                partial: 0,
                unpaid: 2
            }
        );
    }

    #[test]
    fn remove_reports_cascaded_payments() {
        let (store, clock) = setup();
        let member = MemberService::add(
            &store,
            &clock,
            NewMember::new("Gone", "1", 500.0, date(2025, 2, 1)),
        )
        .unwrap();
        store
            .insert_payment(NewPayment::pooled(member.id, 50.0, clock.now()).into_payment())
            .unwrap();
        assert_eq!(MemberService::remove(&store, member.id).unwrap(), 1);
        assert!(store.list_payments(None).unwrap().is_empty());
    }
}
