//! In-process storage used by tests and as the working set of file-backed stores.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use uuid::Uuid;

use dues_domain::{DuesSnapshot, Member, MemberUpdate, Payment};

use crate::{
    storage::{validate_snapshot, DuesStorage},
    CoreError,
};

#[derive(Debug, Default, Clone)]
struct Tables {
    members: Vec<Member>,
    payments: Vec<Payment>,
}

/// Keeps members and payments in insertion order behind a lock.
#[derive(Debug, Default)]
pub struct MemoryDuesStorage {
    tables: RwLock<Tables>,
}

impl MemoryDuesStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: DuesSnapshot) -> Self {
        Self {
            tables: RwLock::new(Tables {
                members: snapshot.members,
                payments: snapshot.payments,
            }),
        }
    }

    pub fn member_count(&self) -> Result<usize, CoreError> {
        Ok(self.read()?.members.len())
    }

    pub fn payment_count(&self) -> Result<usize, CoreError> {
        Ok(self.read()?.payments.len())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, CoreError> {
        self.tables
            .read()
            .map_err(|_| CoreError::Storage("member store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, CoreError> {
        self.tables
            .write()
            .map_err(|_| CoreError::Storage("member store lock poisoned".into()))
    }
}

impl DuesStorage for MemoryDuesStorage {
    fn list_members(&self) -> Result<Vec<Member>, CoreError> {
        Ok(self.read()?.members.clone())
    }

    fn get_member(&self, id: Uuid) -> Result<Option<Member>, CoreError> {
        Ok(self.read()?.members.iter().find(|m| m.id == id).cloned())
    }

    fn list_payments(&self, member_id: Option<Uuid>) -> Result<Vec<Payment>, CoreError> {
        let tables = self.read()?;
        Ok(tables
            .payments
            .iter()
            .filter(|payment| member_id.map_or(true, |id| payment.member_id == id))
            .cloned()
            .collect())
    }

    fn insert_member(&self, member: Member) -> Result<Uuid, CoreError> {
        let mut tables = self.write()?;
        if tables.members.iter().any(|existing| existing.id == member.id) {
            return Err(CoreError::InvalidOperation(format!(
                "member {} already exists",
                member.id
            )));
        }
        let id = member.id;
        tables.members.push(member);
        Ok(id)
    }

    fn update_member(&self, id: Uuid, update: &MemberUpdate) -> Result<(), CoreError> {
        let mut tables = self.write()?;
        let member = tables
            .members
            .iter_mut()
            .find(|member| member.id == id)
            .ok_or_else(|| CoreError::member_not_found(id))?;
        member.apply(update);
        Ok(())
    }

    fn insert_payment(&self, payment: Payment) -> Result<Uuid, CoreError> {
        let mut tables = self.write()?;
        if !tables.members.iter().any(|member| member.id == payment.member_id) {
            return Err(CoreError::member_not_found(payment.member_id));
        }
        let id = payment.id;
        tables.payments.push(payment);
        Ok(id)
    }

    fn delete_payment(&self, id: Uuid) -> Result<(), CoreError> {
        let mut tables = self.write()?;
        let before = tables.payments.len();
        tables.payments.retain(|payment| payment.id != id);
        if tables.payments.len() == before {
            return Err(CoreError::PaymentNotFound(id));
        }
        Ok(())
    }

    fn remove_member_record(&self, id: Uuid) -> Result<(), CoreError> {
        let mut tables = self.write()?;
        let before = tables.members.len();
        tables.members.retain(|member| member.id != id);
        if tables.members.len() == before {
            return Err(CoreError::member_not_found(id));
        }
        Ok(())
    }

    fn import_snapshot(&self, snapshot: &DuesSnapshot) -> Result<(), CoreError> {
        validate_snapshot(snapshot)?;
        let mut tables = self.write()?;
        tables.members = snapshot.members.clone();
        tables.payments = snapshot.payments.clone();
        Ok(())
    }
}
