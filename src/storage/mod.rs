//! Storage interface required by the core, plus the pessimistic row-lock
//! primitive the ledger engine builds on.
//!
//! The traits here are the seam for a real database backend; the bundled
//! [`memory::MemoryStore`] is the single-node implementation.

use std::collections::HashSet;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use rust_decimal::Decimal;

use crate::account::types::{
    Account, AccountNumber, Identity, IdentityId, Transaction, TransactionType,
};
use crate::error::{BankError, Result};

pub mod memory;

/// Everything the store needs to mint a [`Transaction`]; id, status and
/// timestamp are assigned at commit.
#[derive(Clone, Debug)]
pub struct TransactionDraft {
    pub from_account: Option<AccountNumber>,
    pub to_account: Option<AccountNumber>,
    pub kind: TransactionType,
    pub amount: Decimal,
    pub memo: Option<String>,
    pub balance_after: Decimal,
}

/// Named exclusive locks over account rows.
///
/// Acquisition waits a bounded time for the holder to release and fails with
/// [`BankError::LockTimeout`] past the bound. Guards release on drop.
/// Callers locking more than one row must acquire in ascending account-number
/// order; the table itself does not detect cycles.
#[derive(Debug)]
pub struct LockTable {
    held: Mutex<HashSet<AccountNumber>>,
    released: Condvar,
}

impl LockTable {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            held: Mutex::new(HashSet::new()),
            released: Condvar::new(),
        })
    }

    pub fn acquire(self: &Arc<Self>, number: &str, wait: Duration) -> Result<RowGuard> {
        let deadline = Instant::now() + wait;
        let mut held = self
            .held
            .lock()
            .map_err(|_| BankError::StorageUnavailable("lock table poisoned".into()))?;
        while held.contains(number) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(BankError::LockTimeout(number.to_string()));
            }
            let (guard, timeout) = self
                .released
                .wait_timeout(held, remaining)
                .map_err(|_| BankError::StorageUnavailable("lock table poisoned".into()))?;
            held = guard;
            if timeout.timed_out() && held.contains(number) {
                return Err(BankError::LockTimeout(number.to_string()));
            }
        }
        held.insert(number.to_string());
        Ok(RowGuard {
            table: Arc::clone(self),
            number: number.to_string(),
        })
    }
}

/// Exclusive hold on one account row. Dropping it releases the row and wakes
/// waiters.
#[derive(Debug)]
pub struct RowGuard {
    table: Arc<LockTable>,
    number: AccountNumber,
}

impl Drop for RowGuard {
    fn drop(&mut self) {
        if let Ok(mut held) = self.table.held.lock() {
            held.remove(&self.number);
        }
        self.table.released.notify_all();
    }
}

/// Persistence interface for identities, accounts and the append-only
/// transaction log.
pub trait BankStore: Send + Sync {
    fn insert_identity(&self, identity: Identity) -> Result<()>;
    /// Upserts an existing identity record (MFA enrollment).
    fn save_identity(&self, identity: &Identity) -> Result<()>;
    fn find_identity(&self, id: &str) -> Result<Option<Identity>>;
    fn find_identity_by_email(&self, email: &str) -> Result<Option<Identity>>;

    /// Inserts a new account. Returns false without writing anything when the
    /// account number is already taken, so number uniqueness is decided inside
    /// the store's critical section rather than by a prior existence check.
    fn insert_account(&self, account: Account) -> Result<bool>;
    fn find_account(&self, number: &str) -> Result<Option<Account>>;
    /// Point-read under an exclusive row lock. The returned snapshot is
    /// stable until the guard drops.
    fn find_account_for_update(
        &self,
        number: &str,
        wait: Duration,
    ) -> Result<(Account, RowGuard)>;
    fn accounts_for_owner(&self, owner: &IdentityId) -> Result<Vec<Account>>;

    /// All-or-nothing commit of the changed account states plus one new
    /// transaction record. Either every write applies or none do.
    fn commit(&self, accounts: &[Account], draft: TransactionDraft) -> Result<Transaction>;
    /// Transactions referencing any of the given accounts as source or
    /// destination, in the store's append order.
    fn transactions_for_accounts(&self, numbers: &[AccountNumber]) -> Result<Vec<Transaction>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn lock_is_exclusive_until_dropped() {
        let table = LockTable::new();
        let guard = table.acquire("111", Duration::from_millis(50)).unwrap();

        let err = table
            .acquire("111", Duration::from_millis(50))
            .expect_err("second acquire must time out");
        assert!(matches!(err, BankError::LockTimeout(n) if n == "111"));

        // Different row is unaffected.
        let other = table.acquire("222", Duration::from_millis(50)).unwrap();
        drop(other);

        drop(guard);
        table.acquire("111", Duration::from_millis(50)).unwrap();
    }

    #[test]
    fn waiter_wakes_on_release() {
        let table = LockTable::new();
        let guard = table.acquire("333", Duration::from_millis(50)).unwrap();

        let t2 = Arc::clone(&table);
        let waiter = thread::spawn(move || t2.acquire("333", Duration::from_secs(2)).is_ok());

        thread::sleep(Duration::from_millis(20));
        drop(guard);
        assert!(waiter.join().unwrap());
    }
}
