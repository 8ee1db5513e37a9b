//! In-memory store for a single-node deployment. All maps live behind one
//! mutex so a commit is atomic by construction.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;

use crate::account::types::{
    Account, AccountNumber, Identity, IdentityId, Transaction, TransactionStatus,
};
use crate::error::{BankError, Result};

use super::{BankStore, LockTable, RowGuard, TransactionDraft};

#[derive(Default)]
struct Inner {
    identities: HashMap<IdentityId, Identity>,
    /// email -> identity id, kept in lockstep with `identities`.
    emails: HashMap<String, IdentityId>,
    accounts: HashMap<AccountNumber, Account>,
    transactions: Vec<Transaction>,
    next_transaction_id: u64,
}

pub struct MemoryStore {
    inner: Mutex<Inner>,
    locks: Arc<LockTable>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_transaction_id: 1,
                ..Inner::default()
            }),
            locks: LockTable::new(),
        }
    }

    fn lock_inner(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| BankError::StorageUnavailable("store mutex poisoned".into()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BankStore for MemoryStore {
    fn insert_identity(&self, identity: Identity) -> Result<()> {
        let mut inner = self.lock_inner()?;
        if inner.emails.contains_key(&identity.email) {
            return Err(BankError::DuplicateEmail);
        }
        inner
            .emails
            .insert(identity.email.clone(), identity.id.clone());
        inner.identities.insert(identity.id.clone(), identity);
        Ok(())
    }

    fn save_identity(&self, identity: &Identity) -> Result<()> {
        let mut inner = self.lock_inner()?;
        if !inner.identities.contains_key(&identity.id) {
            return Err(BankError::IdentityNotFound(identity.id.clone()));
        }
        inner
            .identities
            .insert(identity.id.clone(), identity.clone());
        Ok(())
    }

    fn find_identity(&self, id: &str) -> Result<Option<Identity>> {
        Ok(self.lock_inner()?.identities.get(id).cloned())
    }

    fn find_identity_by_email(&self, email: &str) -> Result<Option<Identity>> {
        let inner = self.lock_inner()?;
        Ok(inner
            .emails
            .get(email)
            .and_then(|id| inner.identities.get(id))
            .cloned())
    }

    fn insert_account(&self, account: Account) -> Result<bool> {
        let mut inner = self.lock_inner()?;
        if inner.accounts.contains_key(&account.number) {
            return Ok(false);
        }
        inner.accounts.insert(account.number.clone(), account);
        Ok(true)
    }

    fn find_account(&self, number: &str) -> Result<Option<Account>> {
        Ok(self.lock_inner()?.accounts.get(number).cloned())
    }

    fn find_account_for_update(
        &self,
        number: &str,
        wait: Duration,
    ) -> Result<(Account, RowGuard)> {
        let guard = self.locks.acquire(number, wait)?;
        let account = self
            .lock_inner()?
            .accounts
            .get(number)
            .cloned()
            .ok_or_else(|| BankError::AccountNotFound(number.to_string()))?;
        Ok((account, guard))
    }

    fn accounts_for_owner(&self, owner: &IdentityId) -> Result<Vec<Account>> {
        let inner = self.lock_inner()?;
        let mut accounts: Vec<Account> = inner
            .accounts
            .values()
            .filter(|a| &a.owner == owner)
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(accounts)
    }

    fn commit(&self, accounts: &[Account], draft: TransactionDraft) -> Result<Transaction> {
        let mut inner = self.lock_inner()?;
        // Validate the whole write set before touching anything.
        for account in accounts {
            if !inner.accounts.contains_key(&account.number) {
                return Err(BankError::Aborted(format!(
                    "account {} vanished before commit",
                    account.number
                )));
            }
        }
        let tx = Transaction {
            id: inner.next_transaction_id,
            from_account: draft.from_account,
            to_account: draft.to_account,
            kind: draft.kind,
            amount: draft.amount,
            memo: draft.memo,
            status: TransactionStatus::Completed,
            balance_after: draft.balance_after,
            created_at: Utc::now(),
        };
        inner.next_transaction_id += 1;
        for account in accounts {
            inner
                .accounts
                .insert(account.number.clone(), account.clone());
        }
        inner.transactions.push(tx.clone());
        Ok(tx)
    }

    fn transactions_for_accounts(&self, numbers: &[AccountNumber]) -> Result<Vec<Transaction>> {
        let inner = self.lock_inner()?;
        Ok(inner
            .transactions
            .iter()
            .filter(|tx| numbers.iter().any(|n| tx.touches(n)))
            .cloned()
            .collect())
    }
}
