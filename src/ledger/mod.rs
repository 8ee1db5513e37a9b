//! The ledger engine: atomic balance mutation plus audit record creation.
//!
//! Every operation resolves the caller from the presented token, loads the
//! involved account rows under exclusive locks, checks ownership and
//! sufficiency, and hands the storage layer a single all-or-nothing commit.
//! Transfers lock both rows in ascending account-number order so crossing
//! transfers between the same pair of accounts can never deadlock.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::account::types::{
    Account, IdentityId, Transaction, TransactionType,
};
use crate::auth::tokens::Authenticator;
use crate::error::{BankError, Result};
use crate::storage::{BankStore, RowGuard, TransactionDraft};

pub mod alert;

pub use alert::{AlertHook, LogAlert};

pub struct LedgerEngine {
    store: Arc<dyn BankStore>,
    gate: Authenticator,
    alert: Arc<dyn AlertHook>,
    large_withdrawal_threshold: Decimal,
    lock_wait: Duration,
}

impl LedgerEngine {
    pub fn new(
        store: Arc<dyn BankStore>,
        gate: Authenticator,
        alert: Arc<dyn AlertHook>,
        large_withdrawal_threshold: Decimal,
        lock_wait: Duration,
    ) -> Self {
        Self {
            store,
            gate,
            alert,
            large_withdrawal_threshold,
            lock_wait,
        }
    }

    /// Move `amount` between two accounts. The caller must own the source;
    /// the destination may belong to anyone.
    pub fn transfer(
        &self,
        token: &str,
        from: &str,
        to: &str,
        amount: Decimal,
        memo: Option<String>,
    ) -> Result<Transaction> {
        if amount <= Decimal::ZERO {
            return Err(BankError::InvalidAmount);
        }
        if from == to {
            return Err(BankError::InvalidAmount);
        }
        let caller = self.gate.resolve(token)?;

        // Canonical lock order: ascending account number, never argument order.
        let (first, second) = if from < to { (from, to) } else { (to, from) };
        let (first_acc, _g1) = self.store.find_account_for_update(first, self.lock_wait)?;
        let (second_acc, _g2) = self.store.find_account_for_update(second, self.lock_wait)?;
        let (mut from_acc, mut to_acc) = if first_acc.number == from {
            (first_acc, second_acc)
        } else {
            (second_acc, first_acc)
        };

        if from_acc.owner != caller {
            warn!(
                "transfer denied - identity {} does not own account {}",
                caller, from_acc.number
            );
            return Err(BankError::Unauthorized(from_acc.number));
        }
        if from_acc.balance < amount {
            warn!(
                "transfer rejected - account {} has {}, requested {}",
                from_acc.number, from_acc.balance, amount
            );
            return Err(BankError::InsufficientFunds(from_acc.number));
        }

        from_acc.balance -= amount;
        to_acc.balance += amount;
        let draft = TransactionDraft {
            from_account: Some(from_acc.number.clone()),
            to_account: Some(to_acc.number.clone()),
            kind: TransactionType::Transfer,
            amount,
            memo,
            balance_after: from_acc.balance,
        };
        let tx = self
            .store
            .commit(&[from_acc.clone(), to_acc], draft)?;

        info!(
            "transfer completed - tx: {}, from: {}, to: {}, amount: {}",
            tx.id, from, to, amount
        );
        Ok(tx)
    }

    /// Debit a single caller-owned account. Withdrawals from accounts holding
    /// at least the configured threshold (measured before the debit) raise
    /// the suspicious-withdrawal alert after the commit.
    pub fn withdraw(
        &self,
        token: &str,
        from: &str,
        amount: Decimal,
        memo: Option<String>,
    ) -> Result<Transaction> {
        if amount <= Decimal::ZERO {
            return Err(BankError::InvalidAmount);
        }
        let caller = self.gate.resolve(token)?;

        let (mut from_acc, guard): (Account, RowGuard) =
            self.store.find_account_for_update(from, self.lock_wait)?;
        if from_acc.owner != caller {
            warn!(
                "withdrawal denied - identity {} does not own account {}",
                caller, from_acc.number
            );
            return Err(BankError::Unauthorized(from_acc.number));
        }
        if from_acc.balance < amount {
            warn!(
                "withdrawal rejected - account {} has {}, requested {}",
                from_acc.number, from_acc.balance, amount
            );
            return Err(BankError::InsufficientFunds(from_acc.number));
        }

        let balance_before = from_acc.balance;
        from_acc.balance -= amount;
        let draft = TransactionDraft {
            from_account: Some(from_acc.number.clone()),
            to_account: None,
            kind: TransactionType::Withdrawal,
            amount,
            memo,
            balance_after: from_acc.balance,
        };
        let tx = self.store.commit(&[from_acc.clone()], draft)?;
        drop(guard);

        if balance_before >= self.large_withdrawal_threshold {
            self.dispatch_alert(caller, from_acc.number.clone(), amount);
        }

        info!(
            "withdrawal completed - tx: {}, account: {}, amount: {}",
            tx.id, from, amount
        );
        Ok(tx)
    }

    /// Credit a single caller-owned account. No sufficiency check.
    pub fn deposit(
        &self,
        token: &str,
        to: &str,
        amount: Decimal,
        memo: Option<String>,
    ) -> Result<Transaction> {
        if amount <= Decimal::ZERO {
            return Err(BankError::InvalidAmount);
        }
        let caller = self.gate.resolve(token)?;

        let (mut to_acc, _guard) = self.store.find_account_for_update(to, self.lock_wait)?;
        if to_acc.owner != caller {
            warn!(
                "deposit denied - identity {} does not own account {}",
                caller, to_acc.number
            );
            return Err(BankError::Unauthorized(to_acc.number));
        }

        to_acc.balance += amount;
        let draft = TransactionDraft {
            from_account: None,
            to_account: Some(to_acc.number.clone()),
            kind: TransactionType::Deposit,
            amount,
            memo,
            balance_after: to_acc.balance,
        };
        let tx = self.store.commit(&[to_acc], draft)?;

        info!(
            "deposit completed - tx: {}, account: {}, amount: {}",
            tx.id, to, amount
        );
        Ok(tx)
    }

    /// All transactions referencing any account the caller owns, as source
    /// or destination, in the store's append order.
    pub fn history(&self, token: &str) -> Result<Vec<Transaction>> {
        let caller = self.gate.resolve(token)?;
        let numbers: Vec<_> = self
            .store
            .accounts_for_owner(&caller)?
            .into_iter()
            .map(|a| a.number)
            .collect();
        self.store.transactions_for_accounts(&numbers)
    }

    /// Fire-and-forget alert delivery on a detached thread. The caller's row
    /// lock is already released; a slow hook never delays the withdrawal or
    /// holds up the account. Failures are logged and swallowed.
    fn dispatch_alert(&self, caller: IdentityId, account_number: String, amount: Decimal) {
        let store = Arc::clone(&self.store);
        let alert = Arc::clone(&self.alert);
        let spawned = std::thread::Builder::new()
            .name("withdrawal-alert".to_string())
            .spawn(move || match store.find_identity(&caller) {
                Ok(Some(identity)) => {
                    alert.suspicious_withdrawal(&identity.email, &account_number, amount);
                }
                Ok(None) => warn!(
                    "suspicious withdrawal on {} but identity {} is gone",
                    account_number, caller
                ),
                Err(e) => warn!("could not resolve identity for withdrawal alert: {}", e),
            });
        if let Err(e) = spawned {
            warn!("could not dispatch withdrawal alert: {}", e);
        }
    }
}
