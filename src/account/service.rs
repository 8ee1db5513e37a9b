//! Account provisioning and owner listings.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use crate::account::types::{Account, AccountNumber, IdentityId};
use crate::error::{BankError, Result};
use crate::storage::BankStore;

const ACCOUNT_NUMBER_DIGITS: u32 = 14;

/// Account shape exposed outside the core: number, balance, creation time.
#[derive(Debug, Clone, Serialize)]
pub struct AccountSummary {
    pub account_number: AccountNumber,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
}

pub struct AccountService {
    store: Arc<dyn BankStore>,
    number_attempts: u32,
}

impl AccountService {
    pub fn new(store: Arc<dyn BankStore>, number_attempts: u32) -> Self {
        Self {
            store,
            number_attempts,
        }
    }

    /// Open a new account for the owner with the given non-negative opening
    /// balance. The account number is drawn at random and re-drawn on
    /// collision; the store decides uniqueness at insert time so two
    /// concurrent creations can never share a number.
    pub fn create(&self, owner: &IdentityId, initial_balance: Decimal) -> Result<Account> {
        if initial_balance < Decimal::ZERO {
            return Err(BankError::InvalidAmount);
        }
        if self.store.find_identity(owner)?.is_none() {
            return Err(BankError::IdentityNotFound(owner.clone()));
        }

        for _ in 0..self.number_attempts {
            let account = Account {
                number: random_account_number(),
                owner: owner.clone(),
                balance: initial_balance,
                created_at: Utc::now(),
            };
            if self.store.insert_account(account.clone())? {
                info!(
                    "account created - number: {}, owner: {}, opening balance: {}",
                    account.number, owner, account.balance
                );
                return Ok(account);
            }
        }
        warn!(
            "account number generation exhausted after {} attempts",
            self.number_attempts
        );
        Err(BankError::AccountNumberSpaceExhausted(self.number_attempts))
    }

    /// All accounts owned by the identity, reduced for external exposure.
    pub fn list_for_owner(&self, owner: &IdentityId) -> Result<Vec<AccountSummary>> {
        Ok(self
            .store
            .accounts_for_owner(owner)?
            .into_iter()
            .map(|a| AccountSummary {
                account_number: a.number,
                balance: a.balance,
                created_at: a.created_at,
            })
            .collect())
    }
}

/// Random fixed-width numeric account number with a non-zero leading digit.
fn random_account_number() -> AccountNumber {
    let mut rng = rand::thread_rng();
    let low = 10u64.pow(ACCOUNT_NUMBER_DIGITS - 1);
    let high = 10u64.pow(ACCOUNT_NUMBER_DIGITS);
    rng.gen_range(low..high).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::types::Identity;
    use crate::storage::memory::MemoryStore;

    fn store_with_owner() -> (Arc<dyn BankStore>, IdentityId) {
        let store: Arc<dyn BankStore> = Arc::new(MemoryStore::new());
        store
            .insert_identity(Identity {
                id: "u1".to_string(),
                name: "tester".to_string(),
                email: "t@example.com".to_string(),
                password_hash: "x".to_string(),
                mfa_secret: None,
            })
            .unwrap();
        (store, "u1".to_string())
    }

    #[test]
    fn number_is_fixed_width_numeric() {
        let number = random_account_number();
        assert_eq!(number.len(), ACCOUNT_NUMBER_DIGITS as usize);
        assert!(number.chars().all(|c| c.is_ascii_digit()));
        assert_ne!(number.as_bytes()[0], b'0');
    }

    #[test]
    fn create_and_list() {
        let (store, owner) = store_with_owner();
        let service = AccountService::new(store, 1000);

        let a = service.create(&owner, Decimal::ZERO).unwrap();
        let b = service.create(&owner, Decimal::from(500u64)).unwrap();
        assert_ne!(a.number, b.number);

        let summaries = service.list_for_owner(&owner).unwrap();
        assert_eq!(summaries.len(), 2);
        assert!(summaries.iter().any(|s| s.balance == Decimal::from(500u64)));
    }

    #[test]
    fn negative_opening_balance_rejected() {
        let (store, owner) = store_with_owner();
        let service = AccountService::new(store, 1000);
        let err = service.create(&owner, Decimal::from(-1i64)).unwrap_err();
        assert!(matches!(err, BankError::InvalidAmount));
    }

    #[test]
    fn unknown_owner_rejected() {
        let (store, _) = store_with_owner();
        let service = AccountService::new(store, 1000);
        let err = service
            .create(&"ghost".to_string(), Decimal::ZERO)
            .unwrap_err();
        assert!(matches!(err, BankError::IdentityNotFound(_)));
    }
}
