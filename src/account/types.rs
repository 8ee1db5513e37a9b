//! Core record types: identities, accounts and the immutable transaction log entry.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Opaque identity key (UUID v4 string). Never reused.
pub type IdentityId = String;

/// Fixed-width numeric account number acting as primary key.
pub type AccountNumber = String;

pub type TransactionId = u64;

/// A registered principal able to own accounts and authenticate.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Identity {
    pub id: IdentityId,
    pub name: String,
    pub email: String,
    /// Argon2id PHC string. Never logged.
    pub password_hash: String,
    /// Base32 TOTP secret, set once on enrollment.
    pub mfa_secret: Option<String>,
}

/// A monetary balance record owned by exactly one identity.
///
/// Mutated only by the ledger engine; `balance >= 0` after every committed
/// operation.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Account {
    pub number: AccountNumber,
    pub owner: IdentityId,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Transfer,
    Withdrawal,
    Deposit,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

/// Immutable audit record, created exactly once per completed ledger
/// operation. Exactly one of the reference shapes holds depending on type:
/// transfers carry both accounts, withdrawals the source only, deposits the
/// destination only.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Transaction {
    pub id: TransactionId,
    pub from_account: Option<AccountNumber>,
    pub to_account: Option<AccountNumber>,
    pub kind: TransactionType,
    pub amount: Decimal,
    pub memo: Option<String>,
    pub status: TransactionStatus,
    /// Resulting balance of the primary affected account.
    pub balance_after: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Whether this record references the given account as source or destination.
    pub fn touches(&self, number: &str) -> bool {
        self.from_account.as_deref() == Some(number)
            || self.to_account.as_deref() == Some(number)
    }
}
