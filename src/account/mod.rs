//! Account records and provisioning.

pub mod service;
pub mod types;

pub use service::{AccountService, AccountSummary};
pub use types::{Account, AccountNumber, Identity, IdentityId, Transaction, TransactionId};
