/// Account records, provisioning and owner listings.
pub mod account;

/// HTTP surface over the core services.
pub mod api;

/// Passwords, signed tokens, sessions and MFA.
pub mod auth;

/// Runtime configuration loaded from TOML.
pub mod config;

/// Crate-wide error taxonomy.
pub mod error;

/// The ledger engine: atomic balance mutation + audit records.
pub mod ledger;

/// Storage traits, row locking, and the in-memory store.
pub mod storage;
