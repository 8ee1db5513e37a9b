//! Credential and session lifecycle: password hashing, signed tokens,
//! TOTP multi-factor authentication, and the join/login/refresh/logout flows.

pub mod mfa;
pub mod password;
pub mod service;
pub mod tokens;

pub use mfa::{MfaEnrollment, MfaService};
pub use service::{AuthService, JoinOutcome, LoginOutcome};
pub use tokens::{Authenticator, SessionStore, TokenSigner};
