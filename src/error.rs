use thiserror::Error;

#[derive(Error, Debug)]
pub enum BankError {
    #[error("Authentication required")]
    Unauthenticated,
    #[error("Unauthorized access to account {0}")]
    Unauthorized(String),
    #[error("Identity not found: {0}")]
    IdentityNotFound(String),
    #[error("Account not found: {0}")]
    AccountNotFound(String),
    #[error("Amount must be positive")]
    InvalidAmount,
    #[error("Insufficient funds in account {0}")]
    InsufficientFunds(String),
    #[error("Email is already registered")]
    DuplicateEmail,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Refresh token does not match the stored one")]
    InvalidRefreshToken,
    #[error("Token missing")]
    TokenMissing,
    #[error("Token expired")]
    TokenExpired,
    #[error("Token invalid")]
    TokenInvalid,
    #[error("Could not allocate a unique account number after {0} attempts")]
    AccountNumberSpaceExhausted(u32),
    #[error("Operation aborted, no changes were applied: {0}")]
    Aborted(String),
    #[error("Timed out waiting for lock on account {0}")]
    LockTimeout(String),
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BankError {
    /// True for every failure that means the presented access token cannot be
    /// trusted. Authenticated entry points fold these into
    /// [`BankError::Unauthenticated`].
    pub fn is_token_failure(&self) -> bool {
        matches!(
            self,
            BankError::TokenMissing | BankError::TokenExpired | BankError::TokenInvalid
        )
    }
}

pub type Result<T> = std::result::Result<T, BankError>;
