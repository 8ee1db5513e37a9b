//! Identity and session lifecycle: join, login, refresh, logout, MFA.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use crate::account::service::AccountService;
use crate::account::types::{Identity, IdentityId};
use crate::error::{BankError, Result};
use crate::storage::BankStore;

use super::mfa::{MfaEnrollment, MfaService};
use super::password::{hash_password, verify_password};
use super::tokens::{Authenticator, SessionStore, TokenSigner};

#[derive(Debug)]
pub struct JoinOutcome {
    pub name: String,
    pub email: String,
}

#[derive(Debug)]
pub struct LoginOutcome {
    pub access_token: String,
    pub refresh_token: String,
    pub mfa_registered: bool,
}

pub struct AuthService {
    store: Arc<dyn BankStore>,
    signer: Arc<TokenSigner>,
    sessions: Arc<SessionStore>,
    accounts: Arc<AccountService>,
    mfa: MfaService,
    gate: Authenticator,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn BankStore>,
        signer: Arc<TokenSigner>,
        sessions: Arc<SessionStore>,
        accounts: Arc<AccountService>,
        mfa: MfaService,
    ) -> Self {
        let gate = Authenticator::new(Arc::clone(&signer), Arc::clone(&sessions));
        Self {
            store,
            signer,
            sessions,
            accounts,
            mfa,
            gate,
        }
    }

    /// Register a new identity and auto-provision its first, zero-balance
    /// account.
    pub fn join(&self, name: &str, email: &str, password: &str) -> Result<JoinOutcome> {
        if self.store.find_identity_by_email(email)?.is_some() {
            warn!("join rejected, email already registered: {}", email);
            return Err(BankError::DuplicateEmail);
        }

        let id: IdentityId = Uuid::new_v4().to_string();
        let identity = Identity {
            id: id.clone(),
            name: name.to_string(),
            email: email.to_string(),
            password_hash: hash_password(password)?,
            mfa_secret: None,
        };
        self.store.insert_identity(identity)?;
        let account = self.accounts.create(&id, Decimal::ZERO)?;

        info!(
            "join completed - identity: {}, first account: {}",
            id, account.number
        );
        Ok(JoinOutcome {
            name: name.to_string(),
            email: email.to_string(),
        })
    }

    /// Authenticate with email + password, issuing a fresh access/refresh
    /// pair. The refresh token becomes the identity's single live one.
    pub fn login(&self, email: &str, password: &str) -> Result<LoginOutcome> {
        let identity = self
            .store
            .find_identity_by_email(email)?
            .ok_or(BankError::InvalidCredentials)?;
        if !verify_password(password, &identity.password_hash) {
            warn!("login failed for identity {}", identity.id);
            return Err(BankError::InvalidCredentials);
        }

        let access_token = self.signer.issue_access_token(&identity.id)?;
        let refresh_token = self.signer.issue_refresh_token(&identity.id)?;
        self.sessions
            .put_refresh_token(&identity.id, &refresh_token, self.signer.refresh_ttl());

        info!("login succeeded - identity: {}", identity.id);
        Ok(LoginOutcome {
            access_token,
            refresh_token,
            mfa_registered: identity.mfa_secret.is_some(),
        })
    }

    /// Mint a new access token from a valid refresh token. The refresh token
    /// itself is not rotated; a mismatch with the stored one (logout, newer
    /// login, restart) is rejected.
    pub fn refresh(&self, refresh_token: &str) -> Result<LoginOutcome> {
        let subject = self
            .signer
            .validate(refresh_token)
            .map_err(|_| BankError::InvalidRefreshToken)?;
        match self.sessions.refresh_token(&subject) {
            Some(stored) if stored == refresh_token => {}
            _ => return Err(BankError::InvalidRefreshToken),
        }
        let identity = self
            .store
            .find_identity(&subject)?
            .ok_or_else(|| BankError::IdentityNotFound(subject.clone()))?;

        let access_token = self.signer.issue_access_token(&subject)?;
        info!("access token refreshed - identity: {}", subject);
        Ok(LoginOutcome {
            access_token,
            refresh_token: refresh_token.to_string(),
            mfa_registered: identity.mfa_secret.is_some(),
        })
    }

    /// Blacklist the access token until its natural expiry and drop the
    /// identity's stored refresh token.
    pub fn logout(&self, access_token: &str) -> Result<()> {
        if access_token.trim().is_empty() {
            return Err(BankError::TokenMissing);
        }
        let claims = self.signer.validate_claims(access_token)?;

        let now = chrono::Utc::now().timestamp() as u64;
        let remaining = Duration::from_secs(claims.exp.saturating_sub(now));
        self.sessions.blacklist(access_token, remaining);
        self.sessions.drop_refresh_token(&claims.sub);

        info!("logout completed - identity: {}", claims.sub);
        Ok(())
    }

    /// Generate and store an MFA secret for the token's identity, returning
    /// the provisioning URL. Blacklisted tokens are refused like any other
    /// authenticated request.
    pub fn enroll_mfa(&self, access_token: &str) -> Result<MfaEnrollment> {
        let subject = self.gate.resolve(access_token)?;
        let identity = self
            .store
            .find_identity(&subject)?
            .ok_or_else(|| BankError::IdentityNotFound(subject.clone()))?;
        let enrollment = self.mfa.enroll(self.store.as_ref(), &identity)?;
        info!("MFA enrolled - identity: {}", subject);
        Ok(enrollment)
    }

    /// Check a one-time code for the given email. False when no secret is
    /// enrolled or the code does not match.
    pub fn verify_mfa(&self, email: &str, code: u32) -> Result<bool> {
        self.mfa.verify(self.store.as_ref(), email, code)
    }
}
