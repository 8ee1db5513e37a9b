//! Signed, time-bounded access and refresh tokens, plus the process-wide
//! session state: the single live refresh token per identity and the
//! access-token blacklist.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::account::types::IdentityId;
use crate::error::{BankError, Result};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: IdentityId,
    pub iat: u64,
    pub exp: u64,
}

/// Stateless HS256 signer/verifier holding the signing key. Constructed once
/// and shared by reference with everything that touches tokens.
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenSigner {
    pub fn new(
        secret: &str,
        access_ttl: Duration,
        refresh_ttl: Duration,
        clock_skew: Duration,
    ) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = clock_skew.as_secs();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    pub fn issue_access_token(&self, identity: &str) -> Result<String> {
        self.issue(identity, self.access_ttl)
    }

    pub fn issue_refresh_token(&self, identity: &str) -> Result<String> {
        self.issue(identity, self.refresh_ttl)
    }

    fn issue(&self, identity: &str, ttl: Duration) -> Result<String> {
        let now = chrono::Utc::now().timestamp() as u64;
        let claims = Claims {
            sub: identity.to_string(),
            iat: now,
            exp: now + ttl.as_secs(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| BankError::Internal(format!("token signing failed: {e}")))
    }

    /// Verify signature and expiry, returning the full claims.
    pub fn validate_claims(&self, token: &str) -> Result<Claims> {
        let token = token.trim_start_matches("Bearer ").trim();
        if token.is_empty() {
            return Err(BankError::TokenMissing);
        }
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => BankError::TokenExpired,
                _ => BankError::TokenInvalid,
            })
    }

    /// Verify signature and expiry, returning the subject identity id.
    pub fn validate(&self, token: &str) -> Result<IdentityId> {
        Ok(self.validate_claims(token)?.sub)
    }
}

struct TtlEntry {
    value: String,
    expires_at: Instant,
}

/// Refresh-token map and access-token blacklist with per-entry expiry.
///
/// One live refresh token per identity: a new login overwrites the previous
/// one, implicitly invalidating it. Blacklist entries outlive the token's
/// natural expiry and are then purged opportunistically.
#[derive(Default)]
pub struct SessionStore {
    refresh: Mutex<HashMap<IdentityId, TtlEntry>>,
    blacklist: Mutex<HashMap<String, Instant>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_refresh_token(&self, identity: &str, token: &str, ttl: Duration) {
        let mut map = match self.refresh.lock() {
            Ok(m) => m,
            Err(p) => p.into_inner(),
        };
        map.retain(|_, e| e.expires_at > Instant::now());
        map.insert(
            identity.to_string(),
            TtlEntry {
                value: token.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
    }

    pub fn refresh_token(&self, identity: &str) -> Option<String> {
        let map = match self.refresh.lock() {
            Ok(m) => m,
            Err(p) => p.into_inner(),
        };
        map.get(identity)
            .filter(|e| e.expires_at > Instant::now())
            .map(|e| e.value.clone())
    }

    pub fn drop_refresh_token(&self, identity: &str) {
        let mut map = match self.refresh.lock() {
            Ok(m) => m,
            Err(p) => p.into_inner(),
        };
        map.remove(identity);
    }

    pub fn blacklist(&self, token: &str, ttl: Duration) {
        let mut set = match self.blacklist.lock() {
            Ok(s) => s,
            Err(p) => p.into_inner(),
        };
        set.retain(|_, expires_at| *expires_at > Instant::now());
        set.insert(token.to_string(), Instant::now() + ttl);
    }

    /// O(1) membership check, consulted before trusting any token's claims.
    pub fn is_blacklisted(&self, token: &str) -> bool {
        let set = match self.blacklist.lock() {
            Ok(s) => s,
            Err(p) => p.into_inner(),
        };
        set.get(token)
            .map(|expires_at| *expires_at > Instant::now())
            .unwrap_or(false)
    }
}

/// The authentication gate every ledger request passes through: blacklist
/// check first, then signature/expiry validation. All token-level failures
/// collapse into [`BankError::Unauthenticated`] so callers learn nothing
/// about why a token was refused.
pub struct Authenticator {
    signer: Arc<TokenSigner>,
    sessions: Arc<SessionStore>,
}

impl Authenticator {
    pub fn new(signer: Arc<TokenSigner>, sessions: Arc<SessionStore>) -> Self {
        Self { signer, sessions }
    }

    pub fn resolve(&self, token: &str) -> Result<IdentityId> {
        if self.sessions.is_blacklisted(token) {
            return Err(BankError::Unauthenticated);
        }
        self.signer.validate(token).map_err(|e| {
            if e.is_token_failure() {
                BankError::Unauthenticated
            } else {
                e
            }
        })
    }
}
