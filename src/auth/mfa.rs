//! TOTP-based multi-factor authentication.
//!
//! Codes are the authenticator-app standard: 6 digits, 30 second time step,
//! HMAC-SHA1 (RFC 6238), verified with a one-step window either side.

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha1::Sha1;

use crate::account::types::Identity;
use crate::error::{BankError, Result};
use crate::storage::BankStore;

const SECRET_LEN: usize = 20;
const STEP_SECS: u64 = 30;
const DIGITS: u32 = 6;
const VERIFY_WINDOW: i64 = 1;

#[derive(Debug)]
pub struct MfaEnrollment {
    /// Base32 shared secret, shown to the user exactly once.
    pub secret: String,
    /// otpauth:// provisioning URL for authenticator apps.
    pub otp_url: String,
}

pub struct MfaService {
    issuer: String,
}

impl MfaService {
    pub fn new(issuer: &str) -> Self {
        Self {
            issuer: issuer.to_string(),
        }
    }

    /// Generate a fresh shared secret and persist it on the identity record.
    /// Re-enrollment replaces the previous secret.
    pub fn enroll(&self, store: &dyn BankStore, identity: &Identity) -> Result<MfaEnrollment> {
        let mut raw = [0u8; SECRET_LEN];
        rand::rngs::OsRng.fill_bytes(&mut raw);
        let secret = base32::encode(base32::Alphabet::Rfc4648 { padding: false }, &raw);

        let mut updated = identity.clone();
        updated.mfa_secret = Some(secret.clone());
        store.save_identity(&updated)?;

        let otp_url = format!(
            "otpauth://totp/{}?secret={}&issuer={}",
            updated.email, secret, self.issuer
        );
        Ok(MfaEnrollment { secret, otp_url })
    }

    /// Verify a caller-supplied code against the stored secret.
    ///
    /// Fails closed: an identity without an enrolled secret gets `Ok(false)`
    /// rather than an error. An entirely unknown email is a distinct
    /// not-found failure.
    pub fn verify(&self, store: &dyn BankStore, email: &str, code: u32) -> Result<bool> {
        let identity = store
            .find_identity_by_email(email)?
            .ok_or_else(|| BankError::IdentityNotFound(email.to_string()))?;
        let Some(secret) = identity.mfa_secret else {
            return Ok(false);
        };
        let Some(raw) = base32::decode(base32::Alphabet::Rfc4648 { padding: false }, &secret)
        else {
            return Ok(false);
        };

        let now = chrono::Utc::now().timestamp() as u64;
        let step = (now / STEP_SECS) as i64;
        for offset in -VERIFY_WINDOW..=VERIFY_WINDOW {
            let counter = step + offset;
            if counter >= 0 && hotp(&raw, counter as u64) == code {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// RFC 4226 HOTP value for one counter, truncated to [`DIGITS`] digits.
fn hotp(secret: &[u8], counter: u64) -> u32 {
    let mut mac =
        Hmac::<Sha1>::new_from_slice(secret).expect("HMAC accepts keys of any length");
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    let offset = (digest[19] & 0x0f) as usize;
    let binary = ((digest[offset] as u32 & 0x7f) << 24)
        | ((digest[offset + 1] as u32) << 16)
        | ((digest[offset + 2] as u32) << 8)
        | digest[offset + 3] as u32;
    binary % 10u32.pow(DIGITS)
}
