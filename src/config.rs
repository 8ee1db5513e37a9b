use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BankConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub ledger: LedgerConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AuthConfig {
    /// HS256 signing secret. Must be at least 32 bytes; override in
    /// production via the config file.
    pub signing_secret: String,
    #[serde(default = "default_access_ttl")]
    pub access_ttl_secs: u64,
    #[serde(default = "default_refresh_ttl")]
    pub refresh_ttl_secs: u64,
    #[serde(default = "default_clock_skew")]
    pub clock_skew_secs: u64,
    /// Issuer label embedded in MFA provisioning URLs.
    #[serde(default = "default_issuer")]
    pub issuer: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LedgerConfig {
    /// Withdrawals from accounts holding at least this much trigger the
    /// suspicious-withdrawal alert.
    pub large_withdrawal_threshold: Decimal,
    /// Bounded wait for a row lock before giving up with LockTimeout.
    #[serde(default = "default_lock_wait")]
    pub lock_wait_ms: u64,
    #[serde(default = "default_number_attempts")]
    pub account_number_attempts: u32,
}

fn default_access_ttl() -> u64 {
    60 * 30 // 30 minutes
}

fn default_refresh_ttl() -> u64 {
    60 * 60 * 24 * 7 // 7 days
}

fn default_clock_skew() -> u64 {
    60
}

fn default_issuer() -> String {
    "RustBank".to_string()
}

fn default_lock_wait() -> u64 {
    2000
}

fn default_number_attempts() -> u32 {
    1000
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_addr: "0.0.0.0".to_string(),
                port: 8080,
                log_level: "info".to_string(),
            },
            auth: AuthConfig {
                signing_secret: "0123456789abcdef0123456789abcdef".to_string(),
                access_ttl_secs: default_access_ttl(),
                refresh_ttl_secs: default_refresh_ttl(),
                clock_skew_secs: default_clock_skew(),
                issuer: default_issuer(),
            },
            ledger: LedgerConfig {
                large_withdrawal_threshold: Decimal::from(1_000_000u64),
                lock_wait_ms: default_lock_wait(),
                account_number_attempts: default_number_attempts(),
            },
        }
    }
}

impl BankConfig {
    pub fn load_or_default(path: &str) -> Self {
        if std::path::Path::new(path).exists() {
            match std::fs::read_to_string(path) {
                Ok(s) => match toml::from_str(&s) {
                    Ok(c) => c,
                    Err(e) => {
                        warn!("Error parsing config {}: {}. Using defaults.", path, e);
                        Self::default()
                    }
                },
                Err(e) => {
                    warn!("Error reading config {}: {}. Using defaults.", path, e);
                    Self::default()
                }
            }
        } else {
            let config = Self::default();
            if let Ok(s) = toml::to_string_pretty(&config) {
                let _ = std::fs::write(path, s);
            }
            config
        }
    }
}
