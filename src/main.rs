use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use rustbank::account::AccountService;
use rustbank::api::{self, ApiState};
use rustbank::auth::tokens::Authenticator;
use rustbank::auth::{AuthService, MfaService, SessionStore, TokenSigner};
use rustbank::config::BankConfig;
use rustbank::ledger::{LedgerEngine, LogAlert};
use rustbank::storage::memory::MemoryStore;
use rustbank::storage::BankStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = BankConfig::load_or_default("bank.toml");

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.server.log_level.clone())),
        )
        .init();
    info!("starting rustbank");

    let store: Arc<dyn BankStore> = Arc::new(MemoryStore::new());
    let signer = Arc::new(TokenSigner::new(
        &config.auth.signing_secret,
        Duration::from_secs(config.auth.access_ttl_secs),
        Duration::from_secs(config.auth.refresh_ttl_secs),
        Duration::from_secs(config.auth.clock_skew_secs),
    ));
    let sessions = Arc::new(SessionStore::new());

    let accounts = Arc::new(AccountService::new(
        Arc::clone(&store),
        config.ledger.account_number_attempts,
    ));
    let auth = Arc::new(AuthService::new(
        Arc::clone(&store),
        Arc::clone(&signer),
        Arc::clone(&sessions),
        Arc::clone(&accounts),
        MfaService::new(&config.auth.issuer),
    ));
    let ledger = Arc::new(LedgerEngine::new(
        Arc::clone(&store),
        Authenticator::new(Arc::clone(&signer), Arc::clone(&sessions)),
        Arc::new(LogAlert),
        config.ledger.large_withdrawal_threshold,
        Duration::from_millis(config.ledger.lock_wait_ms),
    ));
    let gate = Arc::new(Authenticator::new(
        Arc::clone(&signer),
        Arc::clone(&sessions),
    ));

    let state = ApiState {
        auth,
        accounts,
        ledger,
        gate,
    };
    let bind_addr = format!("{}:{}", config.server.bind_addr, config.server.port);
    api::serve(state, &bind_addr).await?;
    Ok(())
}
