//! HTTP surface: a thin axum router over the core services.

pub mod handlers;
pub mod types;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::account::AccountService;
use crate::auth::tokens::Authenticator;
use crate::auth::AuthService;
use crate::ledger::LedgerEngine;

#[derive(Clone)]
pub struct ApiState {
    pub auth: Arc<AuthService>,
    pub accounts: Arc<AccountService>,
    pub ledger: Arc<LedgerEngine>,
    pub gate: Arc<Authenticator>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/join", post(handlers::join))
        .route("/api/login", post(handlers::login))
        .route("/api/refresh", post(handlers::refresh))
        .route("/api/logout", post(handlers::logout))
        .route("/api/mfa/enroll", post(handlers::mfa_enroll))
        .route("/api/mfa/verify", post(handlers::mfa_verify))
        .route(
            "/api/accounts",
            post(handlers::create_account).get(handlers::my_accounts),
        )
        .route("/api/transfer", post(handlers::transfer))
        .route("/api/withdraw", post(handlers::withdraw))
        .route("/api/deposit", post(handlers::deposit))
        .route("/api/transactions", get(handlers::transactions))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(state: ApiState, bind_addr: &str) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("API server listening on {}", bind_addr);
    axum::serve(listener, app).await
}
