//! HTTP handlers. Each one deserializes the payload, pulls the bearer token
//! where the operation is authenticated, calls into the core and maps the
//! typed result onto a status code. No business logic lives here.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use crate::account::types::IdentityId;
use crate::error::BankError;

use super::types::*;
use super::ApiState;

/// Wrapper so `BankError` can flow out of handlers with `?`.
#[derive(Debug)]
pub struct ApiError(BankError);

impl From<BankError> for ApiError {
    fn from(err: BankError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status = match &err {
            BankError::Unauthenticated
            | BankError::InvalidCredentials
            | BankError::InvalidRefreshToken
            | BankError::TokenMissing
            | BankError::TokenExpired
            | BankError::TokenInvalid => StatusCode::UNAUTHORIZED,
            BankError::Unauthorized(_) => StatusCode::FORBIDDEN,
            BankError::IdentityNotFound(_) | BankError::AccountNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            BankError::InvalidAmount => StatusCode::BAD_REQUEST,
            BankError::InsufficientFunds(_) => StatusCode::UNPROCESSABLE_ENTITY,
            BankError::DuplicateEmail => StatusCode::CONFLICT,
            BankError::LockTimeout(_) | BankError::StorageUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            BankError::AccountNumberSpaceExhausted(_)
            | BankError::Aborted(_)
            | BankError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("request failed: {}", err);
        }
        let body = ErrorResponse {
            error: status
                .canonical_reason()
                .unwrap_or("Unknown")
                .to_string(),
            message: err.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Run a core call on the blocking pool. Password hashing and bounded row
/// lock waits must not tie up the async workers.
async fn run_blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> crate::error::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError(BankError::Internal(format!("blocking task failed: {e}"))))?
        .map_err(ApiError)
}

/// Raw bearer token from the Authorization header, prefix stripped.
fn bearer(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim_start_matches("Bearer ").trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ApiError(BankError::Unauthenticated))
}

/// Resolve the caller for account endpoints, folding token failures into
/// the generic authentication error.
fn resolve_caller(state: &ApiState, headers: &HeaderMap) -> Result<IdentityId, ApiError> {
    let token = bearer(headers)?;
    state.gate.resolve(&token).map_err(ApiError)
}

/// Liveness probe; no authentication.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn join(
    State(state): State<ApiState>,
    Json(req): Json<JoinRequest>,
) -> ApiResult<Json<JoinResponse>> {
    let outcome =
        run_blocking(move || state.auth.join(&req.name, &req.email, &req.password)).await?;
    Ok(Json(JoinResponse {
        name: outcome.name,
        email: outcome.email,
    }))
}

pub async fn login(
    State(state): State<ApiState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let outcome = run_blocking(move || state.auth.login(&req.email, &req.password)).await?;
    Ok(Json(LoginResponse {
        access_token: outcome.access_token,
        refresh_token: outcome.refresh_token,
        mfa_registered: outcome.mfa_registered,
    }))
}

pub async fn refresh(
    State(state): State<ApiState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let outcome = state.auth.refresh(&req.refresh_token)?;
    Ok(Json(LoginResponse {
        access_token: outcome.access_token,
        refresh_token: outcome.refresh_token,
        mfa_registered: outcome.mfa_registered,
    }))
}

pub async fn logout(State(state): State<ApiState>, headers: HeaderMap) -> ApiResult<StatusCode> {
    let token = headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim_start_matches("Bearer ").trim().to_string())
        .unwrap_or_default();
    state.auth.logout(&token)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn mfa_enroll(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> ApiResult<Json<MfaEnrollResponse>> {
    let token = bearer(&headers)?;
    let enrollment = state.auth.enroll_mfa(&token)?;
    Ok(Json(MfaEnrollResponse {
        secret: enrollment.secret,
        otp_url: enrollment.otp_url,
    }))
}

pub async fn mfa_verify(
    State(state): State<ApiState>,
    Json(req): Json<MfaVerifyRequest>,
) -> ApiResult<Json<MfaVerifyResponse>> {
    let valid = state.auth.verify_mfa(&req.email, req.code)?;
    Ok(Json(MfaVerifyResponse { valid }))
}

pub async fn create_account(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(req): Json<CreateAccountRequest>,
) -> ApiResult<(StatusCode, Json<CreateAccountResponse>)> {
    let caller = resolve_caller(&state, &headers)?;
    let account = state
        .accounts
        .create(&caller, req.balance.unwrap_or_default())?;
    Ok((
        StatusCode::CREATED,
        Json(CreateAccountResponse {
            account_number: account.number,
            user_id: account.owner,
            balance: account.balance,
            created_at: account.created_at,
        }),
    ))
}

pub async fn my_accounts(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<crate::account::AccountSummary>>> {
    let caller = resolve_caller(&state, &headers)?;
    Ok(Json(state.accounts.list_for_owner(&caller)?))
}

pub async fn transfer(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(req): Json<TransferRequest>,
) -> ApiResult<Json<TransactionResponse>> {
    let token = bearer(&headers)?;
    let tx = run_blocking(move || {
        state.ledger.transfer(
            &token,
            &req.from_account_number,
            &req.to_account_number,
            req.amount,
            req.memo,
        )
    })
    .await?;
    Ok(Json(tx.into()))
}

pub async fn withdraw(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(req): Json<WithdrawRequest>,
) -> ApiResult<Json<TransactionResponse>> {
    let token = bearer(&headers)?;
    let tx = run_blocking(move || {
        state
            .ledger
            .withdraw(&token, &req.from_account_number, req.amount, req.memo)
    })
    .await?;
    Ok(Json(tx.into()))
}

pub async fn deposit(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(req): Json<DepositRequest>,
) -> ApiResult<Json<TransactionResponse>> {
    let token = bearer(&headers)?;
    let tx = run_blocking(move || {
        state
            .ledger
            .deposit(&token, &req.to_account_number, req.amount, req.memo)
    })
    .await?;
    Ok(Json(tx.into()))
}

pub async fn transactions(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<TransactionResponse>>> {
    let token = bearer(&headers)?;
    let history = state.ledger.history(&token)?;
    Ok(Json(history.into_iter().map(Into::into).collect()))
}
