//! Request and response DTOs for the HTTP surface.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::account::types::{Transaction, TransactionStatus, TransactionType};

#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct JoinResponse {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub mfa_registered: bool,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct MfaEnrollResponse {
    pub secret: String,
    pub otp_url: String,
}

#[derive(Debug, Deserialize)]
pub struct MfaVerifyRequest {
    pub email: String,
    pub code: u32,
}

#[derive(Debug, Serialize)]
pub struct MfaVerifyResponse {
    pub valid: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub balance: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct CreateAccountResponse {
    pub account_number: String,
    pub user_id: String,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub from_account_number: String,
    pub to_account_number: String,
    pub amount: Decimal,
    pub memo: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    pub from_account_number: String,
    pub amount: Decimal,
    pub memo: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub to_account_number: String,
    pub amount: Decimal,
    pub memo: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub transaction_id: u64,
    pub from_account_number: Option<String>,
    pub to_account_number: Option<String>,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub amount: Decimal,
    pub memo: Option<String>,
    pub status: TransactionStatus,
    pub balance_after: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<Transaction> for TransactionResponse {
    fn from(tx: Transaction) -> Self {
        Self {
            transaction_id: tx.id,
            from_account_number: tx.from_account,
            to_account_number: tx.to_account,
            kind: tx.kind,
            amount: tx.amount,
            memo: tx.memo,
            status: tx.status,
            balance_after: tx.balance_after,
            created_at: tx.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
