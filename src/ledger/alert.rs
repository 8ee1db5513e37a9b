//! Out-of-band notification for suspicious withdrawals.
//!
//! The hook is fire-and-forget: the engine never fails or rolls back a
//! withdrawal because an alert could not be delivered. Delivery backends
//! (email, paging) implement [`AlertHook`]; the default sinks to the log.

use rust_decimal::Decimal;
use tracing::warn;

pub trait AlertHook: Send + Sync {
    fn suspicious_withdrawal(&self, email: &str, account_number: &str, amount: Decimal);
}

/// Log-only alert sink for single-node deployments.
pub struct LogAlert;

impl AlertHook for LogAlert {
    fn suspicious_withdrawal(&self, email: &str, account_number: &str, amount: Decimal) {
        warn!(
            "suspicious withdrawal - account: {}, amount: {}, notified: {}",
            account_number, amount, email
        );
    }
}
