//! Webhook event vocabulary dispatched by the settlement/engine crates.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEventType {
    PaymentAuthorized,
    PaymentCaptured,
    PaymentVoided,
    PaymentRefunded,
    IntentSucceeded,
    IntentCanceled,
}

impl fmt::Display for WebhookEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PaymentAuthorized => "payment.authorized",
            Self::PaymentCaptured => "payment.captured",
            Self::PaymentVoided => "payment.voided",
            Self::PaymentRefunded => "payment.refunded",
            Self::IntentSucceeded => "intent.succeeded",
            Self::IntentCanceled => "intent.canceled",
        };
        write!(f, "{s}")
    }
}

/// Backoff schedule for webhook retries, 1-indexed by attempt number.
pub const WEBHOOK_RETRY_SCHEDULE_SECS: [i64; 4] = [
    5 * 60,       // 5m
    15 * 60,      // 15m
    60 * 60,      // 1h
    6 * 60 * 60,  // 6h
];

/// Maximum delivery attempts before a webhook is abandoned.
pub const WEBHOOK_MAX_ATTEMPTS: u32 = 5;

/// Returns the delay before the next retry for a 1-indexed attempt number
/// that just failed, or `None` once attempts are exhausted.
pub fn webhook_retry_delay_secs(attempt_count: u32) -> Option<i64> {
    WEBHOOK_RETRY_SCHEDULE_SECS
        .get(attempt_count as usize - 1)
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_schedule_matches_spec() {
        assert_eq!(webhook_retry_delay_secs(1), Some(300));
        assert_eq!(webhook_retry_delay_secs(2), Some(900));
        assert_eq!(webhook_retry_delay_secs(3), Some(3600));
        assert_eq!(webhook_retry_delay_secs(4), Some(21600));
        assert_eq!(webhook_retry_delay_secs(5), None);
    }
}
