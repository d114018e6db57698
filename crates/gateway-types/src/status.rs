//! Transaction and payment-intent lifecycle vocabulary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Transaction kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Authorize,
    Capture,
    Void,
    Refund,
    Sale,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Authorize => "authorize",
            Self::Capture => "capture",
            Self::Void => "void",
            Self::Refund => "refund",
            Self::Sale => "sale",
        };
        write!(f, "{s}")
    }
}

/// Transaction status. See the state diagram in the engine's transaction
/// module for the allowed transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Authorized,
    Captured,
    Voided,
    Refunded,
    PartiallyRefunded,
    Settled,
    Failed,
}

impl TransactionStatus {
    /// Terminal statuses never transition further, except `Settled` and
    /// `Captured`/`PartiallyRefunded` which still admit refunds.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed | Self::Voided | Self::Refunded)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Authorized => "authorized",
            Self::Captured => "captured",
            Self::Voided => "voided",
            Self::Refunded => "refunded",
            Self::PartiallyRefunded => "partially_refunded",
            Self::Settled => "settled",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Whether a captured PaymentIntent is captured automatically or requires a
/// separate capture call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMethod {
    Automatic,
    Manual,
}

/// PaymentIntent (hosted checkout) status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentIntentStatus {
    Created,
    AwaitingPaymentMethod,
    Authorized,
    Captured,
    Canceled,
    Expired,
    Failed,
}

impl PaymentIntentStatus {
    /// Terminal states are absorbing: no further transition is allowed.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Captured | Self::Canceled | Self::Expired | Self::Failed
        )
    }
}

impl fmt::Display for PaymentIntentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::AwaitingPaymentMethod => "awaiting_payment_method",
            Self::Authorized => "authorized",
            Self::Captured => "captured",
            Self::Canceled => "canceled",
            Self::Expired => "expired",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Settlement batch status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementBatchStatus {
    Pending,
    Processing,
    Settled,
    Failed,
}

impl fmt::Display for SettlementBatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Settled => "settled",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settled_and_partially_refunded_are_not_terminal() {
        assert!(!TransactionStatus::Settled.is_terminal());
        assert!(!TransactionStatus::PartiallyRefunded.is_terminal());
        assert!(TransactionStatus::Refunded.is_terminal());
    }

    #[test]
    fn intent_terminal_states() {
        assert!(PaymentIntentStatus::Captured.is_terminal());
        assert!(!PaymentIntentStatus::Authorized.is_terminal());
    }
}
