//! Engine error types.

use gateway_types::ErrorKind;
use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("transaction not found")]
    TransactionNotFound,

    #[error("payment intent not found")]
    IntentNotFound,

    #[error("transaction is in state {current}, which does not permit this operation")]
    StateConflict { current: String },

    #[error("refund amount exceeds capturable/refundable balance")]
    RefundExceedsBalance,

    #[error("declined: {reason}")]
    Declined { reason: String },

    #[error("fraud score {0} exceeds the decline threshold")]
    FraudBlocked(i32),

    #[error("idempotency key already used for a different request body")]
    IdempotencyConflict,

    #[error("money error: {0}")]
    Money(#[from] gateway_money::MoneyError),

    #[error("adapter error: {0}")]
    Adapter(#[from] gateway_adapters::AdapterError),

    #[error("database error: {0}")]
    Db(#[from] gateway_db::DbError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::TransactionNotFound | Self::IntentNotFound => ErrorKind::NotFound,
            Self::StateConflict { .. } => ErrorKind::StateConflict,
            Self::RefundExceedsBalance => ErrorKind::Validation,
            Self::Declined { .. } | Self::FraudBlocked(_) => ErrorKind::Validation,
            Self::IdempotencyConflict => ErrorKind::IdempotencyConflict,
            Self::Money(_) => ErrorKind::Validation,
            Self::Adapter(_) => ErrorKind::UpstreamUnavailable,
            Self::Db(e) => e.kind(),
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}
