//! Settlement and webhook error types.

use gateway_types::ErrorKind;
use thiserror::Error;

pub type SettlementResult<T> = Result<T, SettlementError>;

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("settlement batch not found")]
    BatchNotFound,

    #[error("merchant {0} has no webhook url configured")]
    NoWebhookUrl(uuid::Uuid),

    #[error("database error: {0}")]
    Db(#[from] gateway_db::DbError),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl SettlementError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BatchNotFound => ErrorKind::NotFound,
            Self::NoWebhookUrl(_) => ErrorKind::Validation,
            Self::Db(e) => e.kind(),
            Self::Http(_) => ErrorKind::UpstreamUnavailable,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}
