//! Database error types.

use gateway_types::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("migration error: {0}")]
    Migration(String),

    #[error("query error: {0}")]
    Query(#[from] sqlx::Error),

    #[error("redis error: {0}")]
    Redis(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("duplicate: {0}")]
    Duplicate(String),

    #[error("idempotency key already used for a different request")]
    IdempotencyConflict,

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl DbError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Duplicate(_) | Self::IdempotencyConflict => ErrorKind::IdempotencyConflict,
            Self::Connection(_) | Self::Redis(_) => ErrorKind::UpstreamUnavailable,
            Self::Migration(_) | Self::Query(_) | Self::Serialization(_) => ErrorKind::Internal,
        }
    }
}

impl From<deadpool_redis::PoolError> for DbError {
    fn from(e: deadpool_redis::PoolError) -> Self {
        DbError::Redis(e.to_string())
    }
}

impl From<redis::RedisError> for DbError {
    fn from(e: redis::RedisError) -> Self {
        DbError::Redis(e.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(e: serde_json::Error) -> Self {
        DbError::Serialization(e.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;
