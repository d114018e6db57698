//! Adapter error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("call timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("network error: {0}")]
    Network(String),

    #[error("protocol error: {0}")]
    Protocol(String),
}

pub type AdapterResult<T> = Result<T, AdapterError>;
