//! Authentication error types.

use gateway_types::ErrorKind;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing credential")]
    MissingCredential,

    #[error("invalid API key")]
    InvalidApiKey,

    #[error("API key expired or deactivated")]
    ApiKeyInactive,

    #[error("invalid session token")]
    InvalidSessionToken,

    #[error("session expired or revoked")]
    SessionInvalid,

    #[error("caller has no role assigned for this merchant")]
    NoRoleAssigned,

    #[error("insufficient permissions for this action")]
    Forbidden,

    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("database error: {0}")]
    Db(#[from] gateway_db::DbError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingCredential => ErrorKind::AuthMissing,
            Self::InvalidApiKey | Self::ApiKeyInactive | Self::InvalidSessionToken | Self::SessionInvalid => {
                ErrorKind::AuthInvalid
            }
            Self::NoRoleAssigned | Self::Forbidden => ErrorKind::Forbidden,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::Db(e) => e.kind(),
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}
