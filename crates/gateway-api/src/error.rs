//! Service-boundary error type. Every crate's error enum maps onto
//! [`gateway_types::ErrorKind`]; this is where that kind becomes an HTTP
//! response with the `{ "success": false, "error": ... }` envelope.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use gateway_types::ErrorKind;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("missing credential")]
    AuthMissing,

    #[error("invalid credential")]
    AuthInvalid,

    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("{0}")]
    IdempotencyConflict(String),

    #[error("{0}")]
    StateConflict(String),

    #[error("rate limit exceeded")]
    RateLimited { retry_after_secs: u64 },

    #[error("upstream unavailable")]
    UpstreamUnavailable,

    #[error("internal error")]
    Internal(String),

    #[error("auth error: {0}")]
    Auth(#[from] gateway_auth::AuthError),

    #[error("engine error: {0}")]
    Engine(#[from] gateway_engine::EngineError),

    #[error("settlement error: {0}")]
    Settlement(#[from] gateway_settlement::SettlementError),

    #[error("database error: {0}")]
    Db(#[from] gateway_db::DbError),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::AuthMissing => ErrorKind::AuthMissing,
            Self::AuthInvalid => ErrorKind::AuthInvalid,
            Self::Forbidden => ErrorKind::Forbidden,
            Self::NotFound => ErrorKind::NotFound,
            Self::IdempotencyConflict(_) => ErrorKind::IdempotencyConflict,
            Self::StateConflict(_) => ErrorKind::StateConflict,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::UpstreamUnavailable => ErrorKind::UpstreamUnavailable,
            Self::Internal(_) => ErrorKind::Internal,
            Self::Auth(e) => e.kind(),
            Self::Engine(e) => e.kind(),
            Self::Settlement(e) => e.kind(),
            Self::Db(e) => e.kind(),
        }
    }

    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            Self::Auth(gateway_auth::AuthError::RateLimited { retry_after_secs }) => Some(*retry_after_secs),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: ErrorBody,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = StatusCode::from_u16(kind.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let message = match &self {
            // internal details never cross the boundary
            Self::Internal(_) | Self::Db(_) => "an internal error occurred".to_string(),
            other => other.to_string(),
        };
        let envelope = ErrorEnvelope {
            success: false,
            error: ErrorBody { code: kind.code(), message },
        };

        let mut response = (status, Json(envelope)).into_response();
        if let Some(secs) = self.retry_after_secs() {
            if let Ok(value) = axum::http::HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(axum::http::header::RETRY_AFTER, value);
            }
        }
        response
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
