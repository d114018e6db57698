//! The ten-kind error taxonomy every crate's error enum maps onto at the
//! service boundary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Machine-checkable error kind, shared by every crate so the service
/// boundary (`gateway-api`) can map any internal error to the right HTTP
/// status and `{ success: false, error }` envelope without each crate
/// depending on axum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    AuthMissing,
    AuthInvalid,
    Forbidden,
    NotFound,
    IdempotencyConflict,
    StateConflict,
    RateLimited,
    UpstreamUnavailable,
    Internal,
}

impl ErrorKind {
    /// HTTP status code per spec.md's error table.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::AuthMissing | Self::AuthInvalid => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::IdempotencyConflict | Self::StateConflict => 409,
            Self::RateLimited => 429,
            Self::UpstreamUnavailable => 502,
            Self::Internal => 500,
        }
    }

    /// Machine error code in SCREAMING_SNAKE_CASE for the JSON envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION",
            Self::AuthMissing => "AUTH_MISSING",
            Self::AuthInvalid => "AUTH_INVALID",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::IdempotencyConflict => "IDEMPOTENCY_CONFLICT",
            Self::StateConflict => "STATE_CONFLICT",
            Self::RateLimited => "RATE_LIMITED",
            Self::UpstreamUnavailable => "UPSTREAM_UNAVAILABLE",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_spec_table() {
        assert_eq!(ErrorKind::Validation.http_status(), 400);
        assert_eq!(ErrorKind::AuthMissing.http_status(), 401);
        assert_eq!(ErrorKind::AuthInvalid.http_status(), 401);
        assert_eq!(ErrorKind::Forbidden.http_status(), 403);
        assert_eq!(ErrorKind::NotFound.http_status(), 404);
        assert_eq!(ErrorKind::IdempotencyConflict.http_status(), 409);
        assert_eq!(ErrorKind::StateConflict.http_status(), 409);
        assert_eq!(ErrorKind::RateLimited.http_status(), 429);
        assert_eq!(ErrorKind::UpstreamUnavailable.http_status(), 502);
        assert_eq!(ErrorKind::Internal.http_status(), 500);
    }
}
