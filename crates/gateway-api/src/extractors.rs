//! Request extractors for authentication, RBAC, and validation.

use std::sync::Arc;

use axum::async_trait;
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use gateway_types::rbac::{Action, Role};

use crate::error::ApiError;
use crate::state::AppState;

/// Merchant-scoped caller context, attached by either admission path.
#[derive(Debug, Clone)]
pub struct AuthContext(pub gateway_auth::AuthContext);

impl std::ops::Deref for AuthContext {
    type Target = gateway_auth::AuthContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// `X-API-Key` or `Authorization: Bearer` admission. API keys resolve to a
/// merchant-scoped context with no role; session tokens resolve to a role
/// via RBAC, which RBAC-gated handlers check separately.
#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        if let Some(key) = parts.headers.get("X-API-Key").and_then(|v| v.to_str().ok()) {
            let ctx = state.auth.authenticate_api_key(key).await?;
            return Ok(AuthContext(ctx));
        }

        if let Some(bearer) = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
        {
            let merchant_id = merchant_id_header(parts)?;
            let ctx = state.auth.authenticate_session(bearer, merchant_id).await?;
            return Ok(AuthContext(ctx));
        }

        Err(ApiError::AuthMissing)
    }
}

fn merchant_id_header(parts: &Parts) -> Result<Uuid, ApiError> {
    parts
        .headers
        .get("X-Merchant-Id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())
        .ok_or_else(|| ApiError::Validation("X-Merchant-Id header required for session auth".to_string()))
}

/// Requires the resolved role (session callers only) to permit `action`.
/// API-key callers are always permitted: the key's scope already is the
/// merchant boundary, and RBAC only gates dashboard-style session access.
pub fn require_action(ctx: &AuthContext, action: Action) -> Result<(), ApiError> {
    match ctx.role {
        Some(role) if role.permits(action) => Ok(()),
        Some(_) => Err(ApiError::Forbidden),
        None => Ok(()),
    }
}

pub fn require_role_at_least(ctx: &AuthContext, minimum: Role) -> Result<(), ApiError> {
    match ctx.role {
        Some(role) if role_rank(role) >= role_rank(minimum) => Ok(()),
        Some(_) => Err(ApiError::Forbidden),
        None => Ok(()),
    }
}

fn role_rank(role: Role) -> u8 {
    match role {
        Role::Staff => 0,
        Role::Manager => 1,
        Role::Admin => 2,
        Role::Owner => 3,
    }
}

/// Public confirm-intent path: the client secret *is* the credential, no
/// `AuthContext` involved.
pub struct ClientSecret(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for ClientSecret
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get("X-Client-Secret")
            .and_then(|v| v.to_str().ok())
            .map(|v| ClientSecret(v.to_string()))
            .ok_or(ApiError::AuthMissing)
    }
}

/// The `Idempotency-Key` header, required on state-changing payment calls.
pub struct IdempotencyKey(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for IdempotencyKey
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get("Idempotency-Key")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Validation("Idempotency-Key header required".to_string()))?;
        Ok(IdempotencyKey(value.to_string()))
    }
}

pub struct ClientIp(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
            .map(|ci| ci.0);
        Ok(ClientIp(gateway_auth::rate_limit::extract_client_ip(&parts.headers, peer)))
    }
}

/// Validates a query-string-deserialized type with [`validator::Validate`].
pub struct ValidatedQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ValidatedQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned + validator::Validate,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::Validation(e.to_string()))?;
        value.validate().map_err(|e| ApiError::Validation(e.to_string()))?;
        Ok(ValidatedQuery(value))
    }
}

/// Validates a JSON body with [`validator::Validate`] before the handler
/// sees it, so handlers never have to re-check request shape.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + validator::Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::Validation(e.to_string()))?;
        value.validate().map_err(|e| ApiError::Validation(e.to_string()))?;
        Ok(ValidatedJson(value))
    }
}
