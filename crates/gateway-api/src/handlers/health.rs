//! Liveness and readiness endpoints (`/health`, `/ready`).

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, body = HealthResponse)))]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub postgres: bool,
    pub redis: bool,
}

#[utoipa::path(
    get,
    path = "/ready",
    tag = "health",
    responses((status = 200, body = ReadinessResponse), (status = 503, body = ReadinessResponse))
)]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<ReadinessResponse>) {
    let health = state.db.health_check().await;
    let (postgres, redis, healthy) = match &health {
        Ok(h) => (h.postgres, h.redis, h.healthy),
        Err(_) => (false, false, false),
    };

    let status_code = if healthy { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    let status = if healthy { "ready" } else { "not_ready" };

    (status_code, Json(ReadinessResponse { status: status.to_string(), postgres, redis }))
}
