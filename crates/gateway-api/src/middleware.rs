//! Axum middleware: per-merchant rate limiting, request timing, security
//! headers.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Request, State};
use axum::RequestExt;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::extractors::{AuthContext, ClientIp};
use crate::state::AppState;

/// Rate limits by merchant id for authenticated calls, falling back to
/// client IP for the unauthenticated public intent endpoints (§5, C3).
/// Extracting `AuthContext`/`ClientIp` here (rather than in the handler)
/// consumes only the request parts, leaving the body untouched for the
/// handler's own extractors.
pub async fn rate_limit_middleware(State(state): State<Arc<AppState>>, mut req: Request, next: Next) -> Response {
    let identifier = match req.extract_parts_with_state::<AuthContext, Arc<AppState>>(&state).await {
        Ok(AuthContext(ctx)) => ctx.merchant_id.to_string(),
        Err(_) => {
            let ClientIp(ip) = req.extract_parts::<ClientIp>().await.expect("ClientIp extraction is infallible");
            ip
        }
    };

    match state.auth.rate_limiter.check(&identifier).await {
        Ok(status) => {
            let mut response = next.run(req).await;
            for (name, value) in status.to_headers() {
                if let Ok(v) = axum::http::HeaderValue::from_str(&value) {
                    response.headers_mut().insert(name, v);
                }
            }
            response
        }
        Err(e) => crate::error::ApiError::from(e).into_response(),
    }
}

/// Logs slow requests; everything else stays at debug.
pub async fn timing_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let uri = req.uri().clone();

    let response = next.run(req).await;
    let elapsed = start.elapsed();

    if elapsed.as_millis() > 1000 {
        tracing::warn!(method = %method, uri = %uri, elapsed_ms = elapsed.as_millis(), "slow request");
    } else {
        tracing::debug!(method = %method, uri = %uri, elapsed_ms = elapsed.as_millis(), status = response.status().as_u16(), "request completed");
    }

    response
}

pub async fn security_headers_middleware(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    headers.insert("X-Content-Type-Options", "nosniff".parse().unwrap());
    headers.insert("X-Frame-Options", "DENY".parse().unwrap());
    headers.insert("Cache-Control", "no-store, no-cache, must-revalidate".parse().unwrap());

    response
}
