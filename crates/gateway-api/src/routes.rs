//! Route tree: merchant-authenticated payment/intent management under
//! `/api/v1`, the unauthenticated hosted-checkout surface under
//! `/api/public`, and liveness/readiness probes at the root.

use std::sync::Arc;

use axum::middleware as axum_middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::middleware::{rate_limit_middleware, security_headers_middleware, timing_middleware};
use crate::state::AppState;

/// Merchant-authenticated payment and transaction routes.
fn payment_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/authorize", post(handlers::payments::authorize))
        .route("/sale", post(handlers::payments::sale))
        .route("/{id}/capture", post(handlers::payments::capture))
        .route("/{id}/void", post(handlers::payments::void))
        .route("/{id}/refund", post(handlers::payments::refund))
        .route("/{id}", get(handlers::payments::get_transaction))
}

/// Merchant-authenticated payment-intent routes.
fn intent_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(handlers::intents::create_intent))
        .route("/{id}/cancel", post(handlers::intents::cancel_intent))
}

/// Unauthenticated hosted-checkout surface - gated by client secret, not
/// merchant credentials.
fn public_intent_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/{id}", get(handlers::intents::get_public_intent))
        .route("/{id}/confirm", post(handlers::intents::confirm_public_intent))
}

/// API v1 routes (merchant-authenticated).
pub fn api_v1_routes() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/payments", payment_routes())
        .route("/transactions", get(handlers::payments::list_transactions))
        .nest("/payment-intents", intent_routes())
}

/// Public routes (no merchant credentials required).
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().nest("/payment-intents", public_intent_routes())
}

/// Create Swagger UI routes.
pub fn swagger_routes() -> Router<Arc<AppState>> {
    use crate::openapi::ApiDoc;
    use utoipa::OpenApi;
    use utoipa_swagger_ui::SwaggerUi;

    Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

/// Assemble the full router: probes unguarded, everything else behind
/// rate limiting, timing, and security headers.
pub fn build(state: Arc<AppState>) -> Router {
    let guarded = Router::new()
        .nest("/api/v1", api_v1_routes())
        .nest("/api/public", public_routes())
        .layer(axum_middleware::from_fn_with_state(state.clone(), rate_limit_middleware));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .merge(guarded)
        .merge(swagger_routes())
        .layer(axum_middleware::from_fn(security_headers_middleware))
        .layer(axum_middleware::from_fn(timing_middleware))
        .with_state(state)
}
