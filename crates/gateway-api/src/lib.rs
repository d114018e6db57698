//! Gateway API - HTTP service boundary for the payment gateway.
//!
//! Wires merchant-authenticated payment/intent endpoints under `/api/v1`,
//! the unauthenticated hosted-checkout surface under `/api/public`, and
//! `/health` + `/ready` probes, on top of the engines in `gateway-engine`
//! and `gateway-settlement`.

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;

pub use state::AppState;

/// Build the full axum [`Router`] for the given application state.
pub fn create_router(state: Arc<AppState>) -> Router {
    routes::build(state)
}
