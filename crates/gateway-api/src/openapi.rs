//! OpenAPI documentation for the gateway HTTP surface.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::OpenApi;

use crate::dto;
use crate::error::{ErrorBody, ErrorEnvelope};
use crate::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Payment Gateway API",
        description = "Multi-tenant card-payment gateway: authorize/capture/void/refund, hosted checkout via payment intents, and merchant settlement.",
        version = "1.0.0",
        contact(name = "Gateway Platform Team")
    ),
    servers(
        (url = "https://api.gateway.example", description = "Production"),
        (url = "http://localhost:8080", description = "Local development")
    ),
    paths(
        handlers::health::health_check,
        handlers::health::readiness_check,
        handlers::payments::authorize,
        handlers::payments::sale,
        handlers::payments::capture,
        handlers::payments::void,
        handlers::payments::refund,
        handlers::payments::get_transaction,
        handlers::payments::list_transactions,
        handlers::intents::create_intent,
        handlers::intents::cancel_intent,
        handlers::intents::get_public_intent,
        handlers::intents::confirm_public_intent,
    ),
    components(schemas(
        ErrorBody,
        ErrorEnvelope,
        dto::PaginationParams,
        dto::AuthorizeRequestBody,
        dto::CaptureRequestBody,
        dto::VoidRequestBody,
        dto::RefundRequestBody,
        dto::TransactionView,
        dto::CreateIntentRequestBody,
        dto::CaptureMethodBody,
        dto::ConfirmIntentRequestBody,
        dto::PaymentIntentView,
        dto::PublicPaymentIntentView,
    )),
    tags(
        (name = "health", description = "Liveness and readiness probes"),
        (name = "payments", description = "Authorize, capture, void, refund, and inspect transactions"),
        (name = "intents", description = "Hosted-checkout payment intents, merchant and public surfaces")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = &mut openapi.components {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-API-Key"))),
            );
            components.add_security_scheme(
                "session",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

pub fn openapi_json() -> String {
    ApiDoc::openapi().to_json().expect("failed to serialize OpenAPI spec")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_generation() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "Payment Gateway API");
    }

    #[test]
    fn openapi_json_contains_title() {
        assert!(openapi_json().contains("Payment Gateway API"));
    }
}
