//! PaymentIntent handlers: merchant-side mint/cancel, public get/confirm.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;
use validator::Validate;

use gateway_adapters::tokenization::CardDetails;
use gateway_engine::intent::{CaptureMethodInput, ConfirmRequest, CreateIntentRequest};
use gateway_types::rbac::Action;
use gateway_types::webhook::WebhookEventType;
use gateway_types::Currency;

use crate::dto::{CaptureMethodBody, ConfirmIntentRequestBody, CreateIntentRequestBody, DataEnvelope, PaymentIntentView, PublicPaymentIntentView};
use crate::error::{ApiError, ApiResult};
use crate::extractors::{require_action, AuthContext, ClientSecret};
use crate::state::AppState;

#[utoipa::path(post, path = "/api/v1/payment-intents", tag = "intents", responses((status = 200, body = PaymentIntentView)))]
pub async fn create_intent(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Json(body): Json<CreateIntentRequestBody>,
) -> ApiResult<Json<DataEnvelope<PaymentIntentView>>> {
    require_action(&auth, Action::Create)?;
    body.validate().map_err(|e| ApiError::Validation(e.to_string()))?;
    let currency = Currency::parse(&body.currency).ok_or_else(|| ApiError::Validation(format!("unsupported currency: {}", body.currency)))?;

    let req = CreateIntentRequest {
        merchant_id: auth.merchant_id,
        order_id: body.order_id,
        amount: body.amount,
        currency,
        capture_method: match body.capture_method {
            CaptureMethodBody::Automatic => CaptureMethodInput::Automatic,
            CaptureMethodBody::Manual => CaptureMethodInput::Manual,
        },
        success_url: body.success_url,
        cancel_url: body.cancel_url,
    };

    let intent = state.engines.intents.create(req).await?;
    Ok(Json(DataEnvelope::new(PaymentIntentView::created(intent))))
}

#[utoipa::path(post, path = "/api/v1/payment-intents/{id}/cancel", tag = "intents", responses((status = 200, body = PaymentIntentView)))]
pub async fn cancel_intent(State(state): State<Arc<AppState>>, auth: AuthContext, Path(id): Path<Uuid>) -> ApiResult<Json<DataEnvelope<PaymentIntentView>>> {
    require_action(&auth, Action::Update)?;
    let intent = state.engines.intents.cancel(id, auth.merchant_id).await?;

    if intent.status == "canceled" {
        let payload = serde_json::json!({ "intent_id": intent.id });
        let payment_id = intent.payment_id.unwrap_or(intent.id);
        if let Err(e) = state.webhooks.enqueue(intent.merchant_id, payment_id, &WebhookEventType::IntentCanceled.to_string(), payload).await {
            tracing::warn!(error = %e, intent_id = %intent.id, "failed to enqueue webhook");
        }
    }

    Ok(Json(DataEnvelope::new(PaymentIntentView::from(intent))))
}

#[utoipa::path(get, path = "/api/public/payment-intents/{id}", tag = "intents", responses((status = 200, body = PublicPaymentIntentView)))]
pub async fn get_public_intent(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> ApiResult<Json<DataEnvelope<PublicPaymentIntentView>>> {
    let view = state.engines.intents.get_public(id).await?;
    Ok(Json(DataEnvelope::new(PublicPaymentIntentView::from(view))))
}

#[utoipa::path(post, path = "/api/public/payment-intents/{id}/confirm", tag = "intents", responses((status = 200, body = PaymentIntentView)))]
pub async fn confirm_public_intent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    ClientSecret(client_secret): ClientSecret,
    Json(body): Json<ConfirmIntentRequestBody>,
) -> ApiResult<Json<DataEnvelope<PaymentIntentView>>> {
    body.validate().map_err(|e| ApiError::Validation(e.to_string()))?;

    let req = ConfirmRequest {
        client_secret,
        card: CardDetails {
            number: body.card_number,
            exp_month: body.exp_month,
            exp_year: body.exp_year,
            cvv: body.cvv,
        },
        fraud_score: body.fraud_score,
        customer_email: body.customer_email,
        ip: None,
        user_agent: None,
    };

    let intent = state.engines.intents.confirm(id, req).await?;

    if intent.status == "authorized" || intent.status == "captured" {
        let payload = serde_json::json!({ "intent_id": intent.id, "amount": intent.amount, "currency": intent.currency });
        let payment_id = intent.payment_id.unwrap_or(intent.id);
        if let Err(e) = state.webhooks.enqueue(intent.merchant_id, payment_id, &WebhookEventType::IntentSucceeded.to_string(), payload).await {
            tracing::warn!(error = %e, intent_id = %intent.id, "failed to enqueue webhook");
        }
    }

    Ok(Json(DataEnvelope::new(PaymentIntentView::from(intent))))
}
