//! Transaction handlers: authorize, sale, capture, void, refund, read.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use uuid::Uuid;
use validator::Validate;

use gateway_engine::idempotency::IdempotencyOutcome;
use gateway_engine::transaction::AuthorizeRequest;
use gateway_types::rbac::Action;
use gateway_types::webhook::WebhookEventType;
use gateway_types::Currency;

use crate::dto::{AuthorizeRequestBody, CaptureRequestBody, DataEnvelope, PaginatedResponse, PaginationParams, RefundRequestBody, TransactionView, VoidRequestBody};
use crate::error::{ApiError, ApiResult};
use crate::extractors::{require_action, AuthContext, IdempotencyKey};
use crate::state::AppState;

fn parse_currency(code: &str) -> ApiResult<Currency> {
    Currency::parse(code).ok_or_else(|| ApiError::Validation(format!("unsupported currency: {code}")))
}

async fn guarded<F, Fut>(
    state: &AppState,
    merchant_id: Uuid,
    key: &str,
    body: &impl serde::Serialize,
    run: F,
) -> ApiResult<axum::response::Response>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = ApiResult<serde_json::Value>>,
{
    use axum::response::IntoResponse;

    let body_value = serde_json::to_value(body).map_err(|e| ApiError::Internal(e.to_string()))?;

    match state.engines.idempotency.check(merchant_id, key, &body_value).await? {
        IdempotencyOutcome::Replay(cached) => {
            let status = axum::http::StatusCode::from_u16(cached.status_code as u16).unwrap_or(axum::http::StatusCode::OK);
            Ok((status, Json(cached.body)).into_response())
        }
        IdempotencyOutcome::Proceed => {
            let response_body = run().await?;
            let envelope = serde_json::json!({ "success": true, "data": response_body });
            state.engines.idempotency.store(merchant_id, key, &body_value, 200, envelope.clone()).await?;
            Ok((axum::http::StatusCode::OK, Json(envelope)).into_response())
        }
    }
}

#[utoipa::path(post, path = "/api/v1/payments/authorize", tag = "payments", responses((status = 200, body = TransactionView)))]
pub async fn authorize(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    IdempotencyKey(key): IdempotencyKey,
    Json(body): Json<AuthorizeRequestBody>,
) -> ApiResult<axum::response::Response> {
    require_action(&auth, Action::Create)?;
    body.validate().map_err(|e| ApiError::Validation(e.to_string()))?;
    let currency = parse_currency(&body.currency)?;
    let merchant_id = auth.merchant_id;

    guarded(&state, merchant_id, &key, &body, || async {
        let req = AuthorizeRequest {
            merchant_id,
            amount: body.amount,
            currency,
            card_token: body.card_token.clone(),
            card_brand: body.card_brand.clone(),
            card_last4: body.card_last4.clone(),
            fraud_score: body.fraud_score,
            customer_email: body.customer_email.clone(),
            ip: None,
            user_agent: None,
            idempotency_key: Some(key.clone()),
        };
        let txn = state.engines.transactions.authorize(req).await?;
        notify_if_significant(&state, &txn).await;
        Ok(serde_json::to_value(TransactionView::from(txn)).map_err(|e| ApiError::Internal(e.to_string()))?)
    })
    .await
}

#[utoipa::path(post, path = "/api/v1/payments/sale", tag = "payments", responses((status = 200, body = TransactionView)))]
pub async fn sale(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    IdempotencyKey(key): IdempotencyKey,
    Json(body): Json<AuthorizeRequestBody>,
) -> ApiResult<axum::response::Response> {
    require_action(&auth, Action::Create)?;
    body.validate().map_err(|e| ApiError::Validation(e.to_string()))?;
    let currency = parse_currency(&body.currency)?;
    let merchant_id = auth.merchant_id;

    guarded(&state, merchant_id, &key, &body, || async {
        let req = AuthorizeRequest {
            merchant_id,
            amount: body.amount,
            currency,
            card_token: body.card_token.clone(),
            card_brand: body.card_brand.clone(),
            card_last4: body.card_last4.clone(),
            fraud_score: body.fraud_score,
            customer_email: body.customer_email.clone(),
            ip: None,
            user_agent: None,
            idempotency_key: Some(key.clone()),
        };
        let txn = state.engines.transactions.sale(req).await?;
        notify_if_significant(&state, &txn).await;
        Ok(serde_json::to_value(TransactionView::from(txn)).map_err(|e| ApiError::Internal(e.to_string()))?)
    })
    .await
}

#[utoipa::path(post, path = "/api/v1/payments/{id}/capture", tag = "payments", responses((status = 200, body = TransactionView)))]
pub async fn capture(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(body): Json<CaptureRequestBody>,
) -> ApiResult<Json<DataEnvelope<TransactionView>>> {
    require_action(&auth, Action::Update)?;
    body.validate().map_err(|e| ApiError::Validation(e.to_string()))?;

    let txn = state.engines.transactions.capture(id, auth.merchant_id, body.amount).await?;
    notify_if_significant(&state, &txn).await;
    Ok(Json(DataEnvelope::new(TransactionView::from(txn))))
}

#[utoipa::path(post, path = "/api/v1/payments/{id}/void", tag = "payments", responses((status = 200, body = TransactionView)))]
pub async fn void(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(body): Json<VoidRequestBody>,
) -> ApiResult<Json<DataEnvelope<TransactionView>>> {
    require_action(&auth, Action::Update)?;
    let txn = state.engines.transactions.void(id, auth.merchant_id, body.reason.as_deref()).await?;
    notify_if_significant(&state, &txn).await;
    Ok(Json(DataEnvelope::new(TransactionView::from(txn))))
}

#[utoipa::path(post, path = "/api/v1/payments/{id}/refund", tag = "payments", responses((status = 200, body = TransactionView)))]
pub async fn refund(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(body): Json<RefundRequestBody>,
) -> ApiResult<Json<DataEnvelope<TransactionView>>> {
    require_action(&auth, Action::Update)?;
    body.validate().map_err(|e| ApiError::Validation(e.to_string()))?;

    let txn = state.engines.transactions.refund(id, auth.merchant_id, body.amount, body.reason.as_deref()).await?;
    notify_if_significant(&state, &txn).await;
    Ok(Json(DataEnvelope::new(TransactionView::from(txn))))
}

#[utoipa::path(get, path = "/api/v1/payments/{id}", tag = "payments", responses((status = 200, body = TransactionView)))]
pub async fn get_transaction(State(state): State<Arc<AppState>>, auth: AuthContext, Path(id): Path<Uuid>) -> ApiResult<Json<DataEnvelope<TransactionView>>> {
    require_action(&auth, Action::Read)?;
    let txn = state
        .engines
        .transactions
        .transactions()
        .require_by_id(id, auth.merchant_id)
        .await?;
    Ok(Json(DataEnvelope::new(TransactionView::from(txn))))
}

#[utoipa::path(get, path = "/api/v1/transactions", tag = "payments", responses((status = 200, body = PaginatedResponse<TransactionView>)))]
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Query(params): Query<PaginationParams>,
) -> ApiResult<Json<DataEnvelope<PaginatedResponse<TransactionView>>>> {
    require_action(&auth, Action::Read)?;
    let limit = params.clamped_limit(200);
    let rows = state
        .engines
        .transactions
        .transactions()
        .list_for_merchant(auth.merchant_id, limit, params.offset())
        .await?;
    let views = rows.into_iter().map(TransactionView::from).collect();
    Ok(Json(DataEnvelope::new(PaginatedResponse::new(views, params.page, limit, None))))
}

/// Fires the webhook matching a transaction's terminal-ish status. Declines
/// (`failed`) are not webhook events per spec.md §4.8's event list.
async fn notify_if_significant(state: &AppState, txn: &gateway_db::DbTransaction) {
    let event = match txn.status.as_str() {
        "authorized" => Some(WebhookEventType::PaymentAuthorized),
        "captured" => Some(WebhookEventType::PaymentCaptured),
        "voided" => Some(WebhookEventType::PaymentVoided),
        "refunded" | "partially_refunded" => Some(WebhookEventType::PaymentRefunded),
        _ => None,
    };
    if let Some(event) = event {
        let payload = serde_json::json!({ "amount": txn.amount, "currency": txn.currency, "status": txn.status });
        if let Err(e) = state.webhooks.enqueue(txn.merchant_id, txn.id, &event.to_string(), payload).await {
            tracing::warn!(error = %e, transaction_id = %txn.id, "failed to enqueue webhook");
        }
    }
}
