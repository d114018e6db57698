//! Transaction request/response DTOs (`/api/v1/payments`, `/api/v1/transactions`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use gateway_db::DbTransaction;

/// Shared body for `authorize` and `sale` - both delegate to the same
/// card-present authorization path, `sale` immediately captures the result.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct AuthorizeRequestBody {
    #[validate(range(min = 1))]
    pub amount: i64,
    pub currency: String,
    #[validate(length(min = 1))]
    pub card_token: String,
    #[validate(length(min = 1))]
    pub card_brand: String,
    #[validate(length(equal = 4))]
    pub card_last4: String,
    #[validate(range(min = 0, max = 100))]
    pub fraud_score: i32,
    pub customer_email: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CaptureRequestBody {
    #[validate(range(min = 1))]
    pub amount: i64,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct VoidRequestBody {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RefundRequestBody {
    #[validate(range(min = 1))]
    pub amount: i64,
    pub reason: Option<String>,
}

/// Wire view of a transaction. Card PAN, CVV, and raw issuer payloads never
/// leave the gateway; only the token, brand, and last four surface here.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TransactionView {
    pub id: Uuid,
    pub merchant_id: Uuid,
    pub parent_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    pub amount: i64,
    pub currency: String,
    pub amount_mad: i64,
    pub card_brand: Option<String>,
    pub card_last4: Option<String>,
    pub captured_amount: i64,
    pub refunded_amount: i64,
    pub processing_fee: i64,
    pub net_amount: i64,
    pub authorized_at: Option<DateTime<Utc>>,
    pub captured_at: Option<DateTime<Utc>>,
    pub voided_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<DbTransaction> for TransactionView {
    fn from(t: DbTransaction) -> Self {
        Self {
            id: t.id,
            merchant_id: t.merchant_id,
            parent_id: t.parent_id,
            kind: t.r#type,
            status: t.status,
            amount: t.amount,
            currency: t.currency,
            amount_mad: t.amount_mad,
            card_brand: t.card_brand,
            card_last4: t.card_last4,
            captured_amount: t.captured_amount,
            refunded_amount: t.refunded_amount,
            processing_fee: t.processing_fee,
            net_amount: t.net_amount,
            authorized_at: t.authorized_at,
            captured_at: t.captured_at,
            voided_at: t.voided_at,
            refunded_at: t.refunded_at,
            expires_at: t.expires_at,
            created_at: t.created_at,
        }
    }
}
