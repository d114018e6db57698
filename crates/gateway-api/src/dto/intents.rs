//! PaymentIntent request/response DTOs (`/api/v1/payment-intents`,
//! `/api/public/payment-intents`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use gateway_db::DbPaymentIntent;
use gateway_engine::PublicIntentView;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateIntentRequestBody {
    pub order_id: Option<String>,
    #[validate(range(min = 1))]
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub capture_method: CaptureMethodBody,
    pub success_url: Option<String>,
    pub cancel_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMethodBody {
    #[default]
    Automatic,
    Manual,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ConfirmIntentRequestBody {
    #[validate(length(min = 12, max = 19))]
    pub card_number: String,
    #[validate(range(min = 1, max = 12))]
    pub exp_month: u32,
    #[validate(range(min = 2024))]
    pub exp_year: u32,
    pub cvv: Option<String>,
    #[validate(range(min = 0, max = 100))]
    pub fraud_score: i32,
    pub customer_email: Option<String>,
}

/// Full view returned to the merchant (`POST /payment-intents`, cancel).
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentIntentView {
    pub id: Uuid,
    pub merchant_id: Uuid,
    pub order_id: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub capture_method: String,
    /// Present only on creation - never retrievable again afterward.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    pub payment_id: Option<Uuid>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl PaymentIntentView {
    pub fn created(intent: DbPaymentIntent) -> Self {
        Self {
            client_secret: Some(intent.client_secret.clone()),
            ..Self::from(intent)
        }
    }
}

impl From<DbPaymentIntent> for PaymentIntentView {
    fn from(intent: DbPaymentIntent) -> Self {
        Self {
            id: intent.id,
            merchant_id: intent.merchant_id,
            order_id: intent.order_id,
            amount: intent.amount,
            currency: intent.currency,
            status: intent.status,
            capture_method: intent.capture_method,
            client_secret: None,
            payment_id: intent.payment_id,
            expires_at: intent.expires_at,
            created_at: intent.created_at,
        }
    }
}

/// Safe subset exposed to the unauthenticated browser GET.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PublicPaymentIntentView {
    pub id: Uuid,
    pub status: String,
    pub amount: i64,
    pub currency: String,
    pub expires_at: DateTime<Utc>,
}

impl From<PublicIntentView> for PublicPaymentIntentView {
    fn from(v: PublicIntentView) -> Self {
        Self {
            id: v.id,
            status: v.status,
            amount: v.amount,
            currency: v.currency,
            expires_at: v.expires_at,
        }
    }
}
