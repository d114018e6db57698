//! Database models - mapped from PostgreSQL tables.
//!
//! Lifecycle enums (`type`, `status`, `currency`) are stored as TEXT and
//! parsed at the repository boundary; `gateway_types` owns the canonical
//! enum definitions so a row's string always round-trips through them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbMerchant {
    pub id: Uuid,
    pub name: String,
    pub settlement_currency: String,
    pub webhook_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbApiKey {
    pub id: Uuid,
    pub merchant_id: Uuid,
    pub key_prefix: String,
    pub key_hash: String,
    pub name: String,
    pub is_active: bool,
    pub last_used_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl DbApiKey {
    /// A key is usable iff active and not expired.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at.map(|exp| exp > now).unwrap_or(true)
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
}

impl DbSession {
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && self.expires_at > now
    }
}

/// The flattened Role<->Permission<->UserRole join: a role assignment binds
/// one of the four fixed roles to a (user, merchant) pair. Permissions for
/// a role are computed by `gateway_types::rbac::Role::permits`, never
/// looked up through a separate permission table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbRoleAssignment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub merchant_id: Uuid,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbTransaction {
    pub id: Uuid,
    pub merchant_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub idempotency_key: Option<String>,
    pub r#type: String,
    pub status: String,
    pub amount: i64,
    pub currency: String,
    pub amount_mad: i64,
    pub fx_rate: Decimal,
    pub card_token: Option<String>,
    pub card_brand: Option<String>,
    pub card_last4: Option<String>,
    pub auth_code: Option<String>,
    pub response_code: Option<String>,
    pub response_message: Option<String>,
    pub avs: Option<String>,
    pub cvv_result: Option<String>,
    pub fraud_score: i32,
    pub captured_amount: i64,
    pub refunded_amount: i64,
    pub processing_fee: i64,
    pub net_amount: i64,
    pub settlement_batch_id: Option<Uuid>,
    pub authorized_at: Option<DateTime<Utc>>,
    pub captured_at: Option<DateTime<Utc>>,
    pub voided_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub settled_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbTransactionEvent {
    pub id: Uuid,
    pub seq: i64,
    pub transaction_id: Uuid,
    pub event_type: String,
    pub old_status: Option<String>,
    pub new_status: String,
    pub amount: Option<i64>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbIssuerResponse {
    pub id: Uuid,
    pub transaction_id: Uuid,
    pub raw_request: serde_json::Value,
    pub raw_response: serde_json::Value,
    pub processing_time_ms: i32,
    pub result_code: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbPaymentIntent {
    pub id: Uuid,
    pub merchant_id: Uuid,
    pub order_id: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub capture_method: String,
    pub client_secret: String,
    pub payment_id: Option<Uuid>,
    pub success_url: Option<String>,
    pub cancel_url: Option<String>,
    pub attempt_count: i32,
    pub max_attempts: i32,
    pub expires_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbSettlementBatch {
    pub id: Uuid,
    pub merchant_id: Uuid,
    pub batch_date: chrono::NaiveDate,
    pub gross_amount_mad: i64,
    pub refund_amount_mad: i64,
    pub fee_amount_mad: i64,
    pub net_amount_mad: i64,
    pub txn_count: i32,
    pub refund_count: i32,
    pub currency_breakdown: serde_json::Value,
    pub status: String,
    pub settlement_date: chrono::NaiveDate,
    pub settled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbIdempotencyRecord {
    pub merchant_id: Uuid,
    pub idempotency_key: String,
    pub request_fingerprint: String,
    pub cached_response: serde_json::Value,
    pub status_code: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbWebhookDelivery {
    pub id: Uuid,
    pub merchant_id: Uuid,
    pub payment_id: Uuid,
    pub event_type: String,
    pub url: String,
    pub payload: serde_json::Value,
    pub attempt_count: i32,
    pub status_code: Option<i32>,
    pub success: bool,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbFxRateSnapshot {
    pub currency: String,
    pub rate: Decimal,
    pub as_of: DateTime<Utc>,
}

/// Health status of the database connections.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub postgres: bool,
    pub redis: bool,
    pub healthy: bool,
}
