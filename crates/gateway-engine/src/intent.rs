//! Payment intent engine (C9) - hosted-checkout state machine.
//!
//! `created → awaiting_payment_method → authorized → captured`, with side
//! states `canceled`, `expired`, `failed`. `gateway-db`'s insert hardcodes
//! the initial status to `awaiting_payment_method`, so `created` is never
//! observed as a persisted row.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use gateway_adapters::tokenization::{CardDetails, TokenizationAdapter};
use gateway_db::{DbPaymentIntent, PaymentIntentRepo};
use gateway_types::Currency;

use crate::clock::Clock;
use crate::error::{EngineError, EngineResult};
use crate::transaction::{AuthorizeRequest, TransactionEngine};

/// Default window a hosted checkout stays confirmable before a background
/// sweep marks it `expired`.
pub const DEFAULT_INTENT_VALIDITY: Duration = Duration::minutes(30);

/// Default retry budget before a failed confirmation attempt is terminal.
pub const DEFAULT_MAX_ATTEMPTS: i32 = 7;

#[derive(Debug, Clone)]
pub struct CreateIntentRequest {
    pub merchant_id: Uuid,
    pub order_id: Option<String>,
    pub amount: i64,
    pub currency: Currency,
    pub capture_method: CaptureMethodInput,
    pub success_url: Option<String>,
    pub cancel_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMethodInput {
    Automatic,
    Manual,
}

impl CaptureMethodInput {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Automatic => "automatic",
            Self::Manual => "manual",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfirmRequest {
    pub client_secret: String,
    pub card: CardDetails,
    pub fraud_score: i32,
    pub customer_email: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

/// Safe fields exposed to the unauthenticated browser GET.
#[derive(Debug, Clone)]
pub struct PublicIntentView {
    pub id: Uuid,
    pub status: String,
    pub amount: i64,
    pub currency: String,
    pub expires_at: DateTime<Utc>,
}

impl From<&DbPaymentIntent> for PublicIntentView {
    fn from(intent: &DbPaymentIntent) -> Self {
        Self {
            id: intent.id,
            status: intent.status.clone(),
            amount: intent.amount,
            currency: intent.currency.clone(),
            expires_at: intent.expires_at,
        }
    }
}

pub struct PaymentIntentEngine {
    intents: PaymentIntentRepo,
    transactions: Arc<TransactionEngine>,
    tokenizer: Arc<dyn TokenizationAdapter>,
    clock: Arc<dyn Clock>,
}

impl PaymentIntentEngine {
    pub fn new(
        intents: PaymentIntentRepo,
        transactions: Arc<TransactionEngine>,
        tokenizer: Arc<dyn TokenizationAdapter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            intents,
            transactions,
            tokenizer,
            clock,
        }
    }

    /// Mints an intent and its `client_secret`. The plaintext secret is
    /// present on this return value only - it is never retrievable again.
    pub async fn create(&self, req: CreateIntentRequest) -> EngineResult<DbPaymentIntent> {
        gateway_money::validate_amount(req.amount, req.currency)?;

        let client_secret = generate_client_secret();
        let expires_at = self.clock.now() + DEFAULT_INTENT_VALIDITY;

        let intent = self
            .intents
            .create(
                req.merchant_id,
                req.order_id.as_deref(),
                req.amount,
                req.currency.code(),
                req.capture_method.as_str(),
                &client_secret,
                req.success_url.as_deref(),
                req.cancel_url.as_deref(),
                DEFAULT_MAX_ATTEMPTS,
                expires_at,
            )
            .await?;

        Ok(intent)
    }

    pub async fn get_public(&self, id: Uuid) -> EngineResult<PublicIntentView> {
        let intent = self.intents.require_by_id(id).await?;
        Ok(PublicIntentView::from(&intent))
    }

    /// Confirmation path (§4.6): verify the secret, tokenize the card,
    /// delegate to [`TransactionEngine::authorize`], then auto-capture when
    /// `capture_method = automatic`.
    pub async fn confirm(&self, id: Uuid, req: ConfirmRequest) -> EngineResult<DbPaymentIntent> {
        let now = self.clock.now();
        let mut tx = self.intents.pool().begin().await.map_err(gateway_db::DbError::Query)?;
        let intent = self
            .intents
            .find_for_update(&mut tx, id)
            .await?
            .ok_or(EngineError::IntentNotFound)?;

        if intent.status != "awaiting_payment_method" {
            return Err(EngineError::StateConflict { current: intent.status });
        }
        if now >= intent.expires_at {
            return Err(EngineError::StateConflict { current: "expired".to_string() });
        }
        if intent.attempt_count >= intent.max_attempts {
            return Err(EngineError::StateConflict { current: "attempts_exhausted".to_string() });
        }
        if !bool::from(intent.client_secret.as_bytes().ct_eq(req.client_secret.as_bytes())) {
            return Err(EngineError::Validation("client secret mismatch".to_string()));
        }
        tx.commit().await.map_err(gateway_db::DbError::Query)?;

        let currency = Currency::parse(&intent.currency).ok_or(EngineError::Validation("invalid currency on intent".to_string()))?;

        let tokenized = self.tokenizer.tokenize_card(intent.merchant_id, req.card).await?;

        let authorize_req = AuthorizeRequest {
            merchant_id: intent.merchant_id,
            amount: intent.amount,
            currency,
            card_token: tokenized.token,
            card_brand: tokenized.brand,
            card_last4: tokenized.last4,
            fraud_score: req.fraud_score,
            customer_email: req.customer_email,
            ip: req.ip,
            user_agent: req.user_agent,
            idempotency_key: None,
        };

        let payment = self.transactions.authorize(authorize_req).await?;

        if payment.status == "authorized" {
            let mut tx = self.intents.pool().begin().await.map_err(gateway_db::DbError::Query)?;
            let mut updated = self.intents.mark_authorized(&mut tx, id, payment.id).await?;
            tx.commit().await.map_err(gateway_db::DbError::Query)?;

            if intent.capture_method == "automatic" {
                self.transactions.capture(payment.id, intent.merchant_id, payment.amount).await?;
                let mut tx = self.intents.pool().begin().await.map_err(gateway_db::DbError::Query)?;
                updated = self.intents.mark_captured(&mut tx, id).await?;
                tx.commit().await.map_err(gateway_db::DbError::Query)?;
            }

            Ok(updated)
        } else {
            let mark_failed = intent.attempt_count + 1 >= intent.max_attempts;
            let mut tx = self.intents.pool().begin().await.map_err(gateway_db::DbError::Query)?;
            let updated = self.intents.increment_attempt(&mut tx, id, mark_failed).await?;
            tx.commit().await.map_err(gateway_db::DbError::Query)?;
            Ok(updated)
        }
    }

    /// Cancel (§4.6): merchant-only, from `awaiting_payment_method` or
    /// `authorized`. An `authorized` intent is voided transparently first.
    pub async fn cancel(&self, id: Uuid, merchant_id: Uuid) -> EngineResult<DbPaymentIntent> {
        let intent = self.intents.require_by_id(id).await?;
        if intent.merchant_id != merchant_id {
            return Err(EngineError::IntentNotFound);
        }

        match intent.status.as_str() {
            "awaiting_payment_method" => {}
            "authorized" => {
                let payment_id = intent.payment_id.ok_or_else(|| EngineError::Internal("authorized intent missing payment_id".to_string()))?;
                self.transactions.void(payment_id, merchant_id, Some("intent canceled")).await?;
            }
            other => return Err(EngineError::StateConflict { current: other.to_string() }),
        }

        let mut tx = self.intents.pool().begin().await.map_err(gateway_db::DbError::Query)?;
        let updated = self.intents.mark_canceled(&mut tx, id).await?;
        tx.commit().await.map_err(gateway_db::DbError::Query)?;

        Ok(updated)
    }

    /// Background expiry sweep (§4.6): every `awaiting_payment_method`
    /// intent past `expires_at` moves to `expired`.
    pub async fn expire_due(&self) -> EngineResult<Vec<DbPaymentIntent>> {
        let now = self.clock.now();
        Ok(self.intents.expire_due(now).await?)
    }
}

fn generate_client_secret() -> String {
    let mut bytes = [0u8; 24];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("cs_{}", hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_secrets_are_unique_and_prefixed() {
        let a = generate_client_secret();
        let b = generate_client_secret();
        assert_ne!(a, b);
        assert!(a.starts_with("cs_"));
        assert_eq!(a.len(), 3 + 48);
    }

    #[test]
    fn capture_method_strings_match_db_convention() {
        assert_eq!(CaptureMethodInput::Automatic.as_str(), "automatic");
        assert_eq!(CaptureMethodInput::Manual.as_str(), "manual");
    }
}
