//! Transaction engine (C8) - the heart of the gateway.
//!
//! State machine:
//!
//! ```text
//!               ┌── (issuer declines / fraud>70) ──► failed
//!   pending ────┤
//!               └── authorize ok ──► authorized ──┬── capture ──► captured ──┬── refund (partial) ──► partially_refunded
//!                                        │         │                        └── refund (full)   ──► refunded
//!                                        │         └── settlement cut ──► settled ── refund ──► partially_refunded / refunded
//!                                        ├── void ──► voided
//!                                        └── expires_at < now ──► voided (auto)
//! ```
//!
//! `failed`, `voided`, `refunded` are absorbing. `settled` and `captured`/
//! `partially_refunded` still admit refunds.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use gateway_adapters::issuer::{with_timeout, IssuerAdapter, IssuerAuthorizeRequest, IssuerResponse, DEFAULT_ISSUER_TIMEOUT};
use gateway_adapters::tokenization::{TokenizationAdapter, DEFAULT_TOKENIZATION_TIMEOUT};
use gateway_db::{DbError, DbTransaction, IssuerResponseRepo, TransactionEventRepo, TransactionRepo};
use gateway_money::FxRateStore;
use gateway_types::Currency;

use crate::clock::Clock;
use crate::error::{EngineError, EngineResult};

/// Authorization is declined without an issuer call once the caller-supplied
/// fraud score strictly exceeds this.
pub const FRAUD_DECLINE_THRESHOLD: i32 = 70;

/// How long an `authorized` transaction remains capturable/voidable.
pub const AUTHORIZATION_VALIDITY: Duration = Duration::days(7);

#[derive(Debug, Clone)]
pub struct AuthorizeRequest {
    pub merchant_id: Uuid,
    pub amount: i64,
    pub currency: Currency,
    pub card_token: String,
    pub card_brand: String,
    pub card_last4: String,
    pub fraud_score: i32,
    pub customer_email: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub idempotency_key: Option<String>,
}

pub struct TransactionEngine {
    transactions: TransactionRepo,
    events: TransactionEventRepo,
    issuer_responses: IssuerResponseRepo,
    fx_store: Arc<dyn FxRateStore>,
    issuer: Arc<dyn IssuerAdapter>,
    tokenizer: Arc<dyn TokenizationAdapter>,
    clock: Arc<dyn Clock>,
}

impl TransactionEngine {
    pub fn new(
        transactions: TransactionRepo,
        events: TransactionEventRepo,
        issuer_responses: IssuerResponseRepo,
        fx_store: Arc<dyn FxRateStore>,
        issuer: Arc<dyn IssuerAdapter>,
        tokenizer: Arc<dyn TokenizationAdapter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            transactions,
            events,
            issuer_responses,
            fx_store,
            issuer,
            tokenizer,
            clock,
        }
    }

    /// Authorize (§4.5). Fraud pre-check short-circuits strictly before any
    /// issuer call; an idempotency-key collision on insert returns the
    /// winner's row rather than erroring.
    pub async fn authorize(&self, req: AuthorizeRequest) -> EngineResult<DbTransaction> {
        gateway_money::validate_amount(req.amount, req.currency)?;

        let now = self.clock.now();
        let (amount_mad, fx_rate) =
            gateway_money::convert_to_mad(self.fx_store.as_ref(), req.amount, req.currency, now).await?;
        let processing_fee = gateway_money::processing_fee(amount_mad);
        let net_amount = amount_mad - processing_fee;

        if req.fraud_score > FRAUD_DECLINE_THRESHOLD {
            return self
                .persist_authorize_outcome(&req, amount_mad, fx_rate, processing_fee, net_amount, None, None, now)
                .await;
        }

        let card = match with_timeout(DEFAULT_TOKENIZATION_TIMEOUT, self.tokenizer.detokenize(&req.card_token, req.merchant_id)).await {
            Ok(card) => card,
            Err(_) => {
                return self
                    .persist_authorize_outcome(&req, amount_mad, fx_rate, processing_fee, net_amount, None, None, now)
                    .await;
            }
        };

        let issuer_req = IssuerAuthorizeRequest {
            merchant_id: req.merchant_id,
            amount: req.amount,
            currency: req.currency.code().to_string(),
            card_number: card.number,
            card_exp_month: card.exp_month,
            card_exp_year: card.exp_year,
            cvv: card.cvv,
        };

        let issuer_result = with_timeout(DEFAULT_ISSUER_TIMEOUT, self.issuer.authorize(issuer_req.clone())).await;

        let (issuer_response, audit_request) = match issuer_result {
            Ok(response) => (Some(response), Some(issuer_req)),
            Err(_) => (None, None),
        };

        self.persist_authorize_outcome(&req, amount_mad, fx_rate, processing_fee, net_amount, issuer_response, audit_request, now)
            .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn persist_authorize_outcome(
        &self,
        req: &AuthorizeRequest,
        amount_mad: i64,
        fx_rate: Decimal,
        processing_fee: i64,
        net_amount: i64,
        issuer_response: Option<IssuerResponse>,
        audit_request: Option<IssuerAuthorizeRequest>,
        now: DateTime<Utc>,
    ) -> EngineResult<DbTransaction> {
        let approved = issuer_response.as_ref().map(|r| r.approved).unwrap_or(false);
        let status = if approved { "authorized" } else { "failed" };
        let (authorized_at, expires_at) = if approved {
            (Some(now), Some(now + AUTHORIZATION_VALIDITY))
        } else {
            (None, None)
        };

        let mut tx = self.transactions.begin().await?;
        let insert_result = self
            .transactions
            .insert(
                &mut tx,
                req.merchant_id,
                None,
                req.idempotency_key.as_deref(),
                "authorize",
                status,
                req.amount,
                req.currency.code(),
                amount_mad,
                fx_rate,
                Some(req.card_token.as_str()),
                Some(req.card_brand.as_str()),
                Some(req.card_last4.as_str()),
                issuer_response.as_ref().and_then(|r| r.auth_code.as_deref()),
                issuer_response.as_ref().map(|r| r.response_code.as_str()),
                issuer_response.as_ref().map(|r| r.response_message.as_str()),
                issuer_response.as_ref().and_then(|r| r.avs.as_deref()),
                issuer_response.as_ref().and_then(|r| r.cvv_result.as_deref()),
                req.fraud_score,
                processing_fee,
                net_amount,
                authorized_at,
                expires_at,
            )
            .await;

        let row = match insert_result {
            Ok(row) => row,
            Err(DbError::IdempotencyConflict) => {
                tx.rollback().await.ok();
                let key = req
                    .idempotency_key
                    .as_deref()
                    .ok_or_else(|| EngineError::Internal("idempotency conflict without a key".to_string()))?;
                return self
                    .transactions
                    .find_by_idempotency_key(req.merchant_id, key)
                    .await?
                    .ok_or(EngineError::TransactionNotFound);
            }
            Err(e) => return Err(e.into()),
        };

        if let (Some(request), Some(response)) = (&audit_request, &issuer_response) {
            let raw_request = serde_json::to_value(request).unwrap_or(serde_json::Value::Null);
            let raw_response = serde_json::to_value(response).unwrap_or(serde_json::Value::Null);
            self.issuer_responses
                .record(&mut tx, row.id, raw_request, raw_response, 0, &response.response_code)
                .await?;
        }

        let event_type = if approved { "authorized" } else { "declined" };
        let metadata = serde_json::json!({
            "customer_email": req.customer_email,
            "ip": req.ip,
            "user_agent": req.user_agent,
            "decline_reason": issuer_response.as_ref().and_then(|r| r.decline_reason.clone()),
        });
        self.events
            .append(&mut tx, row.id, event_type, None, status, Some(req.amount), metadata)
            .await?;

        tx.commit().await.map_err(|e| EngineError::Db(gateway_db::DbError::Query(e)))?;

        // A decline is a business outcome, not a transport error: the
        // caller gets back a fully persisted `failed` transaction with the
        // decline reason in its event metadata, same as an `authorized` one.
        Ok(row)
    }

    /// Capture (§4.5). Partial capture allowed: `amount <= transaction.amount`.
    pub async fn capture(&self, transaction_id: Uuid, merchant_id: Uuid, amount: i64) -> EngineResult<DbTransaction> {
        let now = self.clock.now();
        let mut tx = self.transactions.begin().await?;
        let row = self
            .transactions
            .find_for_update(&mut tx, transaction_id, merchant_id)
            .await?
            .ok_or(EngineError::TransactionNotFound)?;

        if row.status != "authorized" {
            return Err(EngineError::StateConflict { current: row.status });
        }
        match row.expires_at {
            Some(exp) if now < exp => {}
            _ => return Err(EngineError::StateConflict { current: "expired".to_string() }),
        }
        if amount > row.amount {
            return Err(EngineError::Validation("capture amount exceeds authorized amount".to_string()));
        }

        let auth_code = row
            .auth_code
            .clone()
            .ok_or_else(|| EngineError::Internal("authorized transaction missing auth_code".to_string()))?;

        let response = with_timeout(DEFAULT_ISSUER_TIMEOUT, self.issuer.capture(&auth_code, amount)).await?;
        if !response.approved {
            return Err(EngineError::Declined {
                reason: response.decline_reason.unwrap_or_else(|| "capture declined".to_string()),
            });
        }

        let updated = self
            .transactions
            .mark_captured(&mut tx, transaction_id, amount, response.auth_code.as_deref(), Some(response.response_code.as_str()))
            .await?;
        self.events
            .append(&mut tx, transaction_id, "captured", Some("authorized"), "captured", Some(amount), serde_json::Value::Null)
            .await?;
        tx.commit().await.map_err(|e| EngineError::Db(gateway_db::DbError::Query(e)))?;

        Ok(updated)
    }

    /// Sale: Authorize immediately followed by Capture of the full amount.
    /// On capture failure the authorization remains in place; the caller may
    /// retry capture or void separately.
    pub async fn sale(&self, req: AuthorizeRequest) -> EngineResult<DbTransaction> {
        let amount = req.amount;
        let merchant_id = req.merchant_id;
        let authorized = self.authorize(req).await?;
        self.capture(authorized.id, merchant_id, amount).await
    }

    /// Void (§4.5). Preconditions: `status = authorized && now < expires_at`.
    pub async fn void(&self, transaction_id: Uuid, merchant_id: Uuid, reason: Option<&str>) -> EngineResult<DbTransaction> {
        let now = self.clock.now();
        let mut tx = self.transactions.begin().await?;
        let row = self
            .transactions
            .find_for_update(&mut tx, transaction_id, merchant_id)
            .await?
            .ok_or(EngineError::TransactionNotFound)?;

        if row.status != "authorized" {
            return Err(EngineError::StateConflict { current: row.status });
        }
        match row.expires_at {
            Some(exp) if now < exp => {}
            _ => return Err(EngineError::StateConflict { current: "expired".to_string() }),
        }

        let auth_code = row
            .auth_code
            .clone()
            .ok_or_else(|| EngineError::Internal("authorized transaction missing auth_code".to_string()))?;
        self.issuer_void(&auth_code).await?;

        let updated = self.transactions.mark_voided(&mut tx, transaction_id).await?;
        let metadata = serde_json::json!({ "reason": reason });
        self.events
            .append(&mut tx, transaction_id, "voided", Some("authorized"), "voided", None, metadata)
            .await?;
        tx.commit().await.map_err(|e| EngineError::Db(gateway_db::DbError::Query(e)))?;

        Ok(updated)
    }

    async fn issuer_void(&self, auth_code: &str) -> EngineResult<IssuerResponse> {
        Ok(with_timeout(DEFAULT_ISSUER_TIMEOUT, self.issuer.void(auth_code)).await?)
    }

    /// Refund (§4.5). `amount <= remaining_refundable = captured_amount -
    /// refunded_amount`. Prorates `amount_mad` against the parent's amount
    /// and copies its frozen `fx_rate`. Divisions round toward zero.
    pub async fn refund(
        &self,
        transaction_id: Uuid,
        merchant_id: Uuid,
        amount: i64,
        reason: Option<&str>,
    ) -> EngineResult<DbTransaction> {
        let mut tx = self.transactions.begin().await?;
        let parent = self
            .transactions
            .find_for_update(&mut tx, transaction_id, merchant_id)
            .await?
            .ok_or(EngineError::TransactionNotFound)?;

        if !matches!(parent.status.as_str(), "captured" | "settled" | "partially_refunded") {
            return Err(EngineError::StateConflict { current: parent.status });
        }
        let remaining = parent.captured_amount - parent.refunded_amount;
        if amount <= 0 || amount > remaining {
            return Err(EngineError::RefundExceedsBalance);
        }

        let auth_code = parent
            .auth_code
            .clone()
            .ok_or_else(|| EngineError::Internal("captured transaction missing auth_code".to_string()))?;
        let response = with_timeout(DEFAULT_ISSUER_TIMEOUT, self.issuer.refund(&auth_code, amount)).await?;
        if !response.approved {
            return Err(EngineError::Declined {
                reason: response.decline_reason.unwrap_or_else(|| "refund declined".to_string()),
            });
        }

        let refund_amount_mad = if parent.captured_amount == 0 {
            0
        } else {
            parent.amount_mad * amount / parent.captured_amount
        };

        let child = self
            .transactions
            .insert(
                &mut tx,
                merchant_id,
                Some(parent.id),
                None,
                "refund",
                "refunded",
                -amount,
                &parent.currency,
                -refund_amount_mad,
                parent.fx_rate,
                parent.card_token.as_deref(),
                parent.card_brand.as_deref(),
                parent.card_last4.as_deref(),
                None,
                None,
                None,
                None,
                None,
                parent.fraud_score,
                0,
                -refund_amount_mad,
                None,
                None,
            )
            .await?;

        let metadata = serde_json::json!({ "reason": reason, "parent_id": parent.id });
        self.events
            .append(&mut tx, child.id, "refunded", None, "refunded", Some(-amount), metadata)
            .await?;

        let updated_parent = self.transactions.apply_refund_to_parent(&mut tx, parent.id, amount).await?;
        self.events
            .append(
                &mut tx,
                parent.id,
                "refund_applied",
                Some(parent.status.as_str()),
                &updated_parent.status,
                Some(amount),
                serde_json::json!({ "refund_transaction_id": child.id }),
            )
            .await?;

        tx.commit().await.map_err(|e| EngineError::Db(gateway_db::DbError::Query(e)))?;

        Ok(child)
    }

    pub fn transactions(&self) -> &TransactionRepo {
        &self.transactions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gateway_adapters::error::AdapterResult;
    use gateway_adapters::tokenization::CardDetails;
    use gateway_money::InMemoryFxRateStore;

    struct ApprovingIssuer;

    #[async_trait]
    impl IssuerAdapter for ApprovingIssuer {
        async fn authorize(&self, _req: IssuerAuthorizeRequest) -> AdapterResult<IssuerResponse> {
            Ok(IssuerResponse {
                approved: true,
                auth_code: Some("AUTH1".to_string()),
                response_code: "00".to_string(),
                response_message: "Approved".to_string(),
                decline_reason: None,
                avs: Some("Y".to_string()),
                cvv_result: Some("M".to_string()),
            })
        }

        async fn capture(&self, auth_code: &str, _amount: i64) -> AdapterResult<IssuerResponse> {
            Ok(IssuerResponse {
                approved: true,
                auth_code: Some(auth_code.to_string()),
                response_code: "00".to_string(),
                response_message: "Captured".to_string(),
                decline_reason: None,
                avs: None,
                cvv_result: None,
            })
        }

        async fn void(&self, auth_code: &str) -> AdapterResult<IssuerResponse> {
            Ok(IssuerResponse {
                approved: true,
                auth_code: Some(auth_code.to_string()),
                response_code: "00".to_string(),
                response_message: "Voided".to_string(),
                decline_reason: None,
                avs: None,
                cvv_result: None,
            })
        }

        async fn refund(&self, auth_code: &str, _amount: i64) -> AdapterResult<IssuerResponse> {
            Ok(IssuerResponse {
                approved: true,
                auth_code: Some(auth_code.to_string()),
                response_code: "00".to_string(),
                response_message: "Refunded".to_string(),
                decline_reason: None,
                avs: None,
                cvv_result: None,
            })
        }
    }

    struct NoopTokenizer;

    #[async_trait]
    impl TokenizationAdapter for NoopTokenizer {
        async fn tokenize_card(&self, _merchant_id: Uuid, _card: CardDetails) -> AdapterResult<gateway_adapters::tokenization::TokenizedCard> {
            unimplemented!()
        }

        async fn detokenize(&self, _token: &str, _merchant_id: Uuid) -> AdapterResult<CardDetails> {
            Ok(CardDetails {
                number: "4111111111114242".to_string(),
                exp_month: 12,
                exp_year: 2030,
                cvv: Some("123".to_string()),
            })
        }

        async fn validate_token(&self, _token: &str, _merchant_id: Uuid) -> AdapterResult<bool> {
            Ok(true)
        }
    }

    #[derive(Default)]
    struct CountingIssuer {
        authorize_calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl IssuerAdapter for CountingIssuer {
        async fn authorize(&self, _req: IssuerAuthorizeRequest) -> AdapterResult<IssuerResponse> {
            self.authorize_calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(IssuerResponse {
                approved: true,
                auth_code: Some("AUTH1".to_string()),
                response_code: "00".to_string(),
                response_message: "Approved".to_string(),
                decline_reason: None,
                avs: None,
                cvv_result: None,
            })
        }

        async fn capture(&self, _auth_code: &str, _amount: i64) -> AdapterResult<IssuerResponse> {
            unimplemented!()
        }

        async fn void(&self, _auth_code: &str) -> AdapterResult<IssuerResponse> {
            unimplemented!()
        }

        async fn refund(&self, _auth_code: &str, _amount: i64) -> AdapterResult<IssuerResponse> {
            unimplemented!()
        }
    }

    fn engine() -> TransactionEngine {
        let pool = sqlx::PgPool::connect_lazy("postgres://localhost/test").unwrap();
        TransactionEngine::new(
            TransactionRepo::new(pool.clone()),
            TransactionEventRepo::new(pool.clone()),
            IssuerResponseRepo::new(pool),
            Arc::new(InMemoryFxRateStore::default()),
            Arc::new(ApprovingIssuer),
            Arc::new(NoopTokenizer),
            Arc::new(crate::clock::SystemClock),
        )
    }

    fn req() -> AuthorizeRequest {
        AuthorizeRequest {
            merchant_id: Uuid::new_v4(),
            amount: 10_000,
            currency: Currency::Usd,
            card_token: "tok_abc".to_string(),
            card_brand: "visa".to_string(),
            card_last4: "4242".to_string(),
            fraud_score: 10,
            customer_email: None,
            ip: None,
            user_agent: None,
            idempotency_key: None,
        }
    }

    #[test]
    fn fraud_threshold_is_exclusive() {
        assert!(FRAUD_DECLINE_THRESHOLD == 70);
        assert!(71 > FRAUD_DECLINE_THRESHOLD);
        assert!(70 <= FRAUD_DECLINE_THRESHOLD);
    }

    #[tokio::test]
    async fn fraud_score_above_threshold_short_circuits_without_issuer_call() {
        let pool = sqlx::PgPool::connect_lazy("postgres://localhost/test").unwrap();
        let issuer = Arc::new(CountingIssuer::default());
        let engine = TransactionEngine::new(
            TransactionRepo::new(pool.clone()),
            TransactionEventRepo::new(pool.clone()),
            IssuerResponseRepo::new(pool),
            Arc::new(InMemoryFxRateStore::default()),
            issuer.clone(),
            Arc::new(NoopTokenizer),
            Arc::new(crate::clock::SystemClock),
        );

        let mut request = req();
        request.fraud_score = 71;
        // the DB round trip fails against a lazily-connected pool, but the
        // fraud short-circuit happens before any issuer call regardless.
        let _ = engine.authorize(request).await;
        assert_eq!(issuer.authorize_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }
}
