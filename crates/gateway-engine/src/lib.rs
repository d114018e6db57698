//! Transaction and payment-intent state machines for the payment gateway
//! core (C8, C9), plus the idempotency orchestration (C2) shared by both.
//!
//! This crate owns the business logic that sits between the HTTP boundary
//! (`gateway-api`) and persistence (`gateway-db`) / the outbound adapters
//! (`gateway-adapters`). It is deliberately transport-agnostic: nothing
//! here knows about axum, status codes, or JSON wire shapes beyond the
//! `serde_json::Value` idempotency payload.

pub mod clock;
pub mod error;
pub mod idempotency;
pub mod intent;
pub mod transaction;

pub use clock::{Clock, SystemClock, TestClock};
pub use error::{EngineError, EngineResult};
pub use idempotency::{CachedResponse, IdempotencyGuard, IdempotencyOutcome};
pub use intent::{CaptureMethodInput, ConfirmRequest, CreateIntentRequest, PaymentIntentEngine, PublicIntentView};
pub use transaction::{AuthorizeRequest, TransactionEngine, AUTHORIZATION_VALIDITY, FRAUD_DECLINE_THRESHOLD};

use std::sync::Arc;

use gateway_adapters::issuer::IssuerAdapter;
use gateway_adapters::tokenization::TokenizationAdapter;
use gateway_db::{IdempotencyRepo, IssuerResponseRepo, PaymentIntentRepo, TransactionEventRepo, TransactionRepo};
use gateway_money::FxRateStore;

/// Bundles the engines a service boundary needs, built once at startup from
/// a [`gateway_db::Database`] and the configured adapters.
pub struct Engines {
    pub transactions: Arc<TransactionEngine>,
    pub intents: Arc<PaymentIntentEngine>,
    pub idempotency: Arc<IdempotencyGuard>,
}

impl Engines {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        transaction_repo: TransactionRepo,
        transaction_event_repo: TransactionEventRepo,
        issuer_response_repo: IssuerResponseRepo,
        payment_intent_repo: PaymentIntentRepo,
        idempotency_repo: IdempotencyRepo,
        cache: Arc<gateway_db::cache::CacheManager>,
        fx_store: Arc<dyn FxRateStore>,
        issuer: Arc<dyn IssuerAdapter>,
        tokenizer: Arc<dyn TokenizationAdapter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let transactions = Arc::new(TransactionEngine::new(
            transaction_repo,
            transaction_event_repo,
            issuer_response_repo,
            fx_store,
            issuer,
            tokenizer.clone(),
            clock.clone(),
        ));

        let intents = Arc::new(PaymentIntentEngine::new(payment_intent_repo, transactions.clone(), tokenizer, clock));

        let idempotency = Arc::new(IdempotencyGuard::new(idempotency_repo, cache));

        Self {
            transactions,
            intents,
            idempotency,
        }
    }
}
