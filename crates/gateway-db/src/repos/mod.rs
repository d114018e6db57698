pub mod api_key;
pub mod fx_rate;
pub mod idempotency;
pub mod issuer_response;
pub mod merchant;
pub mod payment_intent;
pub mod role_assignment;
pub mod session;
pub mod settlement_batch;
pub mod transaction;
pub mod transaction_event;
pub mod webhook_delivery;

pub use api_key::ApiKeyRepo;
pub use fx_rate::FxRateRepo;
pub use idempotency::IdempotencyRepo;
pub use issuer_response::IssuerResponseRepo;
pub use merchant::MerchantRepo;
pub use payment_intent::PaymentIntentRepo;
pub use role_assignment::RoleAssignmentRepo;
pub use session::SessionRepo;
pub use settlement_batch::SettlementBatchRepo;
pub use transaction::TransactionRepo;
pub use transaction_event::TransactionEventRepo;
pub use webhook_delivery::WebhookDeliveryRepo;
