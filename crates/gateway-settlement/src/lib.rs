//! Settlement batching, payout scheduling, auto-void, and webhook delivery
//! (C10, C11, C12) for the payment gateway.

pub mod batch;
pub mod error;
pub mod scheduler;
pub mod webhook;

pub use batch::{SettlementEngine, SETTLEMENT_LAG_DAYS};
pub use error::{SettlementError, SettlementResult};
pub use webhook::{WebhookDispatcher, BACKOFF_SCHEDULE, MAX_ATTEMPTS};
