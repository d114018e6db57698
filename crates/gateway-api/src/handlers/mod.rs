//! Request handlers, one module per resource.

pub mod health;
pub mod intents;
pub mod payments;
