//! Request/response DTOs for the payment gateway's HTTP surface.

pub mod common;
pub mod intents;
pub mod payments;

pub use common::*;
pub use intents::*;
pub use payments::*;
