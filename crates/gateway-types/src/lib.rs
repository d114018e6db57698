//! Gateway Types - Canonical domain types for the payment gateway core
//!
//! This crate contains foundational types with zero dependencies on other
//! gateway crates:
//!
//! - Currency and minor-unit amount bounds
//! - Transaction and payment-intent lifecycle enums
//! - RBAC role/permission vocabulary
//! - Webhook event vocabulary
//! - The ten-kind error taxonomy shared by every crate's error mapping

pub mod currency;
pub mod error;
pub mod rbac;
pub mod status;
pub mod webhook;

pub use currency::*;
pub use error::*;
pub use rbac::*;
pub use status::*;
pub use webhook::*;
