//! Issuer and tokenization adapters (C6, C7).
//!
//! Both are opaque RPC collaborators behind traits so the engine never
//! depends on a concrete transport; production wiring picks the HTTP
//! implementation, tests pick the in-memory fake.

pub mod error;
pub mod issuer;
pub mod tokenization;

pub use error::{AdapterError, AdapterResult};
pub use issuer::{HttpIssuerAdapter, IssuerAdapter, IssuerAuthorizeRequest, IssuerResponse, MockIssuerAdapter};
pub use tokenization::{CardDetails, MockTokenizationAdapter, TokenizationAdapter, TokenizedCard};
