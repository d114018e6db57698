//! Tokenization adapter (C7) - bounded-timeout RPC to the card vault.
//!
//! The vault's internal cryptography is out of scope; this crate only
//! defines the RPC contract and a deterministic in-memory fake.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{AdapterError, AdapterResult};

pub const DEFAULT_TOKENIZATION_TIMEOUT: Duration = Duration::from_millis(400);

#[derive(Debug, Clone)]
pub struct CardDetails {
    pub number: String,
    pub exp_month: u32,
    pub exp_year: u32,
    pub cvv: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TokenizedCard {
    pub token: String,
    pub brand: String,
    pub last4: String,
    pub fingerprint: String,
}

#[async_trait]
pub trait TokenizationAdapter: Send + Sync {
    async fn tokenize_card(&self, merchant_id: Uuid, card: CardDetails) -> AdapterResult<TokenizedCard>;
    async fn detokenize(&self, token: &str, merchant_id: Uuid) -> AdapterResult<CardDetails>;
    async fn validate_token(&self, token: &str, merchant_id: Uuid) -> AdapterResult<bool>;
}

fn detect_brand(number: &str) -> &'static str {
    match number.chars().next() {
        Some('4') => "visa",
        Some('5') => "mastercard",
        Some('3') => "amex",
        _ => "unknown",
    }
}

/// In-memory tokenization fake. Tokens are scoped to the merchant that
/// created them, matching the real vault's per-merchant isolation.
#[derive(Default)]
pub struct MockTokenizationAdapter {
    vault: Mutex<HashMap<String, (Uuid, CardDetails)>>,
}

#[async_trait]
impl TokenizationAdapter for MockTokenizationAdapter {
    async fn tokenize_card(&self, merchant_id: Uuid, card: CardDetails) -> AdapterResult<TokenizedCard> {
        let last4 = card.number.chars().rev().take(4).collect::<String>().chars().rev().collect::<String>();
        let brand = detect_brand(&card.number).to_string();
        let fingerprint = format!("fp_{:x}", md5_like_hash(&card.number));
        let token = format!("tok_{}", Uuid::new_v4().simple());

        self.vault
            .lock()
            .await
            .insert(token.clone(), (merchant_id, card));

        Ok(TokenizedCard {
            token,
            brand,
            last4,
            fingerprint,
        })
    }

    async fn detokenize(&self, token: &str, merchant_id: Uuid) -> AdapterResult<CardDetails> {
        let vault = self.vault.lock().await;
        match vault.get(token) {
            Some((owner, card)) if *owner == merchant_id => Ok(card.clone()),
            Some(_) => Err(AdapterError::Protocol("token not owned by merchant".to_string())),
            None => Err(AdapterError::Protocol("unknown token".to_string())),
        }
    }

    async fn validate_token(&self, token: &str, merchant_id: Uuid) -> AdapterResult<bool> {
        let vault = self.vault.lock().await;
        Ok(matches!(vault.get(token), Some((owner, _)) if *owner == merchant_id))
    }
}

/// Cheap, non-cryptographic fingerprint good enough for test-fake dedup.
fn md5_like_hash(input: &str) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    input.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tokenize_then_detokenize_round_trips() {
        let adapter = MockTokenizationAdapter::default();
        let merchant_id = Uuid::new_v4();
        let card = CardDetails {
            number: "4111111111114242".to_string(),
            exp_month: 12,
            exp_year: 2030,
            cvv: Some("123".to_string()),
        };

        let tokenized = adapter.tokenize_card(merchant_id, card.clone()).await.unwrap();
        assert_eq!(tokenized.brand, "visa");
        assert_eq!(tokenized.last4, "4242");

        let detok = adapter.detokenize(&tokenized.token, merchant_id).await.unwrap();
        assert_eq!(detok.number, card.number);
    }

    #[tokio::test]
    async fn detokenize_rejects_wrong_merchant() {
        let adapter = MockTokenizationAdapter::default();
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();
        let card = CardDetails {
            number: "4111111111114242".to_string(),
            exp_month: 12,
            exp_year: 2030,
            cvv: None,
        };
        let tokenized = adapter.tokenize_card(owner, card).await.unwrap();
        assert!(adapter.detokenize(&tokenized.token, other).await.is_err());
    }
}
