//! API key admission path (C4).
//!
//! Keys are presented in `X-API-Key`, must start with the configured
//! prefix (`pk_` by default). The plaintext key is never stored - only a
//! SHA-256 hash - and lookup narrows by the indexed prefix before a
//! constant-time hash comparison.

use chrono::{DateTime, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::config::ApiKeyConfig;
use crate::error::{AuthError, AuthResult};
use crate::types::IssuedApiKey;
use gateway_db::repos::api_key::ApiKeyRepo;

#[derive(Clone)]
pub struct ApiKeyService {
    repo_pool: sqlx::PgPool,
    config: ApiKeyConfig,
}

impl ApiKeyService {
    pub fn new(repo_pool: sqlx::PgPool, config: ApiKeyConfig) -> Self {
        Self { repo_pool, config }
    }

    fn repo(&self) -> ApiKeyRepo {
        ApiKeyRepo::new(self.repo_pool.clone())
    }

    pub fn hash_key(&self, key: &str) -> String {
        hex::encode(Sha256::digest(key.as_bytes()))
    }

    /// Generates a new `pk_<random-hex>` key, stores its hash, and returns
    /// the plaintext once - callers cannot retrieve it again.
    pub async fn issue(
        &self,
        merchant_id: Uuid,
        name: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> AuthResult<IssuedApiKey> {
        let mut secret_bytes = vec![0u8; self.config.secret_length];
        rand::thread_rng().fill_bytes(&mut secret_bytes);
        let plaintext = format!("{}{}", self.config.prefix, hex::encode(secret_bytes));

        let key_prefix = prefix_index(&plaintext);
        let key_hash = self.hash_key(&plaintext);

        let record = self
            .repo()
            .create(merchant_id, &key_prefix, &key_hash, name, expires_at)
            .await?;

        Ok(IssuedApiKey {
            id: record.id,
            plaintext,
        })
    }

    /// Verifies a presented key against the stored hash and returns the
    /// owning merchant id and key id on success.
    pub async fn authenticate(&self, presented: &str) -> AuthResult<(Uuid, Uuid)> {
        if !presented.starts_with(&self.config.prefix) {
            return Err(AuthError::InvalidApiKey);
        }

        let key_prefix = prefix_index(presented);
        let candidates = self.repo().find_by_prefix(&key_prefix).await?;

        let presented_hash = self.hash_key(presented);
        let matched = candidates
            .into_iter()
            .find(|k| bool::from(k.key_hash.as_bytes().ct_eq(presented_hash.as_bytes())))
            .ok_or(AuthError::InvalidApiKey)?;

        if !matched.is_usable(Utc::now()) {
            return Err(AuthError::ApiKeyInactive);
        }

        self.repo().touch_last_used(matched.id).await.ok();

        Ok((matched.merchant_id, matched.id))
    }

    pub async fn revoke(&self, key_id: Uuid) -> AuthResult<()> {
        self.repo().deactivate(key_id).await?;
        Ok(())
    }
}

/// The fixed-length slice used for the indexed prefix lookup. Long enough
/// to keep candidate sets small without leaking meaningful key material.
fn prefix_index(key: &str) -> String {
    key.chars().take(12).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hashes_are_deterministic_and_full_length() {
        let service = ApiKeyService::new(
            sqlx::PgPool::connect_lazy("postgres://localhost/test").unwrap(),
            ApiKeyConfig::default(),
        );
        let hash1 = service.hash_key("pk_abc123");
        let hash2 = service.hash_key("pk_abc123");
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn prefix_index_is_stable_and_bounded() {
        let key = "pk_0123456789abcdef";
        assert_eq!(prefix_index(key).len(), 12);
        assert_eq!(prefix_index(key), prefix_index(key));
    }
}
