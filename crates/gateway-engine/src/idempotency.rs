//! Idempotency orchestration (C2).
//!
//! Contract for any POST carrying `Idempotency-Key: K`, `len(K) ∈
//! [16,255]`: compute `fp = hash(canonicalize(body))`; a cached response
//! whose stored `fp` matches is replayed verbatim; a stored `fp` that
//! differs is a conflict; otherwise the handler runs and, on a 2xx status,
//! the response is cached for 24h.
//!
//! The durable record lives in Postgres via [`IdempotencyRepo`]; the cache
//! is a read-through accelerator so repeat replays within the TTL don't hit
//! the database.

use std::sync::Arc;

use serde_json::Value;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use gateway_db::cache::{keys, ttl, CacheManager};
use gateway_db::{DbIdempotencyRecord, IdempotencyRepo};

use crate::error::{EngineError, EngineResult};

pub const MIN_KEY_LEN: usize = 16;
pub const MAX_KEY_LEN: usize = 255;

#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status_code: i32,
    pub body: Value,
}

pub enum IdempotencyOutcome {
    /// No prior record for this key; the caller should run the handler and
    /// call [`IdempotencyGuard::store`] with the outcome.
    Proceed,
    /// A prior response with a matching fingerprint; replay it verbatim.
    Replay(CachedResponse),
}

pub struct IdempotencyGuard {
    repo: IdempotencyRepo,
    cache: Arc<CacheManager>,
}

impl IdempotencyGuard {
    pub fn new(repo: IdempotencyRepo, cache: Arc<CacheManager>) -> Self {
        Self { repo, cache }
    }

    /// Steps 1-2 of the contract: validates key length, computes the
    /// fingerprint, and checks for a prior record.
    pub async fn check(&self, merchant_id: Uuid, key: &str, body: &Value) -> EngineResult<IdempotencyOutcome> {
        if key.len() < MIN_KEY_LEN || key.len() > MAX_KEY_LEN {
            return Err(EngineError::Validation(format!(
                "idempotency key must be {MIN_KEY_LEN}-{MAX_KEY_LEN} characters"
            )));
        }

        let fingerprint = fingerprint_of(body);

        if let Some(cached) = self.cache.get::<CachedResponseWire>(&keys::idempotency_payload(&merchant_id, key)).await? {
            if cached.fingerprint == fingerprint {
                return Ok(IdempotencyOutcome::Replay(CachedResponse {
                    status_code: cached.status_code,
                    body: cached.body,
                }));
            }
            return Err(EngineError::IdempotencyConflict);
        }

        if let Some(record) = self.repo.find(merchant_id, key).await? {
            if record.request_fingerprint == fingerprint {
                return Ok(IdempotencyOutcome::Replay(CachedResponse {
                    status_code: record.status_code,
                    body: record.cached_response,
                }));
            }
            return Err(EngineError::IdempotencyConflict);
        }

        Ok(IdempotencyOutcome::Proceed)
    }

    /// Step 3: persists the handler's outcome for future replay. Only 2xx
    /// responses are durable; non-2xx responses let the caller retry the
    /// same key with the same body without being permanently burned.
    pub async fn store(&self, merchant_id: Uuid, key: &str, body: &Value, status_code: i32, response: Value) -> EngineResult<DbIdempotencyRecord> {
        let fingerprint = fingerprint_of(body);
        let record = self.repo.store(merchant_id, key, &fingerprint, response.clone(), status_code).await?;

        if (200..300).contains(&status_code) {
            let wire = CachedResponseWire {
                fingerprint,
                status_code,
                body: response,
            };
            self.cache
                .set(&keys::idempotency_payload(&merchant_id, key), &wire, ttl::IDEMPOTENCY)
                .await
                .ok();
        }

        Ok(record)
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct CachedResponseWire {
    fingerprint: String,
    status_code: i32,
    body: Value,
}

fn fingerprint_of(body: &Value) -> String {
    let canonical = canonicalize(body);
    let bytes = serde_json::to_vec(&canonical).unwrap_or_default();
    hex::encode(Sha256::digest(bytes))
}

/// Recursively sorts object keys so two JSON bodies with the same content
/// but different key order hash identically.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted: std::collections::BTreeMap<String, Value> = std::collections::BTreeMap::new();
            for (k, v) in map {
                sorted.insert(k.clone(), canonicalize(v));
            }
            let mut out = serde_json::Map::new();
            for (k, v) in sorted {
                out.insert(k, v);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalization_is_order_independent() {
        let a = serde_json::json!({ "b": 1, "a": 2 });
        let b = serde_json::json!({ "a": 2, "b": 1 });
        assert_eq!(fingerprint_of(&a), fingerprint_of(&b));
    }

    #[test]
    fn canonicalization_is_content_sensitive() {
        let a = serde_json::json!({ "amount": 100 });
        let b = serde_json::json!({ "amount": 200 });
        assert_ne!(fingerprint_of(&a), fingerprint_of(&b));
    }

    #[test]
    fn nested_objects_canonicalize_recursively() {
        let a = serde_json::json!({ "outer": { "y": 1, "x": 2 } });
        let b = serde_json::json!({ "outer": { "x": 2, "y": 1 } });
        assert_eq!(fingerprint_of(&a), fingerprint_of(&b));
    }
}
