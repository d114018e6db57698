//! Redis cache manager - read-through/write-invalidate accelerator only.
//!
//! The relational store is always the source of truth (§5); nothing here
//! is consulted after a write without the caller invalidating the
//! affected key first.

use deadpool_redis::{redis::AsyncCommands, Pool as RedisPool};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

use crate::{DbError, DbResult};

/// Cache key namespaces, matching spec.md's `<entity>:<id>` layout.
pub mod keys {
    pub fn transaction(id: &uuid::Uuid) -> String {
        format!("transaction:{id}")
    }
    pub fn merchant(id: &uuid::Uuid) -> String {
        format!("merchant:id:{id}")
    }
    pub fn session_token(hash: &str) -> String {
        format!("session:token:{hash}")
    }
    pub fn rate_limit(merchant: &str, window: &str) -> String {
        format!("rate_limit:payment:{merchant}:{window}")
    }
    pub fn idempotency_payload(merchant: &uuid::Uuid, key: &str) -> String {
        format!("idempotency:payment:{merchant}:{key}")
    }
    pub fn idempotency_hash(merchant: &uuid::Uuid, key: &str) -> String {
        format!("idempotency:hash:{merchant}:{key}")
    }
}

pub mod ttl {
    use std::time::Duration;

    pub const TRANSACTION: Duration = Duration::from_secs(5 * 60);
    pub const SESSION: Duration = Duration::from_secs(15 * 60);
    pub const MERCHANT: Duration = Duration::from_secs(15 * 60);
    pub const IDEMPOTENCY: Duration = Duration::from_secs(24 * 60 * 60);
}

pub struct CacheManager {
    pool: RedisPool,
}

impl CacheManager {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> DbResult<()> {
        let mut conn = self.pool.get().await?;
        let json = serde_json::to_string(value)?;
        conn.set_ex::<_, _, ()>(key, json, ttl.as_secs()).await?;
        Ok(())
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> DbResult<Option<T>> {
        let mut conn = self.pool.get().await?;
        let result: Option<String> = conn.get(key).await?;
        match result {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub async fn delete(&self, key: &str) -> DbResult<bool> {
        let mut conn = self.pool.get().await?;
        let deleted: i32 = conn.del(key).await?;
        Ok(deleted > 0)
    }

    /// Atomically increments a fixed-window counter, setting the window TTL
    /// only on the window's first increment (C3 rate limiter).
    pub async fn rate_limit_incr(&self, identifier: &str, window_secs: u64) -> DbResult<i64> {
        let mut conn = self.pool.get().await?;
        let count: i64 = conn.incr(identifier, 1).await?;
        if count == 1 {
            let _: () = conn.expire(identifier, window_secs as i64).await?;
        }
        Ok(count)
    }

    pub async fn rate_limit_count(&self, identifier: &str) -> DbResult<i64> {
        let mut conn = self.pool.get().await?;
        let count: Option<i64> = conn.get(identifier).await?;
        Ok(count.unwrap_or(0))
    }

    /// SET NX EX - used to claim an idempotency key fingerprint slot
    /// without a round trip through Postgres on the hot path.
    pub async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> DbResult<bool> {
        let mut conn = self.pool.get().await?;
        let result: Option<String> = deadpool_redis::redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs())
            .query_async(&mut conn)
            .await
            .map_err(|e| DbError::Redis(e.to_string()))?;
        Ok(result.is_some())
    }
}
