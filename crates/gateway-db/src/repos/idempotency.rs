//! Idempotency key store (C2).
//!
//! One row per `(merchant_id, idempotency_key)`. The engine compares the
//! caller's request fingerprint against the stored one before returning the
//! cached response, so a key reused with a different body is rejected rather
//! than silently replayed.

use sqlx::PgPool;
use uuid::Uuid;

use crate::{DbIdempotencyRecord, DbResult};

pub struct IdempotencyRepo {
    pool: PgPool,
}

impl IdempotencyRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, merchant_id: Uuid, key: &str) -> DbResult<Option<DbIdempotencyRecord>> {
        let row = sqlx::query_as::<_, DbIdempotencyRecord>(
            "SELECT * FROM idempotency_records WHERE merchant_id = $1 AND idempotency_key = $2",
        )
        .bind(merchant_id)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Inserts a fresh record. Returns [`crate::DbError::IdempotencyConflict`]
    /// if the key was already claimed, which can happen when two requests
    /// race on the same new key.
    pub async fn store(
        &self,
        merchant_id: Uuid,
        key: &str,
        request_fingerprint: &str,
        cached_response: serde_json::Value,
        status_code: i32,
    ) -> DbResult<DbIdempotencyRecord> {
        let row = sqlx::query_as::<_, DbIdempotencyRecord>(
            r#"
            INSERT INTO idempotency_records (merchant_id, idempotency_key, request_fingerprint, cached_response, status_code)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(merchant_id)
        .bind(key)
        .bind(request_fingerprint)
        .bind(cached_response)
        .bind(status_code)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn purge_expired(&self, older_than: chrono::DateTime<chrono::Utc>) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM idempotency_records WHERE created_at < $1")
            .bind(older_than)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
