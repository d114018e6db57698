//! API key repository (C4 admission path).

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{DbApiKey, DbError, DbResult};

pub struct ApiKeyRepo {
    pool: PgPool,
}

impl ApiKeyRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        merchant_id: Uuid,
        key_prefix: &str,
        key_hash: &str,
        name: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> DbResult<DbApiKey> {
        let key = sqlx::query_as::<_, DbApiKey>(
            r#"
            INSERT INTO api_keys (merchant_id, key_prefix, key_hash, name, is_active, expires_at)
            VALUES ($1, $2, $3, $4, TRUE, $5)
            RETURNING id, merchant_id, key_prefix, key_hash, name, is_active, last_used_at, expires_at, created_at
            "#,
        )
        .bind(merchant_id)
        .bind(key_prefix)
        .bind(key_hash)
        .bind(name)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(key)
    }

    /// Looks up by prefix first (indexed, narrows to a handful of rows),
    /// then the caller compares the full hash in constant time.
    pub async fn find_by_prefix(&self, key_prefix: &str) -> DbResult<Vec<DbApiKey>> {
        let keys = sqlx::query_as::<_, DbApiKey>(
            r#"
            SELECT id, merchant_id, key_prefix, key_hash, name, is_active, last_used_at, expires_at, created_at
            FROM api_keys
            WHERE key_prefix = $1
            "#,
        )
        .bind(key_prefix)
        .fetch_all(&self.pool)
        .await?;

        Ok(keys)
    }

    pub async fn find_by_id(&self, id: Uuid) -> DbResult<Option<DbApiKey>> {
        let key = sqlx::query_as::<_, DbApiKey>(
            r#"
            SELECT id, merchant_id, key_prefix, key_hash, name, is_active, last_used_at, expires_at, created_at
            FROM api_keys
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(key)
    }

    /// Best-effort async refresh; callers should not block the auth path on
    /// this write.
    pub async fn touch_last_used(&self, id: Uuid) -> DbResult<()> {
        sqlx::query("UPDATE api_keys SET last_used_at = now() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn deactivate(&self, id: Uuid) -> DbResult<()> {
        let result = sqlx::query("UPDATE api_keys SET is_active = FALSE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("api key {id}")));
        }
        Ok(())
    }
}
