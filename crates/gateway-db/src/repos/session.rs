//! Session repository for user/admin flows (not used by card-payment calls).

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{DbResult, DbSession};

pub struct SessionRepo {
    pool: PgPool,
}

impl SessionRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user_id: Uuid, token_hash: &str, expires_at: DateTime<Utc>) -> DbResult<DbSession> {
        let session = sqlx::query_as::<_, DbSession>(
            r#"
            INSERT INTO sessions (user_id, token_hash, expires_at, revoked)
            VALUES ($1, $2, $3, FALSE)
            RETURNING id, user_id, token_hash, expires_at, revoked, created_at
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(session)
    }

    pub async fn find_by_token_hash(&self, token_hash: &str) -> DbResult<Option<DbSession>> {
        let session = sqlx::query_as::<_, DbSession>(
            "SELECT id, user_id, token_hash, expires_at, revoked, created_at FROM sessions WHERE token_hash = $1",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    pub async fn revoke(&self, id: Uuid) -> DbResult<()> {
        sqlx::query("UPDATE sessions SET revoked = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
