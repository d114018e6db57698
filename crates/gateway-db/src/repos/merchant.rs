//! Merchant mirror repository.
//!
//! The merchant entity is external (owned by a collaborator onboarding
//! service); this table holds only the fields the core needs at the
//! transaction boundary - identity, settlement currency, webhook URL.

use sqlx::PgPool;
use uuid::Uuid;

use crate::{DbError, DbMerchant, DbResult};

pub struct MerchantRepo {
    pool: PgPool,
}

impl MerchantRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> DbResult<Option<DbMerchant>> {
        let merchant = sqlx::query_as::<_, DbMerchant>(
            "SELECT id, name, settlement_currency, webhook_url, created_at FROM merchants WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(merchant)
    }

    pub async fn require_by_id(&self, id: Uuid) -> DbResult<DbMerchant> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("merchant {id}")))
    }

    pub async fn upsert(
        &self,
        id: Uuid,
        name: &str,
        settlement_currency: &str,
        webhook_url: Option<&str>,
    ) -> DbResult<DbMerchant> {
        let merchant = sqlx::query_as::<_, DbMerchant>(
            r#"
            INSERT INTO merchants (id, name, settlement_currency, webhook_url)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                settlement_currency = EXCLUDED.settlement_currency,
                webhook_url = EXCLUDED.webhook_url
            RETURNING id, name, settlement_currency, webhook_url, created_at
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(settlement_currency)
        .bind(webhook_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(merchant)
    }
}
