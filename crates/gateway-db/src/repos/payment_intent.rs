//! PaymentIntent repository (C9).

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{DbError, DbPaymentIntent, DbResult};

pub struct PaymentIntentRepo {
    pool: PgPool,
}

impl PaymentIntentRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        merchant_id: Uuid,
        order_id: Option<&str>,
        amount: i64,
        currency: &str,
        capture_method: &str,
        client_secret: &str,
        success_url: Option<&str>,
        cancel_url: Option<&str>,
        max_attempts: i32,
        expires_at: DateTime<Utc>,
    ) -> DbResult<DbPaymentIntent> {
        let row = sqlx::query_as::<_, DbPaymentIntent>(
            r#"
            INSERT INTO payment_intents (
                merchant_id, order_id, amount, currency, status, capture_method,
                client_secret, success_url, cancel_url, attempt_count, max_attempts, expires_at
            ) VALUES ($1, $2, $3, $4, 'awaiting_payment_method', $5, $6, $7, $8, 0, $9, $10)
            RETURNING *
            "#,
        )
        .bind(merchant_id)
        .bind(order_id)
        .bind(amount)
        .bind(currency)
        .bind(capture_method)
        .bind(client_secret)
        .bind(success_url)
        .bind(cancel_url)
        .bind(max_attempts)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn find_by_id(&self, id: Uuid) -> DbResult<Option<DbPaymentIntent>> {
        let row = sqlx::query_as::<_, DbPaymentIntent>("SELECT * FROM payment_intents WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    pub async fn require_by_id(&self, id: Uuid) -> DbResult<DbPaymentIntent> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("payment intent {id}")))
    }

    pub async fn find_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> DbResult<Option<DbPaymentIntent>> {
        let row = sqlx::query_as::<_, DbPaymentIntent>("SELECT * FROM payment_intents WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?;

        Ok(row)
    }

    pub async fn mark_authorized(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        payment_id: Uuid,
    ) -> DbResult<DbPaymentIntent> {
        let row = sqlx::query_as::<_, DbPaymentIntent>(
            "UPDATE payment_intents SET status = 'authorized', payment_id = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(payment_id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(row)
    }

    pub async fn mark_captured(&self, tx: &mut Transaction<'_, Postgres>, id: Uuid) -> DbResult<DbPaymentIntent> {
        let row = sqlx::query_as::<_, DbPaymentIntent>(
            "UPDATE payment_intents SET status = 'captured', confirmed_at = now(), updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(row)
    }

    pub async fn increment_attempt(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        mark_failed: bool,
    ) -> DbResult<DbPaymentIntent> {
        let row = sqlx::query_as::<_, DbPaymentIntent>(
            r#"
            UPDATE payment_intents
            SET attempt_count = attempt_count + 1,
                status = CASE WHEN $2 THEN 'failed' ELSE status END,
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(mark_failed)
        .fetch_one(&mut **tx)
        .await?;

        Ok(row)
    }

    pub async fn mark_canceled(&self, tx: &mut Transaction<'_, Postgres>, id: Uuid) -> DbResult<DbPaymentIntent> {
        let row = sqlx::query_as::<_, DbPaymentIntent>(
            "UPDATE payment_intents SET status = 'canceled', canceled_at = now(), updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(row)
    }

    /// Background expiry sweep: every `awaiting_payment_method` intent past
    /// its deadline moves to `expired` in one statement.
    pub async fn expire_due(&self, now: DateTime<Utc>) -> DbResult<Vec<DbPaymentIntent>> {
        let rows = sqlx::query_as::<_, DbPaymentIntent>(
            r#"
            UPDATE payment_intents
            SET status = 'expired', updated_at = now()
            WHERE status = 'awaiting_payment_method' AND expires_at < $1
            RETURNING *
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
