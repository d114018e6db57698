//! Webhook delivery queue (C11).

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{DbResult, DbWebhookDelivery};

pub struct WebhookDeliveryRepo {
    pool: PgPool,
}

impl WebhookDeliveryRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn enqueue(
        &self,
        merchant_id: Uuid,
        payment_id: Uuid,
        event_type: &str,
        url: &str,
        payload: serde_json::Value,
    ) -> DbResult<DbWebhookDelivery> {
        let row = sqlx::query_as::<_, DbWebhookDelivery>(
            r#"
            INSERT INTO webhook_deliveries (merchant_id, payment_id, event_type, url, payload, attempt_count, success)
            VALUES ($1, $2, $3, $4, $5, 0, false)
            RETURNING *
            "#,
        )
        .bind(merchant_id)
        .bind(payment_id)
        .bind(event_type)
        .bind(url)
        .bind(payload)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    /// Rows due for delivery: never attempted, or past their backoff window
    /// and still under the retry ceiling.
    pub async fn find_due(&self, now: DateTime<Utc>, max_attempts: i32) -> DbResult<Vec<DbWebhookDelivery>> {
        let rows = sqlx::query_as::<_, DbWebhookDelivery>(
            r#"
            SELECT * FROM webhook_deliveries
            WHERE success = false
              AND attempt_count < $2
              AND (next_retry_at IS NULL OR next_retry_at <= $1)
            ORDER BY created_at ASC
            "#,
        )
        .bind(now)
        .bind(max_attempts)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn mark_delivered(&self, id: Uuid, status_code: i32, delivered_at: DateTime<Utc>) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE webhook_deliveries
            SET success = true, status_code = $2, delivered_at = $3, attempt_count = attempt_count + 1
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status_code)
        .bind(delivered_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn mark_retry(
        &self,
        id: Uuid,
        status_code: Option<i32>,
        next_retry_at: DateTime<Utc>,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE webhook_deliveries
            SET attempt_count = attempt_count + 1, status_code = $2, next_retry_at = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status_code)
        .bind(next_retry_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn mark_exhausted(&self, id: Uuid, status_code: Option<i32>) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE webhook_deliveries
            SET attempt_count = attempt_count + 1, status_code = $2, next_retry_at = NULL
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status_code)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
