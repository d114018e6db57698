//! Transaction repository (C5).
//!
//! Every method that mutates a row takes an open `sqlx::Transaction` so the
//! caller (the engine) can fold the entity update, event append, and audit
//! insert into one atomic unit of work. Row-level serialization for
//! capture/void/refund is `SELECT ... FOR UPDATE` inside that same
//! transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{DbError, DbResult, DbTransaction};

pub struct TransactionRepo {
    pool: PgPool,
}

impl TransactionRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn begin(&self) -> DbResult<Transaction<'_, Postgres>> {
        Ok(self.pool.begin().await?)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        merchant_id: Uuid,
        parent_id: Option<Uuid>,
        idempotency_key: Option<&str>,
        txn_type: &str,
        status: &str,
        amount: i64,
        currency: &str,
        amount_mad: i64,
        fx_rate: Decimal,
        card_token: Option<&str>,
        card_brand: Option<&str>,
        card_last4: Option<&str>,
        auth_code: Option<&str>,
        response_code: Option<&str>,
        response_message: Option<&str>,
        avs: Option<&str>,
        cvv_result: Option<&str>,
        fraud_score: i32,
        processing_fee: i64,
        net_amount: i64,
        authorized_at: Option<DateTime<Utc>>,
        expires_at: Option<DateTime<Utc>>,
    ) -> DbResult<DbTransaction> {
        let row = sqlx::query_as::<_, DbTransaction>(
            r#"
            INSERT INTO transactions (
                merchant_id, parent_id, idempotency_key, type, status, amount, currency,
                amount_mad, fx_rate, card_token, card_brand, card_last4,
                auth_code, response_code, response_message, avs, cvv_result, fraud_score,
                captured_amount, refunded_amount, processing_fee, net_amount,
                authorized_at, expires_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, 0, 0, $19, $20, $21, $22
            )
            RETURNING *
            "#,
        )
        .bind(merchant_id)
        .bind(parent_id)
        .bind(idempotency_key)
        .bind(txn_type)
        .bind(status)
        .bind(amount)
        .bind(currency)
        .bind(amount_mad)
        .bind(fx_rate)
        .bind(card_token)
        .bind(card_brand)
        .bind(card_last4)
        .bind(auth_code)
        .bind(response_code)
        .bind(response_message)
        .bind(avs)
        .bind(cvv_result)
        .bind(fraud_score)
        .bind(processing_fee)
        .bind(net_amount)
        .bind(authorized_at)
        .bind(expires_at)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.constraint() == Some("transactions_merchant_idempotency_key_key") {
                    return DbError::IdempotencyConflict;
                }
            }
            DbError::Query(e)
        })?;

        Ok(row)
    }

    pub async fn find_by_id(&self, id: Uuid, merchant_id: Uuid) -> DbResult<Option<DbTransaction>> {
        let row = sqlx::query_as::<_, DbTransaction>(
            "SELECT * FROM transactions WHERE id = $1 AND merchant_id = $2",
        )
        .bind(id)
        .bind(merchant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn require_by_id(&self, id: Uuid, merchant_id: Uuid) -> DbResult<DbTransaction> {
        self.find_by_id(id, merchant_id)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("transaction {id}")))
    }

    /// Locks the row for the duration of the caller's transaction, so
    /// concurrent capture/void/refund against the same id serialize.
    pub async fn find_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        merchant_id: Uuid,
    ) -> DbResult<Option<DbTransaction>> {
        let row = sqlx::query_as::<_, DbTransaction>(
            "SELECT * FROM transactions WHERE id = $1 AND merchant_id = $2 FOR UPDATE",
        )
        .bind(id)
        .bind(merchant_id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(row)
    }

    pub async fn find_by_idempotency_key(
        &self,
        merchant_id: Uuid,
        idempotency_key: &str,
    ) -> DbResult<Option<DbTransaction>> {
        let row = sqlx::query_as::<_, DbTransaction>(
            "SELECT * FROM transactions WHERE merchant_id = $1 AND idempotency_key = $2",
        )
        .bind(merchant_id)
        .bind(idempotency_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn mark_captured(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        captured_amount: i64,
        auth_code: Option<&str>,
        response_code: Option<&str>,
    ) -> DbResult<DbTransaction> {
        let row = sqlx::query_as::<_, DbTransaction>(
            r#"
            UPDATE transactions
            SET status = 'captured', captured_amount = $2, captured_at = now(),
                auth_code = COALESCE($3, auth_code), response_code = COALESCE($4, response_code),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(captured_amount)
        .bind(auth_code)
        .bind(response_code)
        .fetch_one(&mut **tx)
        .await?;

        Ok(row)
    }

    pub async fn mark_voided(&self, tx: &mut Transaction<'_, Postgres>, id: Uuid) -> DbResult<DbTransaction> {
        let row = sqlx::query_as::<_, DbTransaction>(
            "UPDATE transactions SET status = 'voided', voided_at = now(), updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(row)
    }

    /// Increments the parent's `refunded_amount` and sets its status to
    /// `refunded` once `refunded_amount = captured_amount`, else
    /// `partially_refunded`.
    pub async fn apply_refund_to_parent(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        refund_amount: i64,
    ) -> DbResult<DbTransaction> {
        let row = sqlx::query_as::<_, DbTransaction>(
            r#"
            UPDATE transactions
            SET refunded_amount = refunded_amount + $2,
                refunded_at = now(),
                status = CASE
                    WHEN refunded_amount + $2 >= captured_amount THEN 'refunded'
                    ELSE 'partially_refunded'
                END,
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(refund_amount)
        .fetch_one(&mut **tx)
        .await?;

        Ok(row)
    }

    pub async fn link_to_batch(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        batch_id: Uuid,
    ) -> DbResult<()> {
        sqlx::query(
            "UPDATE transactions SET settlement_batch_id = $2, status = 'settled', settled_at = now(), updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(batch_id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Captured transactions from `batch_date` (UTC calendar day) not yet
    /// assigned to a batch, grouped implicitly by the caller iterating per
    /// merchant.
    pub async fn find_unbatched_captured(
        &self,
        batch_date: chrono::NaiveDate,
    ) -> DbResult<Vec<DbTransaction>> {
        let rows = sqlx::query_as::<_, DbTransaction>(
            r#"
            SELECT * FROM transactions
            WHERE status = 'captured'
              AND settlement_batch_id IS NULL
              AND captured_at >= $1::date
              AND captured_at < ($1::date + INTERVAL '1 day')
            ORDER BY merchant_id, captured_at
            "#,
        )
        .bind(batch_date)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Refund children whose `refunded_at` falls within `batch_date`,
    /// scoped to parents captured in that same window (used for the
    /// gross/refund aggregation during batch cut).
    pub async fn find_refunds_in_window(
        &self,
        merchant_id: Uuid,
        batch_date: chrono::NaiveDate,
    ) -> DbResult<Vec<DbTransaction>> {
        let rows = sqlx::query_as::<_, DbTransaction>(
            r#"
            SELECT * FROM transactions
            WHERE merchant_id = $1
              AND type = 'refund'
              AND refunded_at >= $2::date
              AND refunded_at < ($2::date + INTERVAL '1 day')
            "#,
        )
        .bind(merchant_id)
        .bind(batch_date)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Distinct merchants with a refund in `batch_date`, including ones with
    /// no captured activity that day (refund-only merchant-days still get a
    /// settlement batch).
    pub async fn find_merchants_with_refunds_in_window(&self, batch_date: chrono::NaiveDate) -> DbResult<Vec<Uuid>> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT DISTINCT merchant_id FROM transactions
            WHERE type = 'refund'
              AND refunded_at >= $1::date
              AND refunded_at < ($1::date + INTERVAL '1 day')
            "#,
        )
        .bind(batch_date)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn find_expired_authorized(&self, now: DateTime<Utc>) -> DbResult<Vec<DbTransaction>> {
        let rows = sqlx::query_as::<_, DbTransaction>(
            "SELECT * FROM transactions WHERE status = 'authorized' AND expires_at < $1",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn list_for_merchant(&self, merchant_id: Uuid, limit: i64, offset: i64) -> DbResult<Vec<DbTransaction>> {
        let rows = sqlx::query_as::<_, DbTransaction>(
            "SELECT * FROM transactions WHERE merchant_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(merchant_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
