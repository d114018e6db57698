//! Settlement batch repository (C10).

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{DbResult, DbSettlementBatch};

pub struct SettlementBatchRepo {
    pool: PgPool,
}

impl SettlementBatchRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        merchant_id: Uuid,
        batch_date: NaiveDate,
        gross_amount_mad: i64,
        refund_amount_mad: i64,
        fee_amount_mad: i64,
        net_amount_mad: i64,
        txn_count: i32,
        refund_count: i32,
        currency_breakdown: serde_json::Value,
        settlement_date: NaiveDate,
    ) -> DbResult<DbSettlementBatch> {
        let row = sqlx::query_as::<_, DbSettlementBatch>(
            r#"
            INSERT INTO settlement_batches (
                merchant_id, batch_date, gross_amount_mad, refund_amount_mad, fee_amount_mad,
                net_amount_mad, txn_count, refund_count, currency_breakdown, status, settlement_date
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'pending', $10)
            RETURNING *
            "#,
        )
        .bind(merchant_id)
        .bind(batch_date)
        .bind(gross_amount_mad)
        .bind(refund_amount_mad)
        .bind(fee_amount_mad)
        .bind(net_amount_mad)
        .bind(txn_count)
        .bind(refund_count)
        .bind(currency_breakdown)
        .bind(settlement_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn find_due_for_payout(&self, today: NaiveDate) -> DbResult<Vec<DbSettlementBatch>> {
        let rows = sqlx::query_as::<_, DbSettlementBatch>(
            "SELECT * FROM settlement_batches WHERE status = 'pending' AND settlement_date <= $1",
        )
        .bind(today)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn mark_processing(&self, id: Uuid) -> DbResult<()> {
        sqlx::query("UPDATE settlement_batches SET status = 'processing' WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn mark_settled(&self, id: Uuid, settled_at: DateTime<Utc>) -> DbResult<()> {
        sqlx::query("UPDATE settlement_batches SET status = 'settled', settled_at = $2 WHERE id = $1")
            .bind(id)
            .bind(settled_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn mark_failed(&self, id: Uuid) -> DbResult<()> {
        sqlx::query("UPDATE settlement_batches SET status = 'failed' WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
