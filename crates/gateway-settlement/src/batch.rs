//! Settlement batch engine (C10): daily batch cut, payout sweep, auto-void.
//!
//! Ordering (§5): [`SettlementEngine::cut_batches`] must run before
//! [`SettlementEngine::auto_void_expired`] within the same midnight tick so
//! a transaction captured moments before its authorization would have
//! expired is settled, not voided. The scheduler in [`crate::scheduler`]
//! enforces this by calling them in sequence, never concurrently.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use gateway_db::{DbSettlementBatch, DbTransaction, SettlementBatchRepo, TransactionEventRepo, TransactionRepo};
use gateway_engine::Clock;
use uuid::Uuid;

use crate::error::SettlementResult;

/// Settlement date is always two calendar days after the batch date (T+2).
pub const SETTLEMENT_LAG_DAYS: i64 = 2;

pub struct SettlementEngine {
    transactions: TransactionRepo,
    events: TransactionEventRepo,
    batches: SettlementBatchRepo,
    clock: Arc<dyn Clock>,
}

#[derive(Debug, Default)]
struct MerchantAggregate {
    gross_amount_mad: i64,
    refund_amount_mad: i64,
    fee_amount_mad: i64,
    txn_count: i32,
    refund_count: i32,
    currency_breakdown: BTreeMap<String, CurrencyTotals>,
    txn_ids: Vec<Uuid>,
}

#[derive(Debug, Default, serde::Serialize)]
struct CurrencyTotals {
    count: i64,
    gross_amount: i64,
}

impl SettlementEngine {
    pub fn new(transactions: TransactionRepo, events: TransactionEventRepo, batches: SettlementBatchRepo, clock: Arc<dyn Clock>) -> Self {
        Self {
            transactions,
            events,
            batches,
            clock,
        }
    }

    /// Cuts settlement batches for every merchant with captured or refund
    /// activity on `batch_date`. Each batch links its constituent
    /// transactions (`settlement_batch_id`, `status = settled`) inside its
    /// own atomic unit of work.
    pub async fn cut_batches(&self, batch_date: NaiveDate) -> SettlementResult<Vec<DbSettlementBatch>> {
        let captured = self.transactions.find_unbatched_captured(batch_date).await?;

        let mut by_merchant: BTreeMap<Uuid, MerchantAggregate> = BTreeMap::new();
        for txn in &captured {
            let agg = by_merchant.entry(txn.merchant_id).or_default();
            agg.gross_amount_mad += txn.amount_mad;
            agg.fee_amount_mad += txn.processing_fee;
            agg.txn_count += 1;
            agg.txn_ids.push(txn.id);
            let totals = agg.currency_breakdown.entry(txn.currency.clone()).or_default();
            totals.count += 1;
            totals.gross_amount += txn.amount;
        }

        let mut merchant_ids: HashSet<Uuid> = by_merchant.keys().copied().collect();
        merchant_ids.extend(self.transactions.find_merchants_with_refunds_in_window(batch_date).await?);

        for merchant_id in &merchant_ids {
            let agg = by_merchant.entry(*merchant_id).or_default();
            for refund in self.transactions.find_refunds_in_window(*merchant_id, batch_date).await? {
                agg.refund_amount_mad += refund.amount_mad.abs();
                agg.refund_count += 1;
            }
        }

        let settlement_date = batch_date + Duration::days(SETTLEMENT_LAG_DAYS);
        let mut created = Vec::with_capacity(by_merchant.len());

        for (merchant_id, agg) in by_merchant {
            let net_amount_mad = agg.gross_amount_mad - agg.refund_amount_mad - agg.fee_amount_mad;
            let breakdown = serde_json::to_value(&agg.currency_breakdown).unwrap_or(serde_json::json!({}));

            let batch = self
                .batches
                .create(
                    merchant_id,
                    batch_date,
                    agg.gross_amount_mad,
                    agg.refund_amount_mad,
                    agg.fee_amount_mad,
                    net_amount_mad,
                    agg.txn_count,
                    agg.refund_count,
                    breakdown,
                    settlement_date,
                )
                .await?;

            let mut tx = self.transactions.begin().await?;
            for txn_id in &agg.txn_ids {
                self.transactions.link_to_batch(&mut tx, *txn_id, batch.id).await?;
            }
            tx.commit().await.map_err(gateway_db::DbError::Query)?;

            created.push(batch);
        }

        Ok(created)
    }

    /// Payout sweep: batches due today move `pending → processing →
    /// settled|failed` based on the payout adapter's response. The adapter
    /// is out of scope (§4.7); a stub callback stands in for it so the
    /// engine's bookkeeping can be exercised without a real payout rail.
    pub async fn run_payouts<F>(&self, payout: F) -> SettlementResult<Vec<Uuid>>
    where
        F: Fn(&DbSettlementBatch) -> bool,
    {
        let today = self.clock.now().date_naive();
        let due = self.batches.find_due_for_payout(today).await?;
        let mut settled_ids = Vec::new();

        for batch in due {
            self.batches.mark_processing(batch.id).await?;
            if payout(&batch) {
                self.batches.mark_settled(batch.id, self.clock.now()).await?;
                settled_ids.push(batch.id);
            } else {
                self.batches.mark_failed(batch.id).await?;
            }
        }

        Ok(settled_ids)
    }

    /// Auto-void (§4.7, hourly): every `authorized` transaction past
    /// `expires_at` moves to `voided` with an event recording the reason.
    /// Never touches `captured` rows.
    pub async fn auto_void_expired(&self) -> SettlementResult<Vec<DbTransaction>> {
        let now = self.clock.now();
        let expired = self.transactions.find_expired_authorized(now).await?;
        let mut voided = Vec::with_capacity(expired.len());

        for txn in expired {
            let mut tx = self.transactions.begin().await?;
            let row = self.transactions.mark_voided(&mut tx, txn.id).await?;
            self.events
                .append(
                    &mut tx,
                    txn.id,
                    "voided",
                    Some("authorized"),
                    "voided",
                    None,
                    serde_json::json!({ "reason": "authorization expired" }),
                )
                .await?;
            tx.commit().await.map_err(gateway_db::DbError::Query)?;
            voided.push(row);
        }

        Ok(voided)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::PgPool;

    fn engine() -> SettlementEngine {
        let pool = PgPool::connect_lazy("postgres://localhost/nonexistent").unwrap();
        SettlementEngine::new(
            TransactionRepo::new(pool.clone()),
            TransactionEventRepo::new(pool.clone()),
            SettlementBatchRepo::new(pool),
            Arc::new(gateway_engine::SystemClock),
        )
    }

    #[test]
    fn settlement_lag_is_two_days() {
        assert_eq!(SETTLEMENT_LAG_DAYS, 2);
    }

    #[tokio::test]
    async fn cut_batches_against_unreachable_db_surfaces_db_error() {
        let engine = engine();
        let result = engine.cut_batches(Utc::now().date_naive()).await;
        assert!(result.is_err());
    }
}
