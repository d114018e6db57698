//! Append-only transaction event log. Events are the authoritative history
//! of a transaction and are never mutated after insert.

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{DbResult, DbTransactionEvent};

pub struct TransactionEventRepo {
    pool: PgPool,
}

impl TransactionEventRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn append(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        transaction_id: Uuid,
        event_type: &str,
        old_status: Option<&str>,
        new_status: &str,
        amount: Option<i64>,
        metadata: serde_json::Value,
    ) -> DbResult<DbTransactionEvent> {
        let row = sqlx::query_as::<_, DbTransactionEvent>(
            r#"
            INSERT INTO transaction_events (transaction_id, event_type, old_status, new_status, amount, metadata)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(transaction_id)
        .bind(event_type)
        .bind(old_status)
        .bind(new_status)
        .bind(amount)
        .bind(metadata)
        .fetch_one(&mut **tx)
        .await?;

        Ok(row)
    }

    /// Ordered strictly by `created_at`, tie-broken on insertion sequence.
    pub async fn list_for_transaction(&self, transaction_id: Uuid) -> DbResult<Vec<DbTransactionEvent>> {
        let rows = sqlx::query_as::<_, DbTransactionEvent>(
            "SELECT * FROM transaction_events WHERE transaction_id = $1 ORDER BY created_at ASC, seq ASC",
        )
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
