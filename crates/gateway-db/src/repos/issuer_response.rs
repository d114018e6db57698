//! Append-only issuer call audit (per spec.md: written before the engine
//! acts on the result, so reconciliation can detect orphans after a
//! database failure following a successful issuer call).

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{DbIssuerResponse, DbResult};

pub struct IssuerResponseRepo {
    pool: PgPool,
}

impl IssuerResponseRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn record(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        transaction_id: Uuid,
        raw_request: serde_json::Value,
        raw_response: serde_json::Value,
        processing_time_ms: i32,
        result_code: &str,
    ) -> DbResult<DbIssuerResponse> {
        let row = sqlx::query_as::<_, DbIssuerResponse>(
            r#"
            INSERT INTO issuer_responses (transaction_id, raw_request, raw_response, processing_time_ms, result_code)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(transaction_id)
        .bind(raw_request)
        .bind(raw_response)
        .bind(processing_time_ms)
        .bind(result_code)
        .fetch_one(&mut **tx)
        .await?;

        Ok(row)
    }

    /// Same as [`record`] but against a plain pool connection, for audit
    /// writes that must survive even when the enclosing engine transaction
    /// later rolls back (e.g. a database failure after a successful issuer
    /// call).
    pub async fn record_standalone(
        &self,
        transaction_id: Uuid,
        raw_request: serde_json::Value,
        raw_response: serde_json::Value,
        processing_time_ms: i32,
        result_code: &str,
    ) -> DbResult<DbIssuerResponse> {
        let row = sqlx::query_as::<_, DbIssuerResponse>(
            r#"
            INSERT INTO issuer_responses (transaction_id, raw_request, raw_response, processing_time_ms, result_code)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(transaction_id)
        .bind(raw_request)
        .bind(raw_response)
        .bind(processing_time_ms)
        .bind(result_code)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }
}
