//! FX rate snapshot store (C1), backing [`gateway_money::FxRateStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gateway_money::{FxRateStore, MoneyError, MoneyResult};
use gateway_types::Currency;
use rust_decimal::Decimal;
use sqlx::PgPool;

pub struct FxRateRepo {
    pool: PgPool,
}

impl FxRateRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FxRateStore for FxRateRepo {
    async fn latest_rate(&self, currency: Currency) -> MoneyResult<Option<(Decimal, DateTime<Utc>)>> {
        let row: Option<(Decimal, DateTime<Utc>)> = sqlx::query_as(
            "SELECT rate, as_of FROM fx_rate_snapshots WHERE currency = $1",
        )
        .bind(currency.code())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| MoneyError::Store(e.to_string()))?;

        Ok(row)
    }

    async fn store_rate(&self, currency: Currency, rate: Decimal, as_of: DateTime<Utc>) -> MoneyResult<()> {
        sqlx::query(
            r#"
            INSERT INTO fx_rate_snapshots (currency, rate, as_of)
            VALUES ($1, $2, $3)
            ON CONFLICT (currency) DO UPDATE SET rate = EXCLUDED.rate, as_of = EXCLUDED.as_of
            "#,
        )
        .bind(currency.code())
        .bind(rate)
        .bind(as_of)
        .execute(&self.pool)
        .await
        .map_err(|e| MoneyError::Store(e.to_string()))?;

        Ok(())
    }
}
