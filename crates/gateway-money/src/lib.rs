//! Money & FX (C1).
//!
//! All amounts are signed 64-bit integers in the currency's minor unit.
//! Conversion to the merchant settlement currency (MAD) goes through a
//! pluggable [`FxRateStore`] so this crate never touches a database
//! directly; `gateway-db` provides the persisted implementation and unit
//! tests use an in-memory one.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use gateway_types::Currency;
use rust_decimal::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MoneyError {
    #[error("unsupported currency")]
    UnsupportedCurrency,
    #[error("amount {0} out of bounds for currency {1}")]
    AmountOutOfBounds(i64, Currency),
    #[error("fx rate store error: {0}")]
    Store(String),
}

pub type MoneyResult<T> = Result<T, MoneyError>;

/// How stale a persisted FX snapshot may be before it must be refreshed.
pub const FX_SNAPSHOT_MAX_AGE: Duration = Duration::hours(1);

/// Default peg used when no fresh snapshot exists. These are fallback
/// values seeding a fresh deployment; real rates flow from the snapshot
/// store once refreshed by the background FX job.
fn default_rate_to_mad(currency: Currency) -> Decimal {
    match currency {
        Currency::Mad => Decimal::ONE,
        Currency::Usd => Decimal::new(10_000_000, 6), // 10.000000
        Currency::Eur => Decimal::new(10_800_000, 6), // 10.800000
    }
}

/// Persistence seam for FX snapshots. Implementations must round-trip a
/// rate with at least 6 fractional digits.
#[async_trait]
pub trait FxRateStore: Send + Sync {
    async fn latest_rate(&self, currency: Currency) -> MoneyResult<Option<(Decimal, DateTime<Utc>)>>;
    async fn store_rate(&self, currency: Currency, rate: Decimal, as_of: DateTime<Utc>) -> MoneyResult<()>;
}

/// In-memory [`FxRateStore`] for tests and fallback local runs.
#[derive(Default)]
pub struct InMemoryFxRateStore {
    inner: tokio::sync::Mutex<std::collections::HashMap<&'static str, (Decimal, DateTime<Utc>)>>,
}

#[async_trait]
impl FxRateStore for InMemoryFxRateStore {
    async fn latest_rate(&self, currency: Currency) -> MoneyResult<Option<(Decimal, DateTime<Utc>)>> {
        Ok(self.inner.lock().await.get(currency.code()).copied())
    }

    async fn store_rate(&self, currency: Currency, rate: Decimal, as_of: DateTime<Utc>) -> MoneyResult<()> {
        self.inner.lock().await.insert(currency.code(), (rate, as_of));
        Ok(())
    }
}

/// Validate that `amount` is within the currency-specific authorize bounds.
pub fn validate_amount(amount: i64, currency: Currency) -> MoneyResult<()> {
    if currency.is_within_bounds(amount) {
        Ok(())
    } else {
        Err(MoneyError::AmountOutOfBounds(amount, currency))
    }
}

/// `convert_to_mad(amount, currency) -> (amount_mad, rate)`.
///
/// Returns `(amount, 1.0)` for MAD. Otherwise looks up the freshest
/// snapshot no older than [`FX_SNAPSHOT_MAX_AGE`]; if none exists, falls
/// back to the built-in default and persists it as a new snapshot.
pub async fn convert_to_mad(
    store: &dyn FxRateStore,
    amount: i64,
    currency: Currency,
    now: DateTime<Utc>,
) -> MoneyResult<(i64, Decimal)> {
    if currency == Currency::Mad {
        return Ok((amount, Decimal::ONE));
    }

    let rate = match store.latest_rate(currency).await? {
        Some((rate, as_of)) if now - as_of <= FX_SNAPSHOT_MAX_AGE => rate,
        _ => {
            let rate = default_rate_to_mad(currency);
            store.store_rate(currency, rate, now).await?;
            rate
        }
    };

    let amount_mad = apply_rate_half_to_even(amount, rate);
    Ok((amount_mad, rate))
}

/// `processing_fee(amount_mad) -> fee_mad`: fixed 300 minor units plus
/// `floor(amount_mad * 0.029)`.
pub fn processing_fee(amount_mad: i64) -> i64 {
    const BASE_FEE_MAD: i64 = 300;
    let variable = Decimal::from(amount_mad) * Decimal::new(29, 3);
    let variable = variable.floor().to_i64().unwrap_or(0);
    BASE_FEE_MAD + variable
}

/// `convert_back(amount_mad, original_currency, frozen_rate) -> amount_original`.
///
/// Reuses the frozen rate stamped on the transaction at authorize time so
/// refund display never drifts against a later FX snapshot.
pub fn convert_back(amount_mad: i64, original_currency: Currency, frozen_rate: Decimal) -> i64 {
    if original_currency == Currency::Mad {
        return amount_mad;
    }
    let amount = Decimal::from(amount_mad) / frozen_rate;
    amount
        .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
        .to_i64()
        .unwrap_or(0)
}

fn apply_rate_half_to_even(amount: i64, rate: Decimal) -> i64 {
    let product = Decimal::from(amount) * rate;
    product
        .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
        .to_i64()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mad_to_mad_is_identity() {
        let store = InMemoryFxRateStore::default();
        let (amount_mad, rate) = convert_to_mad(&store, 10_000, Currency::Mad, Utc::now())
            .await
            .unwrap();
        assert_eq!(amount_mad, 10_000);
        assert_eq!(rate, Decimal::ONE);
    }

    #[tokio::test]
    async fn usd_conversion_uses_default_rate_and_persists_snapshot() {
        let store = InMemoryFxRateStore::default();
        let now = Utc::now();
        let (amount_mad, rate) = convert_to_mad(&store, 10_000, Currency::Usd, now).await.unwrap();
        assert_eq!(rate, Decimal::new(10_000_000, 6));
        assert_eq!(amount_mad, 100_000);

        let (cached_rate, as_of) = store.latest_rate(Currency::Usd).await.unwrap().unwrap();
        assert_eq!(cached_rate, rate);
        assert_eq!(as_of, now);
    }

    #[tokio::test]
    async fn stale_snapshot_is_refreshed() {
        let store = InMemoryFxRateStore::default();
        let old = Utc::now() - Duration::hours(2);
        store.store_rate(Currency::Eur, Decimal::new(11_000_000, 6), old).await.unwrap();

        let now = Utc::now();
        let (_, rate) = convert_to_mad(&store, 10_000, Currency::Eur, now).await.unwrap();
        // stale snapshot discarded, falls back to the built-in default
        assert_eq!(rate, Decimal::new(10_800_000, 6));
    }

    #[test]
    fn processing_fee_matches_worked_scenario() {
        // scenario 1: amount_mad = 100000 -> fee = 300 + floor(100000*0.029) = 300 + 2900
        assert_eq!(processing_fee(100_000), 3_200);
    }

    #[test]
    fn convert_back_round_trips_within_one_minor_unit() {
        let rate = Decimal::new(10_000_000, 6);
        let amount_mad = apply_rate_half_to_even(10_000, rate);
        let back = convert_back(amount_mad, Currency::Usd, rate);
        assert!((back - 10_000).abs() <= 1);
    }

    #[test]
    fn amount_bounds_validate() {
        assert!(validate_amount(500, Currency::Usd).is_ok());
        assert!(validate_amount(499, Currency::Usd).is_err());
        assert!(validate_amount(5_000, Currency::Mad).is_ok());
    }
}
