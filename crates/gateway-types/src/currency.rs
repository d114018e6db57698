//! Currency types for the payment gateway.
//!
//! All amounts are integers in the currency's minor unit. The gateway only
//! accepts the three currencies below; MAD is the merchant settlement
//! currency and the only one with no FX conversion applied to itself.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported transaction currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Eur,
    Mad,
}

impl Currency {
    /// ISO 4217 code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Mad => "MAD",
        }
    }

    /// Parse from an ISO 4217 code, case-insensitive.
    pub fn parse(code: &str) -> Option<Self> {
        match code.to_ascii_uppercase().as_str() {
            "USD" => Some(Self::Usd),
            "EUR" => Some(Self::Eur),
            "MAD" => Some(Self::Mad),
            _ => None,
        }
    }

    /// Minor-unit bounds for an `authorize` amount in this currency.
    ///
    /// USD/EUR: 500 <= amount <= 2,500,000. MAD: 5,000 <= amount <= 25,000,000.
    pub fn amount_bounds(&self) -> (i64, i64) {
        match self {
            Self::Usd | Self::Eur => (500, 2_500_000),
            Self::Mad => (5_000, 25_000_000),
        }
    }

    pub fn is_within_bounds(&self, amount: i64) -> bool {
        let (min, max) = self.amount_bounds();
        amount >= min && amount <= max
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_code() {
        for c in [Currency::Usd, Currency::Eur, Currency::Mad] {
            assert_eq!(Currency::parse(c.code()), Some(c));
        }
    }

    #[test]
    fn bounds_reject_small_amounts() {
        assert!(!Currency::Usd.is_within_bounds(499));
        assert!(Currency::Usd.is_within_bounds(500));
        assert!(Currency::Usd.is_within_bounds(2_500_000));
        assert!(!Currency::Usd.is_within_bounds(2_500_001));
    }

    #[test]
    fn mad_has_wider_bounds() {
        assert!(Currency::Mad.is_within_bounds(5_000));
        assert!(!Currency::Mad.is_within_bounds(4_999));
    }
}
