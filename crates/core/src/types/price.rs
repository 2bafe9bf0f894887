//! Type-safe price representation using decimal arithmetic.

use core::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when parsing a [`Price`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceError {
    /// The input does not start with a known currency symbol.
    #[error("unknown currency in {0:?}")]
    UnknownCurrency(String),
    /// The amount is not a valid decimal.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    /// The amount is negative.
    #[error("price cannot be negative")]
    Negative,
}

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (reais, not centavos).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// A whole-real amount in Brazilian reais.
    #[must_use]
    pub fn brl(reais: i64) -> Self {
        Self::new(Decimal::from(reais), CurrencyCode::BRL)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            self.currency_code.symbol(),
            self.amount.normalize()
        )
    }
}

impl FromStr for Price {
    type Err = PriceError;

    /// Parses the display form, e.g. `R$ 3500` or `€ 19.90`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (currency_code, rest) = CurrencyCode::ALL
            .iter()
            .find_map(|code| s.strip_prefix(code.symbol()).map(|rest| (*code, rest)))
            .ok_or_else(|| PriceError::UnknownCurrency(s.to_string()))?;

        let amount = Decimal::from_str(rest.trim())
            .map_err(|e| PriceError::InvalidAmount(e.to_string()))?;
        if amount.is_sign_negative() {
            return Err(PriceError::Negative);
        }

        Ok(Self::new(amount, currency_code))
    }
}

/// ISO 4217 currency codes accepted by the agency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    BRL,
    USD,
    EUR,
}

impl CurrencyCode {
    /// Every supported currency, in symbol-matching order.
    pub const ALL: [Self; 3] = [Self::BRL, Self::USD, Self::EUR];

    /// Display symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::BRL => "R$",
            Self::USD => "US$",
            Self::EUR => "€",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_brl() {
        assert_eq!(Price::brl(3500).to_string(), "R$ 3500");
        let cents = Price::new(Decimal::new(199_990, 2), CurrencyCode::BRL);
        assert_eq!(cents.to_string(), "R$ 1999.9");
    }

    #[test]
    fn test_parse_display_form() {
        let price: Price = "R$ 4800".parse().unwrap();
        assert_eq!(price, Price::brl(4800));

        let euro: Price = "€ 19.90".parse().unwrap();
        assert_eq!(euro.currency_code, CurrencyCode::EUR);
        assert_eq!(euro.amount, Decimal::new(1990, 2));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            "3500".parse::<Price>(),
            Err(PriceError::UnknownCurrency(_))
        ));
        assert!(matches!(
            "R$ abc".parse::<Price>(),
            Err(PriceError::InvalidAmount(_))
        ));
        assert_eq!("R$ -1".parse::<Price>(), Err(PriceError::Negative));
    }

    #[test]
    fn test_prices_compare_by_amount() {
        assert!(Price::brl(1800).amount < Price::brl(2000).amount);
    }
}
