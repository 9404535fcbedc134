//! # Money Types
//!
//! Exact decimal amounts and the currencies the gateway accepts.
//! Amounts never pass through floating point.

use crate::error::{CommerceError, CommerceResult};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Supported currencies (ISO 4217), all with two minor-unit digits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    INR,
    USD,
    EUR,
    GBP,
    AUD,
    CAD,
    SGD,
}

impl Currency {
    /// Returns the ISO 4217 currency code
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::INR => "INR",
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::AUD => "AUD",
            Currency::CAD => "CAD",
            Currency::SGD => "SGD",
        }
    }

    /// Parse a currency code, case-insensitively
    pub fn parse(code: &str) -> CommerceResult<Self> {
        match code.to_ascii_uppercase().as_str() {
            "INR" => Ok(Currency::INR),
            "USD" => Ok(Currency::USD),
            "EUR" => Ok(Currency::EUR),
            "GBP" => Ok(Currency::GBP),
            "AUD" => Ok(Currency::AUD),
            "CAD" => Ok(Currency::CAD),
            "SGD" => Ok(Currency::SGD),
            other => Err(CommerceError::InvalidRequest(format!(
                "unsupported currency: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exact decimal money amount (major units, e.g. rupees)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// `self * quantity`, exact; `InvalidState` if the product overflows
    pub fn times(&self, quantity: u32) -> CommerceResult<Amount> {
        self.0
            .checked_mul(Decimal::from(quantity))
            .map(Amount)
            .ok_or_else(|| {
                CommerceError::InvalidState(format!("{} x {} is out of range", self.0, quantity))
            })
    }

    /// `self + rhs`; `InvalidState` if the sum overflows
    pub fn checked_add(&self, rhs: Amount) -> CommerceResult<Amount> {
        self.0.checked_add(rhs.0).map(Amount).ok_or_else(|| {
            CommerceError::InvalidState(format!("{} + {} is out of range", self.0, rhs.0))
        })
    }

    /// Sum amounts left to right
    pub fn sum<I>(amounts: I) -> CommerceResult<Amount>
    where
        I: IntoIterator<Item = CommerceResult<Amount>>,
    {
        amounts
            .into_iter()
            .try_fold(Amount::ZERO, |acc, amount| acc.checked_add(amount?))
    }

    /// Convert to the gateway's smallest currency unit: multiply by 100 and
    /// truncate toward zero.
    pub fn to_minor_units(&self) -> CommerceResult<i64> {
        let out_of_range =
            || CommerceError::InvalidRequest(format!("amount {} is out of range", self.0));
        let minor = self
            .0
            .checked_mul(Decimal::ONE_HUNDRED)
            .ok_or_else(out_of_range)?
            .trunc();
        if minor.is_sign_negative() && !minor.is_zero() {
            return Err(CommerceError::InvalidRequest(
                "amount cannot be negative".to_string(),
            ));
        }
        minor.to_i64().ok_or_else(out_of_range)
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_minor_units_truncate() {
        assert_eq!(Amount::new(dec!(25.00)).to_minor_units().unwrap(), 2500);
        assert_eq!(Amount::new(dec!(10.999)).to_minor_units().unwrap(), 1099);
        assert_eq!(Amount::new(dec!(0.001)).to_minor_units().unwrap(), 0);
    }

    #[test]
    fn test_negative_amount_rejected() {
        let err = Amount::new(dec!(-1.00)).to_minor_units().unwrap_err();
        assert!(matches!(err, CommerceError::InvalidRequest(_)));
    }

    #[test]
    fn test_sum_is_exact() {
        let total = Amount::sum([dec!(0.1), dec!(0.2)].map(|v| Ok(Amount::new(v)))).unwrap();
        assert_eq!(total, Amount::new(dec!(0.3)));
        assert_eq!(Amount::new(dec!(10.00)).times(2).unwrap(), Amount::new(dec!(20.00)));
    }

    #[test]
    fn test_overflow_is_invalid_state() {
        let huge = Amount::new(Decimal::MAX);

        let err = huge.times(u32::MAX).unwrap_err();
        assert!(matches!(err, CommerceError::InvalidState(_)));

        let err = huge.checked_add(Amount::new(dec!(1))).unwrap_err();
        assert!(matches!(err, CommerceError::InvalidState(_)));

        let err = Amount::sum([Ok(huge), Ok(huge)]).unwrap_err();
        assert!(matches!(err, CommerceError::InvalidState(_)));

        let err = huge.to_minor_units().unwrap_err();
        assert!(matches!(err, CommerceError::InvalidRequest(_)));
    }

    #[test]
    fn test_sub_cent_amounts_differ() {
        assert_ne!(Amount::new(dec!(25.00)), Amount::new(dec!(25.001)));
        assert_eq!(Amount::new(dec!(25.0)), Amount::new(dec!(25.00)));
    }

    #[test]
    fn test_currency_parse() {
        assert_eq!(Currency::parse("inr").unwrap(), Currency::INR);
        assert!(Currency::parse("JPY").is_err());
        assert_eq!(Currency::USD.to_string(), "USD");
    }
}
