//! Prices, stored as integer cents.
//!
//! Providers report prices as decimals with arbitrary precision (`28.989`),
//! sometimes in cents (`1234`). The catalog keeps two decimals, so every
//! price is normalized through [`Price::from_decimal`] (half-up rounding)
//! before it is compared or written. Comparing normalized values is what keeps
//! an unchanged `28.989` from looking like a price change against the stored
//! `28.99` on every run.

use std::{fmt, str::FromStr};

use bigdecimal::{BigDecimal, RoundingMode};
use num_traits::{Signed, ToPrimitive};
use thiserror::Error;

/// Reasons a decimal cannot be turned into a [`Price`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PriceError {
    /// Negative amounts are never valid prices.
    #[error("negative price: {0}")]
    Negative(String),
    /// The amount does not fit the cents column.
    #[error("price out of range: {0}")]
    OutOfRange(String),
    /// Not a decimal number.
    #[error("not a decimal price: {0:?}")]
    Unparseable(String),
}

/// Integer digits of the largest euro amount whose cents fit an `i64`.
const MAX_INTEGER_DIGITS: i64 = 17;

/// A non-negative amount in euro cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price(i64);

impl Price {
    /// Zero.
    pub const ZERO: Price = Price(0);

    /// Wraps a cents amount read back from the catalog.
    pub fn from_cents(cents: i64) -> Result<Self, PriceError> {
        if cents < 0 {
            return Err(PriceError::Negative(cents.to_string()));
        }
        Ok(Price(cents))
    }

    /// Rounds a decimal amount (in euros) to cents, half-up.
    pub fn from_decimal(amount: &BigDecimal) -> Result<Self, PriceError> {
        // Rescaling (and even printing) costs a power of ten as large as the
        // exponent, so bound the magnitude from the digit count first.
        let (_, scale) = amount.as_bigint_and_exponent();
        let integer_digits = i64::try_from(amount.digits())
            .unwrap_or(i64::MAX)
            .saturating_sub(scale);
        if integer_digits > MAX_INTEGER_DIGITS {
            return Err(PriceError::OutOfRange(format!(
                "{integer_digits} integer digits"
            )));
        }
        if amount.is_negative() {
            return Err(PriceError::Negative(amount.to_string()));
        }
        if integer_digits < -2 {
            return Ok(Price::ZERO);
        }
        let cents = (amount.with_scale_round(2, RoundingMode::HalfUp) * BigDecimal::from(100))
            .to_i64()
            .ok_or_else(|| PriceError::OutOfRange(amount.to_string()))?;
        Ok(Price(cents))
    }

    /// Interprets an amount already expressed in cents (`1234` -> `12.34`).
    pub fn from_decimal_cents(amount: &BigDecimal) -> Result<Self, PriceError> {
        let (digits, scale) = amount.as_bigint_and_exponent();
        Self::from_decimal(&BigDecimal::new(digits, scale.saturating_add(2)))
    }

    /// Amount in cents.
    pub fn cents(self) -> i64 {
        self.0
    }

    /// True for a zero amount. A zero provider price means "no price".
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Amount in euros, scale 2.
    pub fn to_decimal(self) -> BigDecimal {
        BigDecimal::new(self.0.into(), 2)
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let d = BigDecimal::from_str(s.trim()).map_err(|_| PriceError::Unparseable(s.to_string()))?;
        Price::from_decimal(&d)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl serde::Serialize for Price {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
