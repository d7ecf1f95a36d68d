//! Unit prices and cart totals using decimal arithmetic.
//!
//! Prices are read from the text printed on a product card (e.g. `"$49.99"`).
//! Text that does not parse is kept as [`Price::NotANumber`] rather than
//! rejected, and poisons every total it takes part in, so a broken card shows
//! up as `NaN` in the cart total instead of silently disappearing.

use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// A non-negative unit price or line total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Price {
    /// A decimal amount in the currency's standard unit (dollars, not cents).
    Amount(Decimal),
    /// Price text that could not be read as a number.
    NotANumber,
}

impl Price {
    /// A zero amount, the total of an empty cart.
    pub const ZERO: Self = Self::Amount(Decimal::ZERO);

    /// Create a price from a decimal amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self::Amount(amount)
    }

    /// Parse display text such as `"$49.99"`.
    ///
    /// One leading currency symbol and surrounding whitespace are stripped.
    /// Anything that is not a non-negative decimal afterwards yields
    /// [`Price::NotANumber`].
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        let number = trimmed
            .strip_prefix(|c: char| !(c.is_ascii_digit() || matches!(c, '.' | '-' | '+')))
            .unwrap_or(trimmed)
            .trim_start();

        match Decimal::from_str(number) {
            Ok(amount) if !amount.is_sign_negative() => Self::Amount(amount),
            _ => Self::NotANumber,
        }
    }

    /// The decimal amount, if this price is a number.
    #[must_use]
    pub const fn amount(&self) -> Option<Decimal> {
        match self {
            Self::Amount(amount) => Some(*amount),
            Self::NotANumber => None,
        }
    }

    /// Whether this price came from unreadable text.
    #[must_use]
    pub const fn is_nan(&self) -> bool {
        matches!(self, Self::NotANumber)
    }

    /// The price of `quantity` units.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        match self {
            Self::Amount(amount) => amount
                .checked_mul(Decimal::from(quantity))
                .map_or(Self::NotANumber, Self::Amount),
            Self::NotANumber => Self::NotANumber,
        }
    }
}

impl Default for Price {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self::Amount(amount)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        match (self, rhs) {
            (Self::Amount(a), Self::Amount(b)) => {
                a.checked_add(b).map_or(Self::NotANumber, Self::Amount)
            }
            _ => Self::NotANumber,
        }
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

/// Formats with exactly two decimal places, or `NaN`.
impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Amount(amount) => {
                let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
                write!(f, "{rounded:.2}")
            }
            Self::NotANumber => f.write_str("NaN"),
        }
    }
}

// Persisted as a plain JSON number; unreadable prices persist as `null`.
impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.amount().and_then(|amount| amount.to_f64()) {
            Some(value) => serializer.serialize_f64(value),
            None => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let Some(value) = Option::<f64>::deserialize(deserializer)? else {
            return Ok(Self::NotANumber);
        };

        // f64's Display is the shortest representation that round-trips,
        // so 49.99 comes back as exactly 49.99.
        let amount = Decimal::from_str(&value.to_string()).map_err(de::Error::custom)?;
        if amount.is_sign_negative() {
            return Err(de::Error::custom(format!("negative price: {amount}")));
        }
        Ok(Self::Amount(amount))
    }
}
