//! Money type for representing monetary values.
//!
//! Uses an integer count of the lowest currency unit to avoid the
//! floating-point precision issues that plague monetary calculations.
//! The storefront trades in a single currency, so no currency tag is carried.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A monetary value in the lowest currency unit.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Create a new Money value from minor units.
    pub const fn new(amount: i64) -> Self {
        Self(amount)
    }

    /// A zero amount.
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Amount in minor units.
    pub const fn amount(&self) -> i64 {
        self.0
    }

    /// Check if this is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Check if this is negative.
    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Add another Money value, returning None on overflow.
    pub fn try_add(&self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Subtract another Money value, returning None on overflow.
    pub fn try_subtract(&self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }

    /// Subtract, flooring the result at zero.
    pub fn subtract_floor_zero(&self, other: Money) -> Money {
        Money(self.0.saturating_sub(other.0).max(0))
    }

    /// Multiply by a quantity, returning None on overflow.
    pub fn try_multiply(&self, factor: i64) -> Option<Money> {
        self.0.checked_mul(factor).map(Money)
    }

    /// Calculate a percentage of this amount, rounding half up.
    ///
    /// Returns None if the result does not fit.
    pub fn percentage(&self, percent: Percentage) -> Option<Money> {
        let scaled = i128::from(self.0) * i128::from(percent.basis_points());
        let half = i128::from(Percentage::SCALE / 2);
        let rounded = if scaled >= 0 {
            (scaled + half) / i128::from(Percentage::SCALE)
        } else {
            (scaled - half) / i128::from(Percentage::SCALE)
        };
        i64::try_from(rounded).ok().map(Money)
    }

    /// Clamp into `[low, high]`.
    pub fn clamp(self, low: Money, high: Money) -> Money {
        Money(self.0.max(low.0).min(high.0))
    }

    /// Sum an iterator of Money values, returning None on overflow.
    pub fn try_sum(iter: impl IntoIterator<Item = Money>) -> Option<Money> {
        iter.into_iter()
            .try_fold(Money::zero(), |acc, m| acc.try_add(m))
    }

    /// Format with two decimal places (e.g., "49.99").
    pub fn display_amount(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        format!("{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_amount())
    }
}

impl From<i64> for Money {
    fn from(amount: i64) -> Self {
        Money(amount)
    }
}

/// A percentage held in basis points (1/100 of a percent).
///
/// Basis points keep rates such as 12.5% exact. Serialized as percent:
/// `20` is 20% and `12.5` is 12.5%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Percentage(u32);

impl Percentage {
    /// Basis points in 100%.
    pub const SCALE: u32 = 10_000;

    /// No discount.
    pub const ZERO: Percentage = Percentage(0);

    /// Whole percent, e.g. `Percentage::percent(20)` for 20%.
    pub const fn percent(whole: u32) -> Self {
        Self(whole.saturating_mul(100))
    }

    pub const fn from_basis_points(bps: u32) -> Self {
        Self(bps)
    }

    pub const fn basis_points(&self) -> u32 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// At most 100%.
    pub fn is_valid(&self) -> bool {
        self.0 <= Self::SCALE
    }
}

impl Serialize for Percentage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0 % 100 == 0 {
            serializer.serialize_u32(self.0 / 100)
        } else {
            serializer.serialize_f64(f64::from(self.0) / 100.0)
        }
    }
}

impl<'de> Deserialize<'de> for Percentage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let percent = f64::deserialize(deserializer)?;
        if !percent.is_finite() || percent < 0.0 {
            return Err(de::Error::custom(format!(
                "percentage must be a non-negative number, got {}",
                percent
            )));
        }
        let bps = (percent * 100.0).round();
        if bps > f64::from(u32::MAX) {
            return Err(de::Error::custom(format!("percentage {} is too large", percent)));
        }
        Ok(Self(bps as u32))
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 % 100 == 0 {
            write!(f, "{}%", self.0 / 100)
        } else {
            write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
        }
    }
}
