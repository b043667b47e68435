//! Discount codes and the rule that prices them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::error::CommerceError;
use crate::money::{Money, Percentage};

/// A discount code, normalized to trimmed upper case.
///
/// Lookups are case-insensitive because every code passes through here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct DiscountCode(String);

impl DiscountCode {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for DiscountCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for DiscountCode {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for DiscountCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<DiscountCode> for String {
    fn from(code: DiscountCode) -> Self {
        code.0
    }
}

/// Why an existing discount does not apply.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DiscountRejection {
    #[error("code is inactive")]
    Inactive,

    #[error("code is not valid yet")]
    NotYetValid,

    #[error("code has expired")]
    Expired,

    #[error("code has reached its usage limit")]
    UsageExceeded,

    #[error("minimum purchase of {minimum} not met")]
    MinimumNotMet { minimum: Money },
}

/// How the percent and fixed components of a discount combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DiscountStacking {
    /// Percent part plus fixed part.
    #[default]
    Additive,
    /// The larger of the two parts.
    Greatest,
}

impl DiscountStacking {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountStacking::Additive => "additive",
            DiscountStacking::Greatest => "greatest",
        }
    }
}

/// A promotional code definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discount {
    pub code: DiscountCode,
    #[serde(default)]
    pub percent_off: Percentage,
    #[serde(default)]
    pub amount_off: Money,
    #[serde(default)]
    pub min_purchase: Money,
    /// Maximum number of uses (None = unlimited).
    #[serde(default)]
    pub max_uses: Option<i64>,
    #[serde(default)]
    pub used_count: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

impl Discount {
    fn base(code: impl AsRef<str>) -> Self {
        Self {
            code: DiscountCode::new(code),
            percent_off: Percentage::ZERO,
            amount_off: Money::zero(),
            min_purchase: Money::zero(),
            max_uses: None,
            used_count: 0,
            is_active: true,
            valid_from: None,
            valid_until: None,
        }
    }

    /// Create a new percentage discount.
    pub fn percentage(code: impl AsRef<str>, percent: Percentage) -> Self {
        Self {
            percent_off: percent,
            ..Self::base(code)
        }
    }

    /// Create a new fixed amount discount.
    pub fn fixed_amount(code: impl AsRef<str>, amount: Money) -> Self {
        Self {
            amount_off: amount,
            ..Self::base(code)
        }
    }

    pub fn with_amount_off(mut self, amount: Money) -> Self {
        self.amount_off = amount;
        self
    }

    pub fn with_min_purchase(mut self, minimum: Money) -> Self {
        self.min_purchase = minimum;
        self
    }

    pub fn with_max_uses(mut self, max_uses: i64) -> Self {
        self.max_uses = Some(max_uses);
        self
    }

    pub fn with_window(
        mut self,
        valid_from: Option<DateTime<Utc>>,
        valid_until: Option<DateTime<Utc>>,
    ) -> Self {
        self.valid_from = valid_from;
        self.valid_until = valid_until;
        self
    }

    /// Check if the usage limit has been reached.
    pub fn is_exhausted(&self) -> bool {
        self.max_uses.is_some_and(|max| self.used_count >= max)
    }

    /// Check every applicability rule, in order, at `now`.
    pub fn check(&self, subtotal: Money, now: DateTime<Utc>) -> Result<(), DiscountRejection> {
        if !self.is_active {
            return Err(DiscountRejection::Inactive);
        }
        if self.valid_from.is_some_and(|from| now < from) {
            return Err(DiscountRejection::NotYetValid);
        }
        if self.valid_until.is_some_and(|until| now > until) {
            return Err(DiscountRejection::Expired);
        }
        if self.is_exhausted() {
            return Err(DiscountRejection::UsageExceeded);
        }
        if subtotal < self.min_purchase {
            return Err(DiscountRejection::MinimumNotMet {
                minimum: self.min_purchase,
            });
        }
        Ok(())
    }

    /// Amount taken off `subtotal`, clamped to `[0, subtotal]`.
    pub fn amount_for(
        &self,
        subtotal: Money,
        stacking: DiscountStacking,
    ) -> Result<Money, CommerceError> {
        let percent_part = subtotal
            .percentage(self.percent_off)
            .ok_or(CommerceError::Overflow)?;

        let raw = match stacking {
            DiscountStacking::Additive => percent_part
                .try_add(self.amount_off)
                .ok_or(CommerceError::Overflow)?,
            DiscountStacking::Greatest => percent_part.max(self.amount_off),
        };

        Ok(raw.clamp(Money::zero(), subtotal.max(Money::zero())))
    }

    /// Check applicability and price the discount. Never mutates.
    pub fn evaluate(
        &self,
        subtotal: Money,
        now: DateTime<Utc>,
        stacking: DiscountStacking,
    ) -> Result<Money, CommerceError> {
        self.check(subtotal, now)?;
        self.amount_for(subtotal, stacking)
    }

    /// Count one successful use.
    pub fn record_usage(&mut self) -> Result<(), CommerceError> {
        self.used_count = self
            .used_count
            .checked_add(1)
            .ok_or(CommerceError::Overflow)?;
        Ok(())
    }

    /// Basic sanity checks for admin writes.
    pub fn validate(&self) -> Result<(), CommerceError> {
        if self.code.is_blank() {
            return Err(CommerceError::InvalidDiscount("code must not be empty".into()));
        }
        if !self.percent_off.is_valid() {
            return Err(CommerceError::InvalidDiscount(format!(
                "percent_off {} exceeds 100%",
                self.percent_off
            )));
        }
        if self.amount_off.is_negative() || self.min_purchase.is_negative() {
            return Err(CommerceError::InvalidDiscount(
                "amounts must not be negative".into(),
            ));
        }
        if self.max_uses.is_some_and(|m| m < 0) || self.used_count < 0 {
            return Err(CommerceError::InvalidDiscount(
                "usage counters must not be negative".into(),
            ));
        }
        if let (Some(from), Some(until)) = (self.valid_from, self.valid_until) {
            if until < from {
                return Err(CommerceError::InvalidDiscount(
                    "valid_until precedes valid_from".into(),
                ));
            }
        }
        Ok(())
    }
}
