//! Catalog view consumed by the cart and checkout.
//!
//! Products are authored elsewhere. This core reads them at use time and
//! only ever writes the stock decrement performed by checkout.

use serde::{Deserialize, Serialize};

use crate::cart::LineOptions;
use crate::error::CommerceError;
use crate::ids::ProductId;
use crate::money::Money;

/// The declared values for one option dimension (sizes or colors).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct OptionSet(Vec<String>);

impl OptionSet {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            values
                .into_iter()
                .map(Into::into)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect(),
        )
    }

    /// Parse a comma-separated list such as `"S,M,L"`.
    pub fn parse_csv(raw: &str) -> Self {
        Self::new(raw.split(','))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, value: &str) -> bool {
        self.0.iter().any(|v| v == value)
    }

    pub fn values(&self) -> &[String] {
        &self.0
    }
}

/// A product as seen by the checkout core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Live unit price. The only price used for money math.
    pub price: Money,
    /// Units available to sell.
    pub stock: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "OptionSet::is_empty")]
    pub sizes: OptionSet,
    #[serde(default, skip_serializing_if = "OptionSet::is_empty")]
    pub colors: OptionSet,
}

fn default_true() -> bool {
    true
}

impl Product {
    /// Create an active product without options.
    pub fn new(id: ProductId, name: impl Into<String>, price: Money, stock: i64) -> Self {
        Self {
            id,
            name: name.into(),
            price,
            stock,
            is_active: true,
            image_url: None,
            sizes: OptionSet::default(),
            colors: OptionSet::default(),
        }
    }

    pub fn with_sizes(mut self, sizes: OptionSet) -> Self {
        self.sizes = sizes;
        self
    }

    pub fn with_colors(mut self, colors: OptionSet) -> Self {
        self.colors = colors;
        self
    }

    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Whether `quantity` units can be sold right now.
    pub fn can_supply(&self, quantity: i64) -> bool {
        self.is_active && self.stock >= quantity
    }

    /// Check the chosen options against the declared dimensions.
    ///
    /// A declared dimension requires a value from its set; a value for an
    /// undeclared dimension is rejected.
    pub fn check_options(&self, options: &LineOptions) -> Result<(), CommerceError> {
        check_dimension(&self.sizes, options.size.as_deref(), "size")?;
        check_dimension(&self.colors, options.color.as_deref(), "color")
    }

    /// Basic sanity checks for admin writes.
    pub fn validate(&self) -> Result<(), CommerceError> {
        if self.id.as_str().trim().is_empty() {
            return Err(CommerceError::InvalidProduct("id must not be empty".into()));
        }
        if self.name.trim().is_empty() {
            return Err(CommerceError::InvalidProduct("name must not be empty".into()));
        }
        if self.price.is_negative() {
            return Err(CommerceError::InvalidProduct("price must not be negative".into()));
        }
        if self.stock < 0 {
            return Err(CommerceError::InvalidProduct("stock must not be negative".into()));
        }
        Ok(())
    }
}

fn check_dimension(
    declared: &OptionSet,
    chosen: Option<&str>,
    dimension: &'static str,
) -> Result<(), CommerceError> {
    match (declared.is_empty(), chosen) {
        (true, None) => Ok(()),
        (true, Some(value)) => Err(CommerceError::InvalidOption {
            dimension,
            value: value.to_string(),
        }),
        (false, None) => Err(CommerceError::MissingOption(dimension)),
        (false, Some(value)) if declared.contains(value) => Ok(()),
        (false, Some(value)) => Err(CommerceError::InvalidOption {
            dimension,
            value: value.to_string(),
        }),
    }
}
