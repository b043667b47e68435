//! Storefront configuration.
//!
//! Every field has a default, so an empty file (or no file) is valid.

use std::path::Path;

use serde::{Deserialize, Serialize};
use souk_commerce::cart::MAX_QUANTITY_PER_ITEM;
use souk_commerce::discount::DiscountStacking;
use souk_commerce::order::DEFAULT_ORDER_PREFIX;
use thiserror::Error;

/// Errors loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read or write the file.
    #[error("Failed to access config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("Failed to parse TOML config {path}: {source}")]
    Toml {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    /// Failed to parse JSON.
    #[error("Failed to parse JSON config {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// Failed to render the config.
    #[error("Failed to serialize config: {0}")]
    Serialize(String),

    /// A value is out of range.
    #[error("Invalid config value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorefrontConfig {
    #[serde(default)]
    pub checkout: CheckoutConfig,

    #[serde(default)]
    pub discounts: DiscountConfig,

    #[serde(default)]
    pub notifications: NotificationConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl StorefrontConfig {
    /// Load config from a TOML or JSON file (chosen by extension).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;

        let config: Self = if is_json(path) {
            serde_json::from_str(&content).map_err(|source| ConfigError::Json {
                path: display,
                source,
            })?
        } else {
            toml::from_str(&content).map_err(|source| ConfigError::Toml {
                path: display,
                source,
            })?
        };

        config.validate()?;
        Ok(config)
    }

    /// Save config to a file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = if is_json(path) {
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        };

        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.checkout.order_number_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "checkout.order_number_prefix",
                reason: "must not be empty".into(),
            });
        }
        if self.checkout.checkout_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "checkout.checkout_attempts",
                reason: "must be at least 1".into(),
            });
        }
        if self.checkout.max_quantity_per_item < 1 {
            return Err(ConfigError::Invalid {
                key: "checkout.max_quantity_per_item",
                reason: "must be at least 1".into(),
            });
        }
        if self.checkout.cart_write_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "checkout.cart_write_attempts",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}

/// Cart and checkout limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutConfig {
    /// Prefix for generated order numbers.
    #[serde(default = "default_order_prefix")]
    pub order_number_prefix: String,

    /// Attempts before a contended checkout gives up with a conflict.
    #[serde(default = "default_attempts")]
    pub checkout_attempts: u32,

    /// Attempts for a cart compare-and-set write.
    #[serde(default = "default_attempts")]
    pub cart_write_attempts: u32,

    /// Upper bound on a single cart line.
    #[serde(default = "default_max_quantity")]
    pub max_quantity_per_item: i64,
}

fn default_order_prefix() -> String {
    DEFAULT_ORDER_PREFIX.to_string()
}

fn default_attempts() -> u32 {
    3
}

fn default_max_quantity() -> i64 {
    MAX_QUANTITY_PER_ITEM
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            order_number_prefix: default_order_prefix(),
            checkout_attempts: default_attempts(),
            cart_write_attempts: default_attempts(),
            max_quantity_per_item: default_max_quantity(),
        }
    }
}

/// Discount pricing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscountConfig {
    /// How percent and fixed parts combine.
    #[serde(default)]
    pub stacking: DiscountStacking,
}

/// Order notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON lines.
    Json,
    /// Human-readable.
    #[default]
    Human,
}

/// Logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,

    /// Filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            filter: default_filter(),
        }
    }
}

/// Generate a commented default config file.
pub fn generate_default_config() -> String {
    format!(
        r#"# Souk storefront configuration

[checkout]
# Prefix for generated order numbers
order_number_prefix = "{prefix}"
# Attempts before a contended checkout reports a conflict
checkout_attempts = 3
# Attempts for a cart compare-and-set write
cart_write_attempts = 3
# Upper bound on a single cart line
max_quantity_per_item = {max_qty}

[discounts]
# "additive" adds the percent and fixed parts; "greatest" keeps the larger
stacking = "additive"

[notifications]
enabled = true

[logging]
# "human" or "json"
format = "human"
# Used when RUST_LOG is unset
filter = "info"
"#,
        prefix = DEFAULT_ORDER_PREFIX,
        max_qty = MAX_QUANTITY_PER_ITEM,
    )
}
