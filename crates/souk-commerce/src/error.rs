//! Commerce error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::discount::DiscountRejection;
use crate::ids::ProductId;
use crate::order::OrderStatus;

/// Coarse classification surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    OutOfStock,
    DiscountInvalid,
    Conflict,
    Infrastructure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::OutOfStock => "out_of_stock",
            ErrorKind::DiscountInvalid => "discount_invalid",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Infrastructure => "infrastructure",
        }
    }
}

/// Errors that can occur in cart, discount and checkout operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommerceError {
    /// Quantity must be at least one.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i64),

    /// Quantity exceeds maximum allowed per line.
    #[error("Quantity {0} exceeds maximum allowed ({1})")]
    QuantityExceedsLimit(i64, i64),

    /// Option value not offered by the product.
    #[error("Invalid {dimension}: {value}")]
    InvalidOption {
        dimension: &'static str,
        value: String,
    },

    /// Product declares an option dimension the request left out.
    #[error("Missing required option: {0}")]
    MissingOption(&'static str),

    /// Fulfillment or payment details incomplete.
    #[error("Invalid fulfillment details: {0}")]
    InvalidFulfillment(String),

    /// Product record failed validation.
    #[error("Invalid product: {0}")]
    InvalidProduct(String),

    /// Discount record failed validation.
    #[error("Invalid discount: {0}")]
    InvalidDiscount(String),

    /// No account or guest token on the request.
    #[error("A cart owner is required")]
    OwnerRequired,

    /// Checkout attempted with nothing in the cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// Unrecognized order status name.
    #[error("Unknown order status: {0}")]
    UnknownStatus(String),

    /// Order status may not move this way.
    #[error("Invalid order status transition from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    /// Arithmetic overflow.
    #[error("Arithmetic overflow in money calculation")]
    Overflow,

    /// Product not found.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// Item not in the owner's cart.
    #[error("Item not in cart: {0}")]
    CartItemNotFound(String),

    /// Unknown discount code.
    #[error("Discount code not found: {0}")]
    DiscountNotFound(String),

    /// Order not found.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Insufficient stock.
    #[error("Insufficient stock for {product_id}: requested {requested}, available {available}")]
    OutOfStock {
        product_id: ProductId,
        requested: i64,
        available: i64,
    },

    /// Discount exists but does not apply.
    #[error("Discount not applicable: {0}")]
    DiscountRejected(#[from] DiscountRejection),

    /// Concurrent modification could not be resolved within the retry budget.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Storage or serialization failure.
    #[error("Infrastructure error: {0}")]
    Infrastructure(String),
}

impl CommerceError {
    /// Classify this error for callers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CommerceError::InvalidQuantity(_)
            | CommerceError::QuantityExceedsLimit(..)
            | CommerceError::InvalidOption { .. }
            | CommerceError::MissingOption(_)
            | CommerceError::InvalidFulfillment(_)
            | CommerceError::InvalidProduct(_)
            | CommerceError::InvalidDiscount(_)
            | CommerceError::OwnerRequired
            | CommerceError::EmptyCart
            | CommerceError::UnknownStatus(_)
            | CommerceError::InvalidStatusTransition { .. }
            | CommerceError::Overflow => ErrorKind::Validation,
            CommerceError::ProductNotFound(_)
            | CommerceError::CartItemNotFound(_)
            | CommerceError::DiscountNotFound(_)
            | CommerceError::OrderNotFound(_) => ErrorKind::NotFound,
            CommerceError::OutOfStock { .. } => ErrorKind::OutOfStock,
            CommerceError::DiscountRejected(_) => ErrorKind::DiscountInvalid,
            CommerceError::Conflict(_) => ErrorKind::Conflict,
            CommerceError::Infrastructure(_) => ErrorKind::Infrastructure,
        }
    }

    /// Whether a caller may retry the same request unchanged.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CommerceError::Conflict(_) | CommerceError::Infrastructure(_)
        )
    }
}

impl From<serde_json::Error> for CommerceError {
    fn from(e: serde_json::Error) -> Self {
        CommerceError::Infrastructure(format!("serialization: {}", e))
    }
}
