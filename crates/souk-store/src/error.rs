//! Store error types.

use souk_commerce::discount::{DiscountCode, DiscountRejection};
use souk_commerce::{CommerceError, ProductId};
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Why a checkout commit was refused. Nothing was written.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommitRejection {
    /// The cart was written after it was read.
    #[error("cart changed since it was read (now empty: {now_empty})")]
    CartChanged { now_empty: bool },

    /// Not enough sellable stock.
    #[error("insufficient stock for {product_id}: requested {requested}, available {available}")]
    OutOfStock {
        product_id: ProductId,
        requested: i64,
        available: i64,
    },

    /// Live price differs from the price the order was built with.
    #[error("price of {0} changed")]
    PriceChanged(ProductId),

    /// Discount record changed or disappeared since it was priced.
    #[error("discount {0} changed")]
    DiscountChanged(DiscountCode),

    /// Discount no longer applies.
    #[error("discount rejected: {0}")]
    DiscountRejected(DiscountRejection),

    /// Generated order number already exists.
    #[error("order number already taken")]
    OrderNumberTaken,
}

impl CommitRejection {
    /// Whether re-reading and retrying could succeed.
    pub fn is_retriable(&self) -> bool {
        match self {
            CommitRejection::CartChanged { now_empty } => !now_empty,
            CommitRejection::PriceChanged(_)
            | CommitRejection::DiscountChanged(_)
            | CommitRejection::OrderNumberTaken => true,
            CommitRejection::OutOfStock { .. } | CommitRejection::DiscountRejected(_) => false,
        }
    }
}

/// Errors that can occur when using the store.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Checkout commit refused.
    #[error("Checkout commit rejected: {0}")]
    Rejected(CommitRejection),

    /// Compare-and-set failed.
    #[error("Revision conflict on {0}")]
    RevisionConflict(String),

    /// Backend unreachable or failed.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Failed to (de)serialize a record.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::RevisionConflict(_))
    }
}

impl From<CommitRejection> for StoreError {
    fn from(r: CommitRejection) -> Self {
        StoreError::Rejected(r)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

impl From<CommitRejection> for CommerceError {
    fn from(r: CommitRejection) -> Self {
        match r {
            CommitRejection::CartChanged { now_empty: true } => CommerceError::EmptyCart,
            CommitRejection::OutOfStock {
                product_id,
                requested,
                available,
            } => CommerceError::OutOfStock {
                product_id,
                requested,
                available,
            },
            CommitRejection::DiscountRejected(reason) => CommerceError::DiscountRejected(reason),
            other => CommerceError::Conflict(other.to_string()),
        }
    }
}

impl From<StoreError> for CommerceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Rejected(r) => r.into(),
            StoreError::RevisionConflict(what) => {
                CommerceError::Conflict(format!("concurrent update to {}", what))
            }
            StoreError::Unavailable(msg) => CommerceError::Infrastructure(msg),
            StoreError::Serialization(msg) => {
                CommerceError::Infrastructure(format!("serialization: {}", msg))
            }
        }
    }
}
