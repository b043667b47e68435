//! The storage port.

use async_trait::async_trait;
use souk_commerce::discount::{Discount, DiscountCode, DiscountStacking};
use souk_commerce::order::{Order, OrderNumber, OrderStatus};
use souk_commerce::{Cart, Money, Owner, Product, ProductId};

use crate::error::StoreResult;

/// Quantity and price the order was built with for one product.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitLine {
    pub product_id: ProductId,
    /// Total across every option line of the product.
    pub quantity: i64,
    pub unit_price: Money,
}

/// The discount a checkout intends to consume.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscountClaim {
    pub code: DiscountCode,
    pub subtotal: Money,
    pub amount: Money,
    pub stacking: DiscountStacking,
}

/// Everything a checkout writes, applied all-or-nothing.
#[derive(Debug, Clone)]
pub struct CheckoutCommit {
    pub owner: Owner,
    /// Revision of the cart the order was built from.
    pub cart_revision: u64,
    pub lines: Vec<CommitLine>,
    pub discount: Option<DiscountClaim>,
    pub order: Order,
}

/// Result of a successful commit.
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    /// The order was written.
    Placed(Order),
    /// An order with the same owner and idempotency key already existed.
    Replayed(Order),
}

impl CommitOutcome {
    pub fn order(&self) -> &Order {
        match self {
            CommitOutcome::Placed(order) | CommitOutcome::Replayed(order) => order,
        }
    }

    pub fn into_order(self) -> Order {
        match self {
            CommitOutcome::Placed(order) | CommitOutcome::Replayed(order) => order,
        }
    }

    pub fn is_replay(&self) -> bool {
        matches!(self, CommitOutcome::Replayed(_))
    }
}

/// A two-cart write used when a guest signs in.
#[derive(Debug, Clone)]
pub struct CartMerge {
    pub source: Owner,
    pub source_revision: u64,
    /// The merged target cart; its `revision` is the expected current one.
    pub target: Cart,
}

/// Storage port for the checkout core.
///
/// Implementations must be safe to share between concurrent requests.
/// Every read returns a fresh copy; nothing is cached across calls.
#[async_trait]
pub trait Store: Send + Sync {
    // Catalog

    async fn product(&self, id: &ProductId) -> StoreResult<Option<Product>>;

    async fn products(&self) -> StoreResult<Vec<Product>>;

    async fn upsert_product(&self, product: Product) -> StoreResult<()>;

    /// Returns whether a product was removed.
    async fn delete_product(&self, id: &ProductId) -> StoreResult<bool>;

    // Carts

    /// The owner's cart. An absent cart reads as empty with revision 0.
    async fn cart(&self, owner: &Owner) -> StoreResult<Cart>;

    /// Write a cart if its stored revision still equals `cart.revision`.
    ///
    /// An empty cart is deleted. Returns the cart as stored, with its new
    /// revision, or `StoreError::RevisionConflict`.
    async fn save_cart(&self, cart: Cart) -> StoreResult<Cart>;

    /// Write the merged target and delete the source in one step.
    async fn merge_carts(&self, merge: CartMerge) -> StoreResult<Cart>;

    // Discounts

    async fn discount(&self, code: &DiscountCode) -> StoreResult<Option<Discount>>;

    async fn discounts(&self) -> StoreResult<Vec<Discount>>;

    /// Create or replace a discount definition.
    ///
    /// The `used_count` of an existing record is kept; only checkout moves it.
    async fn upsert_discount(&self, discount: Discount) -> StoreResult<Discount>;

    async fn delete_discount(&self, code: &DiscountCode) -> StoreResult<bool>;

    // Orders

    /// Check every condition of the commit and apply every effect, or none.
    async fn commit_checkout(&self, commit: CheckoutCommit) -> StoreResult<CommitOutcome>;

    async fn order(&self, number: &OrderNumber) -> StoreResult<Option<Order>>;

    /// All orders, newest first.
    async fn orders(&self) -> StoreResult<Vec<Order>>;

    async fn order_by_idempotency_key(&self, owner: &Owner, key: &str)
        -> StoreResult<Option<Order>>;

    /// Set an order's status if it still equals `expected`.
    ///
    /// Returns `Ok(None)` when the order does not exist.
    async fn update_order_status(
        &self,
        number: &OrderNumber,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> StoreResult<Option<Order>>;
}
