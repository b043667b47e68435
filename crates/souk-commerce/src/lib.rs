//! Cart, discount and order domain types for the Souk storefront.
//!
//! This crate holds the synchronous rules of the checkout core:
//!
//! - **Owner**: who a cart belongs to (account or guest)
//! - **Catalog**: the product view the cart and checkout read
//! - **Cart**: line items keyed by product and chosen options
//! - **Discount**: promotional codes and their evaluation rule
//! - **Order**: immutable order snapshots and the status lifecycle
//!
//! Persistence and concurrency live in `souk-store`; the services that tie
//! them together live in `souk-checkout`.
//!
//! # Example
//!
//! ```rust
//! use souk_commerce::prelude::*;
//!
//! let product = Product::new(ProductId::new("p-1"), "Kaftan", Money::new(2000), 5);
//! let owner = Owner::account("5");
//!
//! let mut cart = Cart::new(owner);
//! cart.add_item(&product, 2, LineOptions::none(), MAX_QUANTITY_PER_ITEM)
//!     .unwrap();
//! assert_eq!(cart.item_count(), 2);
//! ```

pub mod catalog;
pub mod cart;
pub mod discount;
pub mod error;
pub mod ids;
pub mod money;
pub mod order;
pub mod owner;

pub use cart::{Cart, CartItem, LineOptions, MAX_QUANTITY_PER_ITEM};
pub use catalog::Product;
pub use error::{CommerceError, ErrorKind};
pub use ids::*;
pub use money::{Money, Percentage};
pub use owner::{GuestToken, Owner};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{CommerceError, ErrorKind};
    pub use crate::ids::*;
    pub use crate::money::{Money, Percentage};
    pub use crate::owner::{GuestToken, Owner};

    // Catalog
    pub use crate::catalog::{OptionSet, Product};

    // Cart
    pub use crate::cart::{Cart, CartItem, LineKey, LineOptions, MAX_QUANTITY_PER_ITEM};

    // Discounts
    pub use crate::discount::{Discount, DiscountCode, DiscountRejection, DiscountStacking};

    // Orders
    pub use crate::order::{
        Fulfillment, Order, OrderItem, OrderNumber, OrderStatus, OrderTotals, PaymentReference,
        DEFAULT_ORDER_PREFIX,
    };
}
