//! Cart, discount and checkout services for the Souk storefront.
//!
//! The services here hold no state of their own. Every counter a shopper can
//! race on (product stock, discount usage, cart contents) lives in the
//! [`Store`] and changes only through its compare-and-set writes.
//!
//! - [`identity`]: credentials to cart owner
//! - [`carts`]: per-owner cart operations and guest-to-account merge
//! - [`discounts`]: read-only code validation
//! - [`checkout`]: cart to order, all or nothing
//! - [`ledger`]: order reads
//! - [`admin`]: order status, discount and product management
//! - [`notify`]: order-created notifications
//! - [`wire`]: the JSON envelope surface served by [`Storefront::handle`]
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use souk_checkout::{Storefront, StorefrontConfig};
//! use souk_commerce::{Money, Owner, Product, ProductId, LineOptions};
//! use souk_store::{MemoryStore, Store};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let store = Arc::new(MemoryStore::new());
//! store
//!     .upsert_product(Product::new(ProductId::new("a"), "Kaftan", Money::new(2000), 3))
//!     .await
//!     .unwrap();
//!
//! let shop = Storefront::new(store, &StorefrontConfig::default());
//! let owner = Owner::guest("tok1");
//! shop.carts().add(&owner, &ProductId::new("a"), 2, LineOptions::none()).await.unwrap();
//! assert_eq!(shop.carts().subtotal(&owner).await.unwrap(), Money::new(4000));
//! # }
//! ```

pub mod admin;
pub mod carts;
pub mod checkout;
pub mod config;
pub mod discounts;
pub mod identity;
pub mod ledger;
pub mod notify;
pub mod telemetry;
pub mod wire;

use std::sync::Arc;

use souk_commerce::{AccountId, Cart, CommerceError, GuestToken, Owner};
use souk_store::Store;

pub use admin::AdminDesk;
pub use carts::{CartLine, CartStore, CartView};
pub use checkout::{CheckoutOrchestrator, CheckoutRequest};
pub use config::{ConfigError, StorefrontConfig};
pub use discounts::{DiscountQuote, DiscountValidator};
pub use identity::{BearerVerifier, Credentials, IdentityResolver, NoBearers, StaticBearers};
pub use ledger::OrderLedger;
pub use notify::{ChannelNotifier, NoopNotifier, OrderCreated, OrderNotifier, TracingNotifier};
pub use wire::{Envelope, WireError, WireRequest, WireResponse};

/// Every service, wired to one store.
pub struct Storefront<S> {
    store: Arc<S>,
    config: StorefrontConfig,
    pub(crate) identity: IdentityResolver,
    pub(crate) carts: CartStore<S>,
    pub(crate) discounts: DiscountValidator<S>,
    pub(crate) checkout: CheckoutOrchestrator<S>,
    pub(crate) ledger: OrderLedger<S>,
    pub(crate) admin: AdminDesk<S>,
}

impl<S: Store> Storefront<S> {
    /// Build with no bearer verification and the configured notifier.
    pub fn new(store: Arc<S>, config: &StorefrontConfig) -> Self {
        let notifier: Arc<dyn OrderNotifier> = if config.notifications.enabled {
            Arc::new(TracingNotifier)
        } else {
            Arc::new(NoopNotifier)
        };
        Self {
            identity: IdentityResolver::new(Arc::new(NoBearers)),
            carts: CartStore::new(Arc::clone(&store), &config.checkout),
            discounts: DiscountValidator::new(Arc::clone(&store), config.discounts.stacking),
            checkout: CheckoutOrchestrator::new(Arc::clone(&store), notifier, config),
            ledger: OrderLedger::new(Arc::clone(&store)),
            admin: AdminDesk::new(Arc::clone(&store), config.checkout.cart_write_attempts),
            store,
            config: config.clone(),
        }
    }

    pub fn with_verifier(mut self, verifier: Arc<dyn BearerVerifier>) -> Self {
        self.identity = IdentityResolver::new(verifier);
        self
    }

    /// Replace the notifier. Ignored when notifications are disabled.
    pub fn with_notifier(mut self, notifier: Arc<dyn OrderNotifier>) -> Self {
        if self.config.notifications.enabled {
            self.checkout =
                CheckoutOrchestrator::new(Arc::clone(&self.store), notifier, &self.config);
        }
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &StorefrontConfig {
        &self.config
    }

    pub fn identity(&self) -> &IdentityResolver {
        &self.identity
    }

    pub fn carts(&self) -> &CartStore<S> {
        &self.carts
    }

    pub fn discounts(&self) -> &DiscountValidator<S> {
        &self.discounts
    }

    pub fn checkout(&self) -> &CheckoutOrchestrator<S> {
        &self.checkout
    }

    pub fn ledger(&self) -> &OrderLedger<S> {
        &self.ledger
    }

    pub fn admin(&self) -> &AdminDesk<S> {
        &self.admin
    }

    /// Sign in: fold the guest cart, if any, into the account cart.
    pub async fn login(
        &self,
        guest: Option<&GuestToken>,
        account: AccountId,
    ) -> Result<Cart, CommerceError> {
        let into = Owner::Account(account);
        let cart = match guest {
            Some(token) => {
                self.carts
                    .merge(&Owner::Guest(token.clone()), &into)
                    .await?
            }
            None => self.store.cart(&into).await?,
        };
        tracing::info!(owner = %into, items = cart.item_count(), "signed in");
        Ok(cart)
    }
}
