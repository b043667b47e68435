//! Cart operations per owner.
//!
//! Every mutation is read-modify-write against the store with a
//! compare-and-set on the cart revision, retried a bounded number of times.
//! No stock is reserved by putting something in a cart.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use souk_commerce::{
    Cart, CartItem, CartItemId, CommerceError, LineOptions, Money, Owner, ProductId,
};
use souk_store::{CartMerge, Store, StoreError};

use crate::config::CheckoutConfig;

/// A cart line joined with live product data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub item_id: CartItemId,
    pub product_id: ProductId,
    pub name: String,
    /// Live price.
    pub unit_price: Money,
    pub quantity: i64,
    #[serde(flatten)]
    pub options: LineOptions,
    pub line_total: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Live stock, for display.
    pub stock: i64,
}

/// What a shopper sees when listing their cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartView {
    pub owner: Owner,
    pub lines: Vec<CartLine>,
    pub item_count: i64,
    pub subtotal: Money,
}

/// Cart operations.
pub struct CartStore<S> {
    store: Arc<S>,
    max_per_item: i64,
    attempts: u32,
}

impl<S> Clone for CartStore<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            max_per_item: self.max_per_item,
            attempts: self.attempts,
        }
    }
}

impl<S: Store> CartStore<S> {
    pub fn new(store: Arc<S>, config: &CheckoutConfig) -> Self {
        Self {
            store,
            max_per_item: config.max_quantity_per_item,
            attempts: config.cart_write_attempts.max(1),
        }
    }

    /// The cart with live names and prices.
    ///
    /// Items whose product is missing or inactive are hidden, not deleted.
    pub async fn list(&self, owner: &Owner) -> Result<CartView, CommerceError> {
        let cart = self.store.cart(owner).await?;
        let mut lines = Vec::with_capacity(cart.items.len());

        for item in cart.items {
            let Some(product) = self.store.product(&item.product_id).await? else {
                continue;
            };
            if !product.is_active {
                continue;
            }
            let line_total = product
                .price
                .try_multiply(item.quantity)
                .ok_or(CommerceError::Overflow)?;
            lines.push(CartLine {
                item_id: item.id,
                product_id: item.product_id,
                name: product.name,
                unit_price: product.price,
                quantity: item.quantity,
                options: item.options,
                line_total,
                image_url: product.image_url,
                stock: product.stock,
            });
        }

        let subtotal =
            Money::try_sum(lines.iter().map(|l| l.line_total)).ok_or(CommerceError::Overflow)?;
        let item_count = lines.iter().map(|l| l.quantity).sum();

        Ok(CartView {
            owner: owner.clone(),
            lines,
            item_count,
            subtotal,
        })
    }

    /// Add units of a product, merging into an existing line.
    pub async fn add(
        &self,
        owner: &Owner,
        product_id: &ProductId,
        quantity: i64,
        options: LineOptions,
    ) -> Result<CartItem, CommerceError> {
        if quantity <= 0 {
            return Err(CommerceError::InvalidQuantity(quantity));
        }
        let product = self
            .store
            .product(product_id)
            .await?
            .ok_or_else(|| CommerceError::ProductNotFound(product_id.clone()))?;

        let item = self
            .write(owner, "add", |cart| {
                cart.add_item(&product, quantity, options.clone(), self.max_per_item)
            })
            .await?;

        tracing::info!(
            owner = %owner,
            product_id = %product_id,
            quantity = item.quantity,
            "cart item added"
        );
        Ok(item)
    }

    /// Set a line's quantity; zero or less removes it.
    pub async fn update_quantity(
        &self,
        owner: &Owner,
        item_id: &CartItemId,
        quantity: i64,
    ) -> Result<Option<CartItem>, CommerceError> {
        let result = self
            .write(owner, "update_quantity", |cart| {
                cart.update_quantity(item_id, quantity, self.max_per_item)
            })
            .await?;

        tracing::info!(owner = %owner, item_id = %item_id, quantity, "cart quantity updated");
        Ok(result)
    }

    /// Remove a line. Removing a missing line succeeds.
    pub async fn remove(&self, owner: &Owner, item_id: &CartItemId) -> Result<(), CommerceError> {
        let removed = self
            .write(owner, "remove", |cart| Ok(cart.remove_item(item_id)))
            .await?;
        if removed {
            tracing::info!(owner = %owner, item_id = %item_id, "cart item removed");
        }
        Ok(())
    }

    /// Empty the cart.
    pub async fn clear(&self, owner: &Owner) -> Result<(), CommerceError> {
        self.write(owner, "clear", |cart| {
            cart.clear();
            Ok(())
        })
        .await?;
        tracing::info!(owner = %owner, "cart cleared");
        Ok(())
    }

    /// Move everything in `from` into `into` and delete `from`.
    ///
    /// Quantities of identical lines are summed and capped at current stock.
    /// Both carts are written in one store operation.
    pub async fn merge(&self, from: &Owner, into: &Owner) -> Result<Cart, CommerceError> {
        if from == into {
            return Ok(self.store.cart(into).await?);
        }

        for attempt in 1..=self.attempts {
            let source = self.store.cart(from).await?;
            if source.is_empty() {
                return Ok(self.store.cart(into).await?);
            }
            let source_revision = source.revision;

            let mut stock: HashMap<ProductId, i64> = HashMap::new();
            for item in &source.items {
                if stock.contains_key(&item.product_id) {
                    continue;
                }
                if let Some(product) = self.store.product(&item.product_id).await? {
                    stock.insert(product.id.clone(), product.stock);
                }
            }

            let mut target = self.store.cart(into).await?;
            let moved = source.item_count();
            target.absorb(source, |id| stock.get(id).copied(), self.max_per_item);

            let merge = CartMerge {
                source: from.clone(),
                source_revision,
                target,
            };
            match self.store.merge_carts(merge).await {
                Ok(merged) => {
                    tracing::info!(
                        from = %from,
                        into = %into,
                        moved,
                        items = merged.item_count(),
                        "carts merged"
                    );
                    return Ok(merged);
                }
                Err(StoreError::RevisionConflict(what)) => {
                    tracing::debug!(attempt, %what, "cart merge contended; retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(CommerceError::Conflict(format!(
            "cart merge for {} did not settle after {} attempts",
            into, self.attempts
        )))
    }

    /// Live subtotal of the owner's visible cart.
    pub async fn subtotal(&self, owner: &Owner) -> Result<Money, CommerceError> {
        Ok(self.list(owner).await?.subtotal)
    }

    /// Read, apply `f`, write back with compare-and-set. Unchanged carts
    /// are not written.
    async fn write<T, F>(&self, owner: &Owner, op: &'static str, f: F) -> Result<T, CommerceError>
    where
        F: Fn(&mut Cart) -> Result<T, CommerceError>,
    {
        for attempt in 1..=self.attempts {
            let before = self.store.cart(owner).await?;
            let mut cart = before.clone();
            let value = f(&mut cart)?;

            if cart == before {
                return Ok(value);
            }
            match self.store.save_cart(cart).await {
                Ok(_) => return Ok(value),
                Err(StoreError::RevisionConflict(_)) => {
                    tracing::debug!(owner = %owner, op, attempt, "cart write contended; retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(CommerceError::Conflict(format!(
            "cart {} changed concurrently during {}",
            owner, op
        )))
    }
}
