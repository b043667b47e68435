//! Cart and line item types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::Product;
use crate::error::CommerceError;
use crate::ids::{CartItemId, ProductId};
use crate::money::Money;
use crate::owner::Owner;

/// Maximum quantity allowed per line item.
pub const MAX_QUANTITY_PER_ITEM: i64 = 9999;

/// The option values chosen for a line.
///
/// Values are trimmed; blank values count as absent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct LineOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl LineOptions {
    pub fn new<S: AsRef<str>, C: AsRef<str>>(size: Option<S>, color: Option<C>) -> Self {
        Self {
            size: normalize(size),
            color: normalize(color),
        }
    }

    /// No options chosen.
    pub fn none() -> Self {
        Self::default()
    }

    /// Re-apply normalization, e.g. after deserializing client input.
    pub fn normalized(self) -> Self {
        Self::new(self.size, self.color)
    }
}

fn normalize<S: AsRef<str>>(value: Option<S>) -> Option<String> {
    value
        .map(|v| v.as_ref().trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Identity of a cart line: one line per product and option combination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineKey {
    pub product_id: ProductId,
    pub options: LineOptions,
}

/// A line in a cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub owner: Owner,
    pub product_id: ProductId,
    pub quantity: i64,
    #[serde(flatten)]
    pub options: LineOptions,
    /// Price seen when the line was created. Display only.
    pub unit_price_snapshot: Money,
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    pub fn key(&self) -> LineKey {
        LineKey {
            product_id: self.product_id.clone(),
            options: self.options.clone(),
        }
    }
}

/// A shopping cart.
///
/// `revision` is bumped by the store on every successful write and is used
/// for compare-and-set updates. It plays no part in cart rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub owner: Owner,
    #[serde(default)]
    pub revision: u64,
    #[serde(default)]
    pub items: Vec<CartItem>,
}

impl Cart {
    /// Create an empty cart for an owner.
    pub fn new(owner: Owner) -> Self {
        Self {
            owner,
            revision: 0,
            items: Vec::new(),
        }
    }

    /// Find a line by its key.
    pub fn line(&self, key: &LineKey) -> Option<&CartItem> {
        self.items
            .iter()
            .find(|i| i.product_id == key.product_id && i.options == key.options)
    }

    pub fn item(&self, id: &CartItemId) -> Option<&CartItem> {
        self.items.iter().find(|i| &i.id == id)
    }

    /// Add units of a product, merging into an existing line.
    ///
    /// Returns an error if:
    /// - Quantity is not positive
    /// - Options don't match what the product declares
    /// - The product is inactive or stock can't cover the new line quantity
    /// - The line would exceed `max_per_item`
    pub fn add_item(
        &mut self,
        product: &Product,
        quantity: i64,
        options: LineOptions,
        max_per_item: i64,
    ) -> Result<CartItem, CommerceError> {
        if quantity <= 0 {
            return Err(CommerceError::InvalidQuantity(quantity));
        }
        let options = options.normalized();
        product.check_options(&options)?;

        let key = LineKey {
            product_id: product.id.clone(),
            options,
        };
        let existing = self.line(&key).map(|i| i.quantity).unwrap_or(0);
        let new_quantity = existing
            .checked_add(quantity)
            .ok_or(CommerceError::Overflow)?;

        if !product.can_supply(new_quantity) {
            return Err(CommerceError::OutOfStock {
                product_id: product.id.clone(),
                requested: new_quantity,
                available: if product.is_active { product.stock } else { 0 },
            });
        }
        if new_quantity > max_per_item {
            return Err(CommerceError::QuantityExceedsLimit(new_quantity, max_per_item));
        }

        if let Some(line) = self
            .items
            .iter_mut()
            .find(|i| i.product_id == key.product_id && i.options == key.options)
        {
            line.quantity = new_quantity;
            return Ok(line.clone());
        }

        let item = CartItem {
            id: CartItemId::generate(),
            owner: self.owner.clone(),
            product_id: key.product_id,
            quantity: new_quantity,
            options: key.options,
            unit_price_snapshot: product.price,
            added_at: Utc::now(),
        };
        self.items.push(item.clone());
        Ok(item)
    }

    /// Set a line's quantity.
    ///
    /// A quantity of zero or less removes the line and returns `None`.
    /// Stock is not re-checked here; checkout is authoritative.
    pub fn update_quantity(
        &mut self,
        id: &CartItemId,
        quantity: i64,
        max_per_item: i64,
    ) -> Result<Option<CartItem>, CommerceError> {
        if self.item(id).is_none() {
            return Err(CommerceError::CartItemNotFound(id.to_string()));
        }
        if quantity <= 0 {
            self.remove_item(id);
            return Ok(None);
        }
        if quantity > max_per_item {
            return Err(CommerceError::QuantityExceedsLimit(quantity, max_per_item));
        }

        let line = self
            .items
            .iter_mut()
            .find(|i| &i.id == id)
            .ok_or_else(|| CommerceError::CartItemNotFound(id.to_string()))?;
        line.quantity = quantity;
        Ok(Some(line.clone()))
    }

    /// Remove a line. Returns whether anything was removed.
    pub fn remove_item(&mut self, id: &CartItemId) -> bool {
        let len_before = self.items.len();
        self.items.retain(|i| &i.id != id);
        self.items.len() < len_before
    }

    /// Clear all items from the cart.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Fold another owner's cart into this one.
    ///
    /// Identical lines sum their quantities. Every line the source touches
    /// is capped at the product's current stock and `max_per_item`.
    /// Lines whose product is gone, or whose cap leaves nothing, are dropped.
    /// `stock_of` returns `None` for products that no longer exist.
    pub fn absorb<F>(&mut self, source: Cart, stock_of: F, max_per_item: i64)
    where
        F: Fn(&ProductId) -> Option<i64>,
    {
        for incoming in source.items {
            let Some(stock) = stock_of(&incoming.product_id) else {
                continue;
            };
            let cap = stock.min(max_per_item).max(0);
            let key = incoming.key();

            match self
                .items
                .iter()
                .position(|i| i.product_id == key.product_id && i.options == key.options)
            {
                Some(pos) => {
                    let summed = self.items[pos].quantity.saturating_add(incoming.quantity);
                    let capped = summed.min(cap);
                    if capped > 0 {
                        self.items[pos].quantity = capped;
                    } else {
                        self.items.remove(pos);
                    }
                }
                None => {
                    let capped = incoming.quantity.min(cap);
                    if capped > 0 {
                        self.items.push(CartItem {
                            owner: self.owner.clone(),
                            quantity: capped,
                            ..incoming
                        });
                    }
                }
            }
        }
    }

    /// Quantity requested per product across all option lines, in cart order.
    pub fn requested_quantities(&self) -> Vec<(ProductId, i64)> {
        let mut totals: Vec<(ProductId, i64)> = Vec::new();
        for item in &self.items {
            match totals.iter_mut().find(|(id, _)| id == &item.product_id) {
                Some((_, qty)) => *qty = qty.saturating_add(item.quantity),
                None => totals.push((item.product_id.clone(), item.quantity)),
            }
        }
        totals
    }

    /// Get total item count (sum of quantities).
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Check if cart is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::OptionSet;

    fn product(id: &str, price: i64, stock: i64) -> Product {
        Product::new(ProductId::new(id), id, Money::new(price), stock)
    }

    #[test]
    fn test_add_item() {
        let mut cart = Cart::new(Owner::account("5"));
        let item = cart
            .add_item(&product("a", 2000, 5), 2, LineOptions::none(), MAX_QUANTITY_PER_ITEM)
            .unwrap();

        assert_eq!(item.quantity, 2);
        assert_eq!(item.unit_price_snapshot, Money::new(2000));
        assert_eq!(item.owner, Owner::account("5"));
        assert_eq!(cart.item_count(), 2);
    }

    #[test]
    fn test_add_same_line_merges() {
        let mut cart = Cart::new(Owner::guest("tok"));
        let p = product("a", 2000, 5);
        let first = cart.add_item(&p, 1, LineOptions::none(), MAX_QUANTITY_PER_ITEM).unwrap();
        let second = cart.add_item(&p, 2, LineOptions::none(), MAX_QUANTITY_PER_ITEM).unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 3);
    }

    #[test]
    fn test_different_options_make_separate_lines() {
        let mut cart = Cart::new(Owner::guest("tok"));
        let p = product("shirt", 1500, 10).with_sizes(OptionSet::parse_csv("S,M"));
        cart.add_item(&p, 1, LineOptions::new(Some("S"), None::<&str>), 99).unwrap();
        cart.add_item(&p, 1, LineOptions::new(Some(" M "), None::<&str>), 99).unwrap();
        cart.add_item(&p, 1, LineOptions::new(Some("M"), None::<&str>), 99).unwrap();

        assert_eq!(cart.items.len(), 2);
        assert_eq!(cart.requested_quantities(), vec![(ProductId::new("shirt"), 3)]);
    }

    #[test]
    fn test_add_beyond_stock_leaves_line_unchanged() {
        let mut cart = Cart::new(Owner::account("5"));
        let p = product("a", 2000, 3);
        cart.add_item(&p, 2, LineOptions::none(), MAX_QUANTITY_PER_ITEM).unwrap();

        let err = cart
            .add_item(&p, 2, LineOptions::none(), MAX_QUANTITY_PER_ITEM)
            .unwrap_err();
        assert!(matches!(
            err,
            CommerceError::OutOfStock { requested: 4, available: 3, .. }
        ));
        assert_eq!(cart.items[0].quantity, 2);
    }

    #[test]
    fn test_add_inactive_product() {
        let mut cart = Cart::new(Owner::account("5"));
        let p = product("a", 2000, 3).inactive();
        assert!(matches!(
            cart.add_item(&p, 1, LineOptions::none(), MAX_QUANTITY_PER_ITEM),
            Err(CommerceError::OutOfStock { available: 0, .. })
        ));
    }

    #[test]
    fn test_add_invalid_quantity() {
        let mut cart = Cart::new(Owner::account("5"));
        let p = product("a", 2000, 3);
        assert!(matches!(
            cart.add_item(&p, 0, LineOptions::none(), MAX_QUANTITY_PER_ITEM),
            Err(CommerceError::InvalidQuantity(0))
        ));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_respects_line_limit() {
        let mut cart = Cart::new(Owner::account("5"));
        let p = product("a", 100, 1000);
        assert!(matches!(
            cart.add_item(&p, 11, LineOptions::none(), 10),
            Err(CommerceError::QuantityExceedsLimit(11, 10))
        ));
    }

    #[test]
    fn test_update_quantity() {
        let mut cart = Cart::new(Owner::account("5"));
        let item = cart
            .add_item(&product("a", 2000, 3), 1, LineOptions::none(), MAX_QUANTITY_PER_ITEM)
            .unwrap();

        // Stock is not re-checked on update
        let updated = cart
            .update_quantity(&item.id, 7, MAX_QUANTITY_PER_ITEM)
            .unwrap()
            .unwrap();
        assert_eq!(updated.quantity, 7);

        let removed = cart.update_quantity(&item.id, 0, MAX_QUANTITY_PER_ITEM).unwrap();
        assert!(removed.is_none());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_unknown_item() {
        let mut cart = Cart::new(Owner::account("5"));
        assert!(matches!(
            cart.update_quantity(&CartItemId::new("nope"), 1, MAX_QUANTITY_PER_ITEM),
            Err(CommerceError::CartItemNotFound(_))
        ));
    }

    #[test]
    fn test_remove_item_is_idempotent() {
        let mut cart = Cart::new(Owner::account("5"));
        let item = cart
            .add_item(&product("a", 2000, 3), 1, LineOptions::none(), MAX_QUANTITY_PER_ITEM)
            .unwrap();
        assert!(cart.remove_item(&item.id));
        assert!(!cart.remove_item(&item.id));
    }

    #[test]
    fn test_absorb_sums_and_caps() {
        let a = product("a", 2000, 5);
        let b = product("b", 1000, 1);

        let mut guest = Cart::new(Owner::guest("tok1"));
        guest.add_item(&a, 1, LineOptions::none(), MAX_QUANTITY_PER_ITEM).unwrap();
        guest.add_item(&b, 1, LineOptions::none(), MAX_QUANTITY_PER_ITEM).unwrap();

        let mut account = Cart::new(Owner::account("5"));
        account.add_item(&a, 1, LineOptions::none(), MAX_QUANTITY_PER_ITEM).unwrap();
        account.add_item(&b, 1, LineOptions::none(), MAX_QUANTITY_PER_ITEM).unwrap();

        let stock = |id: &ProductId| match id.as_str() {
            "a" => Some(5),
            "b" => Some(1),
            _ => None,
        };
        account.absorb(guest, stock, MAX_QUANTITY_PER_ITEM);

        assert_eq!(account.items.len(), 2);
        assert_eq!(account.items[0].quantity, 2);
        assert_eq!(account.items[1].quantity, 1);
    }

    #[test]
    fn test_absorb_drops_missing_and_sold_out() {
        let a = product("a", 2000, 5);
        let gone = product("gone", 1000, 5);

        let mut guest = Cart::new(Owner::guest("tok1"));
        guest.add_item(&a, 2, LineOptions::none(), MAX_QUANTITY_PER_ITEM).unwrap();
        guest.add_item(&gone, 1, LineOptions::none(), MAX_QUANTITY_PER_ITEM).unwrap();

        let mut account = Cart::new(Owner::account("5"));
        let stock = |id: &ProductId| (id.as_str() == "a").then_some(0);
        account.absorb(guest, stock, MAX_QUANTITY_PER_ITEM);

        assert!(account.is_empty());
    }

    #[test]
    fn test_absorbed_lines_take_new_owner() {
        let a = product("a", 2000, 5);
        let mut guest = Cart::new(Owner::guest("tok1"));
        guest.add_item(&a, 1, LineOptions::none(), MAX_QUANTITY_PER_ITEM).unwrap();

        let mut account = Cart::new(Owner::account("5"));
        account.absorb(guest, |_| Some(5), MAX_QUANTITY_PER_ITEM);
        assert_eq!(account.items[0].owner, Owner::account("5"));
    }
}
