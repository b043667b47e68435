//! In-memory storage engine.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use souk_commerce::discount::{Discount, DiscountCode};
use souk_commerce::order::{Order, OrderNumber, OrderStatus};
use souk_commerce::{Cart, Owner, Product, ProductId};
use tokio::sync::Mutex;

use crate::error::{CommitRejection, StoreError, StoreResult};
use crate::snapshot::StoreSnapshot;
use crate::store::{CartMerge, CheckoutCommit, CommitOutcome, Store};

#[derive(Default)]
struct State {
    products: BTreeMap<ProductId, Product>,
    carts: HashMap<Owner, Cart>,
    /// Store-wide sequence so a revision is never handed out twice.
    revision_seq: u64,
    discounts: BTreeMap<DiscountCode, Discount>,
    orders: Vec<Order>,
    order_index: HashMap<OrderNumber, usize>,
}

impl State {
    fn current_revision(&self, owner: &Owner) -> u64 {
        self.carts.get(owner).map(|c| c.revision).unwrap_or(0)
    }

    fn next_revision(&mut self) -> u64 {
        self.revision_seq += 1;
        self.revision_seq
    }

    /// Store or delete a cart, assigning a fresh revision.
    fn put_cart(&mut self, mut cart: Cart) -> Cart {
        if cart.is_empty() {
            self.carts.remove(&cart.owner);
            cart.revision = 0;
            return cart;
        }
        cart.revision = self.next_revision();
        self.carts.insert(cart.owner.clone(), cart.clone());
        cart
    }

    fn remove_cart(&mut self, owner: &Owner) {
        self.carts.remove(owner);
    }

    fn push_order(&mut self, order: Order) {
        self.order_index
            .insert(order.order_number.clone(), self.orders.len());
        self.orders.push(order);
    }

    fn order_for_key(&self, owner: &Owner, key: &str) -> Option<&Order> {
        self.orders
            .iter()
            .find(|o| &o.owner == owner && o.idempotency_key.as_deref() == Some(key))
    }

    /// Check every commit condition without writing anything.
    fn check_commit(&self, commit: &CheckoutCommit) -> Result<(), CommitRejection> {
        if self.current_revision(&commit.owner) != commit.cart_revision {
            let now_empty = self
                .carts
                .get(&commit.owner)
                .map(Cart::is_empty)
                .unwrap_or(true);
            return Err(CommitRejection::CartChanged { now_empty });
        }

        for line in &commit.lines {
            let available = match self.products.get(&line.product_id) {
                Some(p) if p.is_active => p,
                _ => {
                    return Err(CommitRejection::OutOfStock {
                        product_id: line.product_id.clone(),
                        requested: line.quantity,
                        available: 0,
                    })
                }
            };
            if available.price != line.unit_price {
                return Err(CommitRejection::PriceChanged(line.product_id.clone()));
            }
            if available.stock < line.quantity {
                return Err(CommitRejection::OutOfStock {
                    product_id: line.product_id.clone(),
                    requested: line.quantity,
                    available: available.stock,
                });
            }
        }

        if let Some(claim) = &commit.discount {
            let discount = self
                .discounts
                .get(&claim.code)
                .ok_or_else(|| CommitRejection::DiscountChanged(claim.code.clone()))?;
            discount
                .check(claim.subtotal, Utc::now())
                .map_err(CommitRejection::DiscountRejected)?;
            let amount = discount
                .amount_for(claim.subtotal, claim.stacking)
                .map_err(|_| CommitRejection::DiscountChanged(claim.code.clone()))?;
            if amount != claim.amount {
                return Err(CommitRejection::DiscountChanged(claim.code.clone()));
            }
        }

        if self.order_index.contains_key(&commit.order.order_number) {
            return Err(CommitRejection::OrderNumberTaken);
        }

        Ok(())
    }
}

/// An in-process [`Store`].
///
/// One mutex guards the whole state and is the engine's transaction: every
/// trait method takes it once and never awaits while holding it.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-loaded from a snapshot.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let mut state = State::default();
        for product in snapshot.products {
            state.products.insert(product.id.clone(), product);
        }
        for discount in snapshot.discounts {
            state.discounts.insert(discount.code.clone(), discount);
        }
        for cart in snapshot.carts {
            state.put_cart(cart);
        }
        let mut orders = snapshot.orders;
        orders.sort_by_key(|o| o.created_at);
        for order in orders {
            state.push_order(order);
        }

        Self {
            state: Mutex::new(state),
            offline: AtomicBool::new(false),
        }
    }

    /// Copy the full state out.
    pub async fn snapshot(&self) -> StoreSnapshot {
        let state = self.state.lock().await;
        StoreSnapshot {
            products: state.products.values().cloned().collect(),
            discounts: state.discounts.values().cloned().collect(),
            carts: state.carts.values().cloned().collect(),
            orders: state.orders.clone(),
        }
    }

    /// Make every call fail with `StoreError::Unavailable`. For outage tests.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn product(&self, id: &ProductId) -> StoreResult<Option<Product>> {
        self.ensure_online()?;
        Ok(self.state.lock().await.products.get(id).cloned())
    }

    async fn products(&self) -> StoreResult<Vec<Product>> {
        self.ensure_online()?;
        Ok(self.state.lock().await.products.values().cloned().collect())
    }

    async fn upsert_product(&self, product: Product) -> StoreResult<()> {
        self.ensure_online()?;
        self.state
            .lock()
            .await
            .products
            .insert(product.id.clone(), product);
        Ok(())
    }

    async fn delete_product(&self, id: &ProductId) -> StoreResult<bool> {
        self.ensure_online()?;
        Ok(self.state.lock().await.products.remove(id).is_some())
    }

    async fn cart(&self, owner: &Owner) -> StoreResult<Cart> {
        self.ensure_online()?;
        let state = self.state.lock().await;
        Ok(state
            .carts
            .get(owner)
            .cloned()
            .unwrap_or_else(|| Cart::new(owner.clone())))
    }

    async fn save_cart(&self, cart: Cart) -> StoreResult<Cart> {
        self.ensure_online()?;
        let mut state = self.state.lock().await;
        if state.current_revision(&cart.owner) != cart.revision {
            tracing::debug!(owner = %cart.owner, expected = cart.revision, "cart revision conflict");
            return Err(StoreError::RevisionConflict(format!("cart {}", cart.owner)));
        }
        Ok(state.put_cart(cart))
    }

    async fn merge_carts(&self, merge: CartMerge) -> StoreResult<Cart> {
        self.ensure_online()?;
        let mut state = self.state.lock().await;
        if state.current_revision(&merge.source) != merge.source_revision {
            return Err(StoreError::RevisionConflict(format!("cart {}", merge.source)));
        }
        if state.current_revision(&merge.target.owner) != merge.target.revision {
            return Err(StoreError::RevisionConflict(format!(
                "cart {}",
                merge.target.owner
            )));
        }
        state.remove_cart(&merge.source);
        Ok(state.put_cart(merge.target))
    }

    async fn discount(&self, code: &DiscountCode) -> StoreResult<Option<Discount>> {
        self.ensure_online()?;
        Ok(self.state.lock().await.discounts.get(code).cloned())
    }

    async fn discounts(&self) -> StoreResult<Vec<Discount>> {
        self.ensure_online()?;
        Ok(self.state.lock().await.discounts.values().cloned().collect())
    }

    async fn upsert_discount(&self, mut discount: Discount) -> StoreResult<Discount> {
        self.ensure_online()?;
        let mut state = self.state.lock().await;
        if let Some(existing) = state.discounts.get(&discount.code) {
            discount.used_count = existing.used_count;
        }
        state
            .discounts
            .insert(discount.code.clone(), discount.clone());
        Ok(discount)
    }

    async fn delete_discount(&self, code: &DiscountCode) -> StoreResult<bool> {
        self.ensure_online()?;
        Ok(self.state.lock().await.discounts.remove(code).is_some())
    }

    async fn commit_checkout(&self, commit: CheckoutCommit) -> StoreResult<CommitOutcome> {
        self.ensure_online()?;
        let mut state = self.state.lock().await;

        if let Some(key) = commit.order.idempotency_key.as_deref() {
            if let Some(existing) = state.order_for_key(&commit.owner, key) {
                return Ok(CommitOutcome::Replayed(existing.clone()));
            }
        }

        state.check_commit(&commit)?;

        // All conditions hold; apply every effect.
        for line in &commit.lines {
            if let Some(product) = state.products.get_mut(&line.product_id) {
                product.stock -= line.quantity;
            }
        }
        if let Some(claim) = &commit.discount {
            if let Some(discount) = state.discounts.get_mut(&claim.code) {
                discount.used_count += 1;
            }
        }
        state.remove_cart(&commit.owner);
        state.push_order(commit.order.clone());

        tracing::debug!(
            order_number = %commit.order.order_number,
            owner = %commit.owner,
            "checkout committed"
        );
        Ok(CommitOutcome::Placed(commit.order))
    }

    async fn order(&self, number: &OrderNumber) -> StoreResult<Option<Order>> {
        self.ensure_online()?;
        let state = self.state.lock().await;
        Ok(state
            .order_index
            .get(number)
            .and_then(|&i| state.orders.get(i))
            .cloned())
    }

    async fn orders(&self) -> StoreResult<Vec<Order>> {
        self.ensure_online()?;
        let state = self.state.lock().await;
        Ok(state.orders.iter().rev().cloned().collect())
    }

    async fn order_by_idempotency_key(
        &self,
        owner: &Owner,
        key: &str,
    ) -> StoreResult<Option<Order>> {
        self.ensure_online()?;
        Ok(self.state.lock().await.order_for_key(owner, key).cloned())
    }

    async fn update_order_status(
        &self,
        number: &OrderNumber,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> StoreResult<Option<Order>> {
        self.ensure_online()?;
        let mut state = self.state.lock().await;
        let Some(&index) = state.order_index.get(number) else {
            return Ok(None);
        };
        let Some(order) = state.orders.get_mut(index) else {
            return Ok(None);
        };
        if order.status != expected {
            return Err(StoreError::RevisionConflict(format!("order {}", number)));
        }
        order.status = next;
        order.updated_at = Utc::now();
        Ok(Some(order.clone()))
    }
}
