//! Checkout: turn a cart into an order.
//!
//! An attempt reads the cart, re-prices every line at the live price,
//! re-validates the discount, and hands the store one commit carrying every
//! condition and every effect. The store applies all of it or none of it.
//!
//! A commit refused because something moved underneath (cart rewritten,
//! price edited, discount edited, order-number collision) restarts from
//! fresh reads. Out-of-stock and discount refusals are final.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use souk_commerce::discount::{DiscountCode, DiscountStacking};
use souk_commerce::order::{Fulfillment, Order, OrderItem, OrderNumber, PaymentReference};
use souk_commerce::{CommerceError, Money, Owner, Product, ProductId};
use souk_store::{
    CheckoutCommit, CommitLine, CommitOutcome, CommitRejection, DiscountClaim, Store, StoreError,
};

use crate::config::StorefrontConfig;
use crate::notify::{self, OrderCreated, OrderNotifier};

/// What the shopper submits at checkout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub fulfillment: Fulfillment,
    pub payment: PaymentReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_code: Option<String>,
    /// Client-chosen key making retries of the same checkout safe.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

enum Attempt {
    Done(CommitOutcome),
    Retry(CommitRejection),
}

/// Places orders.
pub struct CheckoutOrchestrator<S> {
    store: Arc<S>,
    notifier: Arc<dyn OrderNotifier>,
    order_prefix: String,
    attempts: u32,
    stacking: DiscountStacking,
}

impl<S> Clone for CheckoutOrchestrator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            notifier: Arc::clone(&self.notifier),
            order_prefix: self.order_prefix.clone(),
            attempts: self.attempts,
            stacking: self.stacking,
        }
    }
}

impl<S: Store> CheckoutOrchestrator<S> {
    pub fn new(store: Arc<S>, notifier: Arc<dyn OrderNotifier>, config: &StorefrontConfig) -> Self {
        Self {
            store,
            notifier,
            order_prefix: config.checkout.order_number_prefix.clone(),
            attempts: config.checkout.checkout_attempts.max(1),
            stacking: config.discounts.stacking,
        }
    }

    /// Place an order for everything in the owner's cart.
    pub async fn checkout(
        &self,
        owner: &Owner,
        request: CheckoutRequest,
    ) -> Result<Order, CommerceError> {
        let fulfillment = request.fulfillment.validated()?;
        let payment = request.payment.validated()?;
        let code = request
            .discount_code
            .as_deref()
            .map(DiscountCode::new)
            .filter(|c| !c.is_blank());
        let key = request
            .idempotency_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        if let Some(key) = key.as_deref() {
            if let Some(existing) = self.store.order_by_idempotency_key(owner, key).await? {
                tracing::info!(
                    owner = %owner,
                    order_number = %existing.order_number,
                    "checkout replayed from idempotency key"
                );
                return Ok(existing);
            }
        }

        for attempt in 1..=self.attempts {
            let outcome = self
                .attempt(owner, &fulfillment, &payment, code.as_ref(), key.clone())
                .await
                .inspect_err(|e| {
                    tracing::info!(owner = %owner, attempt, error = %e, "checkout refused")
                })?;

            match outcome {
                Attempt::Done(CommitOutcome::Placed(order)) => {
                    tracing::info!(
                        owner = %owner,
                        order_number = %order.order_number,
                        total = %order.total,
                        attempt,
                        "order placed"
                    );
                    notify::dispatch(Arc::clone(&self.notifier), OrderCreated::from(&order));
                    return Ok(order);
                }
                Attempt::Done(CommitOutcome::Replayed(order)) => return Ok(order),
                Attempt::Retry(reason) => {
                    tracing::debug!(owner = %owner, attempt, %reason, "checkout contended; retrying");
                }
            }
        }

        tracing::warn!(owner = %owner, attempts = self.attempts, "checkout gave up under contention");
        Err(CommerceError::Conflict(format!(
            "checkout did not settle after {} attempts",
            self.attempts
        )))
    }

    async fn attempt(
        &self,
        owner: &Owner,
        fulfillment: &Fulfillment,
        payment: &PaymentReference,
        code: Option<&DiscountCode>,
        idempotency_key: Option<String>,
    ) -> Result<Attempt, CommerceError> {
        let cart = self.store.cart(owner).await?;
        if cart.is_empty() {
            return Err(CommerceError::EmptyCart);
        }

        // Every product must be sellable for the whole quantity requested
        // across its option lines.
        let mut products: HashMap<ProductId, Product> = HashMap::new();
        let mut lines = Vec::new();
        for (product_id, quantity) in cart.requested_quantities() {
            let product = self.store.product(&product_id).await?;
            let product = match product {
                Some(p) if p.can_supply(quantity) => p,
                other => {
                    return Err(CommerceError::OutOfStock {
                        available: other.filter(|p| p.is_active).map(|p| p.stock).unwrap_or(0),
                        product_id,
                        requested: quantity,
                    })
                }
            };
            lines.push(CommitLine {
                product_id: product_id.clone(),
                quantity,
                unit_price: product.price,
            });
            products.insert(product_id, product);
        }

        let mut items = Vec::with_capacity(cart.items.len());
        for item in &cart.items {
            let product = products
                .get(&item.product_id)
                .ok_or_else(|| CommerceError::ProductNotFound(item.product_id.clone()))?;
            items.push(OrderItem::new(
                item.product_id.clone(),
                product.name.clone(),
                product.price,
                item.quantity,
                item.options.clone(),
            )?);
        }
        let subtotal =
            Money::try_sum(items.iter().map(|i| i.line_total)).ok_or(CommerceError::Overflow)?;

        let claim = match code {
            Some(code) => {
                let discount = self
                    .store
                    .discount(code)
                    .await?
                    .ok_or_else(|| CommerceError::DiscountNotFound(code.to_string()))?;
                let amount = discount.evaluate(subtotal, Utc::now(), self.stacking)?;
                Some(DiscountClaim {
                    code: code.clone(),
                    subtotal,
                    amount,
                    stacking: self.stacking,
                })
            }
            None => None,
        };

        let order = Order::place(
            OrderNumber::generate(&self.order_prefix),
            owner.clone(),
            items,
            claim.as_ref().map(|c| c.code.clone()),
            claim.as_ref().map(|c| c.amount).unwrap_or_default(),
            fulfillment.clone(),
            payment.clone(),
            idempotency_key,
        )?;

        let commit = CheckoutCommit {
            owner: owner.clone(),
            cart_revision: cart.revision,
            lines,
            discount: claim,
            order,
        };

        match self.store.commit_checkout(commit).await {
            Ok(outcome) => Ok(Attempt::Done(outcome)),
            Err(StoreError::Rejected(reason)) if reason.is_retriable() => Ok(Attempt::Retry(reason)),
            Err(e) => Err(e.into()),
        }
    }
}
