//! Back-office operations: order status, discounts, catalog.
//!
//! Callers are assumed to be authorized already.

use std::sync::Arc;

use souk_commerce::discount::{Discount, DiscountCode};
use souk_commerce::order::{Order, OrderNumber, OrderStatus};
use souk_commerce::{CommerceError, Product, ProductId};
use souk_store::{Store, StoreError};

pub struct AdminDesk<S> {
    store: Arc<S>,
    attempts: u32,
}

impl<S> Clone for AdminDesk<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            attempts: self.attempts,
        }
    }
}

impl<S: Store> AdminDesk<S> {
    pub fn new(store: Arc<S>, attempts: u32) -> Self {
        Self {
            store,
            attempts: attempts.max(1),
        }
    }

    /// Move an order along its lifecycle.
    ///
    /// Statuses only move forward; a concurrent change is re-read and the
    /// transition re-checked against it.
    pub async fn set_order_status(
        &self,
        number: &OrderNumber,
        next: OrderStatus,
    ) -> Result<Order, CommerceError> {
        for attempt in 1..=self.attempts {
            let mut order = self
                .store
                .order(number)
                .await?
                .ok_or_else(|| CommerceError::OrderNotFound(number.to_string()))?;
            let current = order.status;
            order.transition(next)?;

            match self.store.update_order_status(number, current, next).await {
                Ok(Some(updated)) => {
                    tracing::info!(
                        order_number = %number,
                        from = %current,
                        to = %next,
                        "order status changed"
                    );
                    return Ok(updated);
                }
                Ok(None) => return Err(CommerceError::OrderNotFound(number.to_string())),
                Err(StoreError::RevisionConflict(_)) => {
                    tracing::debug!(order_number = %number, attempt, "order status contended; retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(CommerceError::Conflict(format!(
            "order {} changed concurrently",
            number
        )))
    }

    pub async fn discounts(&self) -> Result<Vec<Discount>, CommerceError> {
        Ok(self.store.discounts().await?)
    }

    /// Create or replace a discount. The usage counter is kept.
    pub async fn upsert_discount(&self, discount: Discount) -> Result<Discount, CommerceError> {
        discount.validate()?;
        let saved = self.store.upsert_discount(discount).await?;
        tracing::info!(code = %saved.code, used = saved.used_count, "discount saved");
        Ok(saved)
    }

    pub async fn delete_discount(&self, code: &str) -> Result<(), CommerceError> {
        let code = DiscountCode::new(code);
        if !self.store.delete_discount(&code).await? {
            return Err(CommerceError::DiscountNotFound(code.to_string()));
        }
        tracing::info!(code = %code, "discount deleted");
        Ok(())
    }

    pub async fn products(&self) -> Result<Vec<Product>, CommerceError> {
        Ok(self.store.products().await?)
    }

    pub async fn upsert_product(&self, product: Product) -> Result<(), CommerceError> {
        product.validate()?;
        let id = product.id.clone();
        self.store.upsert_product(product).await?;
        tracing::info!(product_id = %id, "product saved");
        Ok(())
    }

    pub async fn delete_product(&self, id: &ProductId) -> Result<(), CommerceError> {
        if !self.store.delete_product(id).await? {
            return Err(CommerceError::ProductNotFound(id.clone()));
        }
        tracing::info!(product_id = %id, "product deleted");
        Ok(())
    }
}
