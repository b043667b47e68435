//! Read access to placed orders.

use std::sync::Arc;

use souk_commerce::order::{Order, OrderNumber};
use souk_commerce::{CommerceError, Owner};
use souk_store::Store;

pub struct OrderLedger<S> {
    store: Arc<S>,
}

impl<S> Clone for OrderLedger<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: Store> OrderLedger<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn order(&self, number: &OrderNumber) -> Result<Order, CommerceError> {
        self.store
            .order(number)
            .await?
            .ok_or_else(|| CommerceError::OrderNotFound(number.to_string()))
    }

    /// Every order, newest first.
    pub async fn orders(&self) -> Result<Vec<Order>, CommerceError> {
        Ok(self.store.orders().await?)
    }

    /// Orders placed by one owner, newest first.
    pub async fn orders_for(&self, owner: &Owner) -> Result<Vec<Order>, CommerceError> {
        let mut orders = self.store.orders().await?;
        orders.retain(|o| &o.owner == owner);
        Ok(orders)
    }
}
