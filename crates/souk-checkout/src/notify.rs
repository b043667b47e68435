//! Order notifications.
//!
//! Delivery is fire-and-forget: a failure is logged and never reaches the
//! shopper, and the order stands regardless.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use souk_commerce::order::{Fulfillment, Order, OrderItem, OrderNumber};
use souk_commerce::{Money, Owner};
use thiserror::Error;
use tokio::sync::mpsc;

/// Notification delivery failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Notification failed: {0}")]
pub struct NotifyError(pub String);

/// Emitted once per placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCreated {
    pub order_number: OrderNumber,
    pub owner: Owner,
    pub subtotal: Money,
    pub discount_amount: Money,
    pub total: Money,
    pub fulfillment: Fulfillment,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
}

impl From<&Order> for OrderCreated {
    fn from(order: &Order) -> Self {
        Self {
            order_number: order.order_number.clone(),
            owner: order.owner.clone(),
            subtotal: order.subtotal,
            discount_amount: order.discount_amount,
            total: order.total,
            fulfillment: order.fulfillment.clone(),
            items: order.items.clone(),
            created_at: order.created_at,
        }
    }
}

/// Receives order events.
#[async_trait]
pub trait OrderNotifier: Send + Sync {
    async fn order_created(&self, event: &OrderCreated) -> Result<(), NotifyError>;
}

/// Drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

#[async_trait]
impl OrderNotifier for NoopNotifier {
    async fn order_created(&self, _event: &OrderCreated) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Writes events to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

#[async_trait]
impl OrderNotifier for TracingNotifier {
    async fn order_created(&self, event: &OrderCreated) -> Result<(), NotifyError> {
        tracing::info!(
            order_number = %event.order_number,
            total = %event.total,
            items = event.items.len(),
            customer = %event.fulfillment.full_name,
            "new order"
        );
        Ok(())
    }
}

/// Forwards events to a channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<OrderCreated>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OrderCreated>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl OrderNotifier for ChannelNotifier {
    async fn order_created(&self, event: &OrderCreated) -> Result<(), NotifyError> {
        self.tx
            .send(event.clone())
            .map_err(|_| NotifyError("receiver dropped".into()))
    }
}

/// Deliver `event` on a background task.
///
/// Outside a Tokio runtime the event is logged and dropped.
pub fn dispatch(notifier: Arc<dyn OrderNotifier>, event: OrderCreated) {
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        tracing::warn!(order_number = %event.order_number, "no runtime; notification dropped");
        return;
    };
    handle.spawn(async move {
        if let Err(e) = notifier.order_created(&event).await {
            tracing::warn!(order_number = %event.order_number, error = %e, "order notification failed");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> OrderCreated {
        OrderCreated {
            order_number: OrderNumber::new("DZ-0000ABCD"),
            owner: Owner::account("5"),
            subtotal: Money::new(4000),
            discount_amount: Money::new(800),
            total: Money::new(3200),
            fulfillment: Fulfillment::default(),
            items: Vec::new(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_channel_dispatch() {
        let (notifier, mut rx) = ChannelNotifier::new();
        dispatch(Arc::new(notifier), event());
        let received = rx.recv().await.unwrap();
        assert_eq!(received.total, Money::new(3200));
    }

    #[tokio::test]
    async fn test_failed_delivery_is_swallowed() {
        let (notifier, rx) = ChannelNotifier::new();
        drop(rx);
        assert!(notifier.order_created(&event()).await.is_err());
        // Dispatching must not panic even though delivery fails
        dispatch(Arc::new(notifier), event());
        tokio::task::yield_now().await;
    }

    #[test]
    fn test_dispatch_outside_runtime() {
        dispatch(Arc::new(TracingNotifier), event());
    }
}
