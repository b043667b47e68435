//! Order types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::cart::LineOptions;
use crate::discount::DiscountCode;
use crate::error::CommerceError;
use crate::ids::{OrderId, ProductId};
use crate::money::Money;
use crate::owner::Owner;

/// Default prefix for generated order numbers.
pub const DEFAULT_ORDER_PREFIX: &str = "DZ";

/// Human-shareable order number, e.g. `DZ-3F9A01BC`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    pub fn new(number: impl Into<String>) -> Self {
        Self(number.into())
    }

    /// `<prefix>-` followed by 8 upper-case hex characters.
    pub fn generate(prefix: &str) -> Self {
        use rand::Rng;

        let bytes: [u8; 4] = rand::thread_rng().gen();
        let hex: String = bytes.iter().map(|b| format!("{:02X}", b)).collect();
        Self(format!("{}-{}", prefix, hex))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for OrderNumber {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order placed, awaiting payment confirmation.
    #[default]
    Pending,
    /// Payment confirmed.
    Paid,
    /// Order shipped.
    Shipped,
    /// Order delivered.
    Delivered,
    /// Order cancelled.
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            OrderStatus::Pending => 0,
            OrderStatus::Paid => 1,
            OrderStatus::Shipped => 2,
            OrderStatus::Delivered => 3,
            OrderStatus::Cancelled => 4,
        }
    }

    /// Check if order is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Check if order can be cancelled.
    pub fn can_cancel(&self) -> bool {
        !self.is_terminal()
    }

    /// Status only moves forward and never returns to pending.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            OrderStatus::Pending => false,
            OrderStatus::Cancelled => self.can_cancel(),
            _ => next.rank() > self.rank(),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = CommerceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "paid" => Ok(OrderStatus::Paid),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" | "canceled" => Ok(OrderStatus::Cancelled),
            other => Err(CommerceError::UnknownStatus(other.to_string())),
        }
    }
}

/// Where and to whom the order ships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Fulfillment {
    pub full_name: String,
    pub email: String,
    pub shipping_address: String,
}

impl Fulfillment {
    /// Trim every field and check it is usable.
    pub fn validated(&self) -> Result<Fulfillment, CommerceError> {
        let out = Fulfillment {
            full_name: required(&self.full_name, "full_name")?,
            email: required(&self.email, "email")?,
            shipping_address: required(&self.shipping_address, "shipping_address")?,
        };
        if !out.email.contains('@') {
            return Err(CommerceError::InvalidFulfillment(
                "email is not a valid address".into(),
            ));
        }
        Ok(out)
    }
}

/// Shopper-supplied payment details. Opaque to this system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PaymentReference {
    pub phone: String,
    pub reference: String,
}

impl PaymentReference {
    pub fn validated(&self) -> Result<PaymentReference, CommerceError> {
        Ok(PaymentReference {
            phone: required(&self.phone, "phone")?,
            reference: required(&self.reference, "reference")?,
        })
    }
}

fn required(value: &str, field: &str) -> Result<String, CommerceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CommerceError::InvalidFulfillment(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

/// A line in an order. Snapshot taken at checkout and never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
    #[serde(flatten)]
    pub options: LineOptions,
    pub line_total: Money,
}

impl OrderItem {
    pub fn new(
        product_id: ProductId,
        name: impl Into<String>,
        unit_price: Money,
        quantity: i64,
        options: LineOptions,
    ) -> Result<Self, CommerceError> {
        let line_total = unit_price
            .try_multiply(quantity)
            .ok_or(CommerceError::Overflow)?;
        Ok(Self {
            product_id,
            name: name.into(),
            unit_price,
            quantity,
            options,
            line_total,
        })
    }
}

/// Money summary of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub discount_amount: Money,
    pub total: Money,
}

impl OrderTotals {
    /// `total = max(subtotal - discount, 0)`.
    pub fn compute(items: &[OrderItem], discount_amount: Money) -> Result<Self, CommerceError> {
        let subtotal =
            Money::try_sum(items.iter().map(|i| i.line_total)).ok_or(CommerceError::Overflow)?;
        Ok(Self {
            subtotal,
            discount_amount,
            total: subtotal.subtract_floor_zero(discount_amount),
        })
    }
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: OrderNumber,
    pub owner: Owner,
    pub items: Vec<OrderItem>,
    pub subtotal: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_code: Option<DiscountCode>,
    pub discount_amount: Money,
    pub total: Money,
    pub fulfillment: Fulfillment,
    pub payment: PaymentReference,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Build a pending order from priced lines.
    #[allow(clippy::too_many_arguments)]
    pub fn place(
        order_number: OrderNumber,
        owner: Owner,
        items: Vec<OrderItem>,
        discount_code: Option<DiscountCode>,
        discount_amount: Money,
        fulfillment: Fulfillment,
        payment: PaymentReference,
        idempotency_key: Option<String>,
    ) -> Result<Self, CommerceError> {
        let totals = OrderTotals::compute(&items, discount_amount)?;
        let now = Utc::now();
        Ok(Self {
            id: OrderId::generate(),
            order_number,
            owner,
            items,
            subtotal: totals.subtotal,
            discount_code,
            discount_amount: totals.discount_amount,
            total: totals.total,
            fulfillment,
            payment,
            status: OrderStatus::Pending,
            idempotency_key,
            created_at: now,
            updated_at: now,
        })
    }

    /// Move to a new status, enforcing the lifecycle.
    pub fn transition(&mut self, next: OrderStatus) -> Result<(), CommerceError> {
        if !self.status.can_transition_to(next) {
            return Err(CommerceError::InvalidStatusTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}
