//! # Order Types
//!
//! Orders are immutable once placed except for their payment status.

use crate::catalog::{ProductId, UserId};
use crate::error::CommerceResult;
use crate::money::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type OrderId = i64;
pub type OrderLineId = i64;

/// Payment status of an order.
///
/// ```text
/// PENDING ──(captured | order.paid)──▶ PAID
///    └──────────(failed)─────────────▶ FAILED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Placed, awaiting payment
    Pending,
    /// Payment captured
    Paid,
    /// Payment failed
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Paid => "PAID",
            OrderStatus::Failed => "FAILED",
        }
    }

    /// Whether `self -> next` is a defined transition
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Paid) | (OrderStatus::Pending, OrderStatus::Failed)
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An order header; lines live in their own table keyed by order id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub status: OrderStatus,
    /// Sum of line totals at creation; never recomputed
    pub total_amount: Amount,
    pub shipping_address: String,
}

/// A line of a placed order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: OrderLineId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    /// Unit price locked at checkout
    pub price_at_order: Amount,
}

impl OrderLine {
    /// Calculate the total price for this line
    pub fn total(&self) -> CommerceResult<Amount> {
        self.price_at_order.times(self.quantity)
    }
}

/// A line to be written as part of a new order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub price_at_order: Amount,
}

impl NewOrderLine {
    pub fn total(&self) -> CommerceResult<Amount> {
        self.price_at_order.times(self.quantity)
    }
}

/// An order to be inserted; the store assigns ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub total_amount: Amount,
    pub shipping_address: String,
    pub lines: Vec<NewOrderLine>,
}

impl NewOrder {
    /// Build a pending order, summing line totals left to right
    pub fn pending(
        user_id: UserId,
        shipping_address: impl Into<String>,
        lines: Vec<NewOrderLine>,
    ) -> CommerceResult<Self> {
        let total_amount = Amount::sum(lines.iter().map(NewOrderLine::total))?;
        Ok(Self {
            user_id,
            created_at: Utc::now(),
            total_amount,
            shipping_address: shipping_address.into(),
            lines,
        })
    }
}

/// An order together with its lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderWithLines {
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

impl OrderWithLines {
    /// Recompute the line sum (for invariant checks; the stored total is authoritative)
    pub fn lines_total(&self) -> CommerceResult<Amount> {
        Amount::sum(self.lines.iter().map(OrderLine::total))
    }
}
