//! # Checkout
//!
//! Turns a user's cart into an immutable order.
//!
//! ```text
//! find user ─▶ find cart+lines ─▶ non-empty? ─▶ lock prices ─▶ sum ─▶ commit
//!                                                          (insert order + delete cart,
//!                                                           one transaction, CAS on cart version)
//! ```

use crate::catalog::{ProductId, UserId};
use crate::error::{CommerceError, CommerceResult};
use crate::money::Amount;
use crate::order::{NewOrder, NewOrderLine, Order, OrderId, OrderLine, OrderWithLines};
use crate::store::SharedStore;
use serde::Serialize;
use tracing::{info, instrument, warn};

/// An order line joined with the product it references
#[derive(Debug, Clone, Serialize)]
pub struct OrderLineDetails {
    pub id: i64,
    pub product_id: ProductId,
    pub product_name: Option<String>,
    pub product_image_url: Option<String>,
    pub quantity: u32,
    pub price_at_order: Amount,
    pub line_total: Amount,
}

/// An order with display-ready lines
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: Order,
    pub lines: Vec<OrderLineDetails>,
}

/// Places orders and answers order queries
#[derive(Clone)]
pub struct CheckoutService {
    store: SharedStore,
}

impl CheckoutService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Convert the user's cart into a PENDING order and delete the cart.
    ///
    /// Two concurrent calls for the same cart cannot both succeed: the commit
    /// only deletes a cart still at the version read here, and the loser gets
    /// `InvalidState`.
    #[instrument(skip(self, shipping_address))]
    pub async fn place_order(
        &self,
        user_id: UserId,
        shipping_address: &str,
    ) -> CommerceResult<OrderWithLines> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or_else(|| CommerceError::NotFound(format!("user {}", user_id)))?;

        let cart = self
            .store
            .find_cart_with_lines(user_id)
            .await?
            .ok_or_else(|| CommerceError::NotFound(format!("cart for user {}", user_id)))?;

        if cart.is_empty() {
            return Err(CommerceError::InvalidState(
                "cannot place order with an empty cart".to_string(),
            ));
        }

        let lines: Vec<NewOrderLine> = cart
            .lines
            .iter()
            .map(|line| NewOrderLine {
                product_id: line.product_id,
                quantity: line.quantity,
                price_at_order: line.price_at_add,
            })
            .collect();
        let order = NewOrder::pending(user_id, shipping_address, lines)?;
        let total = order.total_amount;

        let placed = self
            .store
            .commit_checkout(&cart.cart, order)
            .await
            .map_err(|e| {
                warn!(cart_id = cart.cart.id, "checkout commit rejected: {}", e);
                e
            })?;

        if placed.lines_total()? != placed.order.total_amount {
            return Err(CommerceError::Internal(format!(
                "order {} total {} disagrees with its lines",
                placed.order.id, placed.order.total_amount
            )));
        }

        info!(
            order_id = placed.order.id,
            lines = placed.lines.len(),
            total = %total,
            "order placed"
        );
        Ok(placed)
    }

    /// All orders of a user with their lines
    #[instrument(skip(self))]
    pub async fn orders_for_user(&self, user_id: UserId) -> CommerceResult<Vec<OrderWithLines>> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or_else(|| CommerceError::NotFound(format!("user {}", user_id)))?;

        let mut result = Vec::new();
        for order in self.store.orders_by_user(user_id).await? {
            let lines = self.store.lines_by_order_id(order.id).await?;
            result.push(OrderWithLines { order, lines });
        }
        Ok(result)
    }

    /// A single order with its lines
    pub async fn order_by_id(&self, order_id: OrderId) -> CommerceResult<Option<OrderWithLines>> {
        let Some(order) = self.store.find_order(order_id).await? else {
            return Ok(None);
        };
        let lines = self.store.lines_by_order_id(order_id).await?;
        Ok(Some(OrderWithLines { order, lines }))
    }

    /// Join an order's lines with product names and images
    pub async fn details(&self, order: OrderWithLines) -> CommerceResult<OrderDetails> {
        let mut lines = Vec::with_capacity(order.lines.len());
        for line in order.lines {
            lines.push(self.line_details(line).await?);
        }
        Ok(OrderDetails {
            order: order.order,
            lines,
        })
    }

    async fn line_details(&self, line: OrderLine) -> CommerceResult<OrderLineDetails> {
        let product = self.store.find_product(line.product_id).await?;
        let line_total = line.total()?;
        Ok(OrderLineDetails {
            id: line.id,
            product_id: line.product_id,
            product_name: product.as_ref().map(|p| p.name.clone()),
            product_image_url: product.and_then(|p| p.image_url),
            quantity: line.quantity,
            price_at_order: line.price_at_order,
            line_total,
        })
    }
}
