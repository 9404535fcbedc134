//! # Store Port
//!
//! Persistence boundary consumed by the checkout and payment services.
//!
//! Records are kept in id-keyed tables; parent collections are queries
//! (`lines_by_order_id`, cart lines by cart id), never object graphs.
//! Every method is one storage transaction. The two compound operations that
//! must not interleave with concurrent callers are expressed as
//! compare-and-set primitives:
//!
//! - [`CommerceStore::commit_checkout`] inserts the order and deletes the cart
//!   only if the cart is still at the version the caller read.
//! - [`CommerceStore::compare_and_set_order_status`] moves an order's status
//!   only if it still holds the expected value.

use crate::cart::{Cart, CartId, CartLine, CartWithLines};
use crate::catalog::{Category, CategoryId, Product, ProductId, User, UserId};
use crate::error::CommerceResult;
use crate::money::Amount;
use crate::order::{NewOrder, Order, OrderId, OrderLine, OrderStatus, OrderWithLines};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait CommerceStore: Send + Sync {
    /// Look up a user by id
    async fn find_user(&self, user_id: UserId) -> CommerceResult<Option<User>>;

    /// Look up a product by id
    async fn find_product(&self, product_id: ProductId) -> CommerceResult<Option<Product>>;

    /// All products, ordered by id
    async fn list_products(&self) -> CommerceResult<Vec<Product>>;

    async fn find_category(&self, category_id: CategoryId) -> CommerceResult<Option<Category>>;

    /// The user's cart with its lines, if one exists
    async fn find_cart_with_lines(&self, user_id: UserId) -> CommerceResult<Option<CartWithLines>>;

    /// Return the user's cart, creating an empty one if none exists.
    /// At most one cart exists per user.
    async fn upsert_cart(&self, user_id: UserId) -> CommerceResult<CartWithLines>;

    /// Add `quantity` of a product to a cart. An existing line for the product
    /// is incremented and keeps its original price snapshot.
    async fn add_cart_line(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
        price_at_add: Amount,
    ) -> CommerceResult<CartLine>;

    /// Overwrite the quantity of an existing line; `None` if the product is not in the cart
    async fn set_cart_line_quantity(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
    ) -> CommerceResult<Option<CartLine>>;

    /// Remove a product's line; `false` if it was not in the cart
    async fn remove_cart_line(&self, cart_id: CartId, product_id: ProductId) -> CommerceResult<bool>;

    /// Atomically insert `order` with its lines and delete `cart` with its lines.
    ///
    /// Fails with `InvalidState` and writes nothing if the cart no longer
    /// exists or has changed since `cart` was read.
    async fn commit_checkout(&self, cart: &Cart, order: NewOrder) -> CommerceResult<OrderWithLines>;

    /// Look up an order header
    async fn find_order(&self, order_id: OrderId) -> CommerceResult<Option<Order>>;

    /// Lines of an order, in insertion order
    async fn lines_by_order_id(&self, order_id: OrderId) -> CommerceResult<Vec<OrderLine>>;

    /// Orders placed by a user, oldest first
    async fn orders_by_user(&self, user_id: UserId) -> CommerceResult<Vec<Order>>;

    /// Set the status to `next` only if it currently equals `expected`.
    /// Returns whether the write happened; `NotFound` if the order is missing.
    async fn compare_and_set_order_status(
        &self,
        order_id: OrderId,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> CommerceResult<bool>;
}

/// Type alias for a shared store (dynamic dispatch)
pub type SharedStore = Arc<dyn CommerceStore>;
