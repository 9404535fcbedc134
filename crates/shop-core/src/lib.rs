//! # shop-core
//!
//! Core types and services for the shopfront checkout and payment pipeline.
//!
//! This crate provides:
//! - `Amount` and `Currency` for exact decimal money
//! - `CartService` for editing carts, `CheckoutService` for turning a cart into an order
//! - `PaymentGateway` trait for payment providers
//! - `PaymentService` for opening gateway orders with amount verification
//! - `PaymentReconciler` for signed, idempotent webhook reconciliation
//! - `CommerceStore` port with an in-memory implementation
//! - `CommerceError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use shop_core::{CartService, CheckoutService, InMemoryStore, PaymentReconciler};
//!
//! let store = Arc::new(InMemoryStore::from_catalog(catalog));
//! let carts = CartService::new(store.clone());
//! let checkout = CheckoutService::new(store.clone());
//!
//! carts.add_or_update_item(user_id, product_id, 2).await?;
//! let placed = checkout.place_order(user_id, "12 MG Road, Pune").await?;
//!
//! // Later, from the webhook endpoint:
//! let reconciler = PaymentReconciler::new(store, gateway);
//! reconciler.handle_webhook(&raw_body, signature).await?;
//! ```

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod error;
pub mod gateway;
pub mod memory;
pub mod money;
pub mod order;
pub mod payment;
pub mod reconcile;
pub mod store;

// Re-exports for convenience
pub use cart::{Cart, CartLine, CartService, CartWithLines};
pub use catalog::{Category, Product, SeedCatalog, User};
pub use checkout::{CheckoutService, OrderDetails, OrderLineDetails};
pub use error::{CommerceError, CommerceResult, ErrorKind};
pub use gateway::{
    BoxedPaymentGateway, PaymentGateway, RemoteOrder, RemoteOrderRequest, WebhookEvent,
    NOTE_INTERNAL_ORDER_ID, NOTE_USER_EMAIL,
};
pub use memory::InMemoryStore;
pub use money::{Amount, Currency};
pub use order::{Order, OrderLine, OrderStatus, OrderWithLines};
pub use payment::{receipt_for, PaymentOrderRequest, PaymentService, RECEIPT_PREFIX};
pub use reconcile::PaymentReconciler;
pub use store::{CommerceStore, SharedStore};
