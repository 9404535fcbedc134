//! # shop-api
//!
//! HTTP API layer for shopfront-rs.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - REST endpoints for catalog, cart, orders and payments
//! - Razorpay webhook endpoint over the raw request body
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | GET | `/api/products` | List products |
//! | GET | `/api/products/{id}` | Get product |
//! | GET | `/api/cart/{user_id}` | Get (or create) cart |
//! | POST | `/api/cart/{user_id}/items` | Add item |
//! | PUT | `/api/cart/{user_id}/items/{product_id}` | Set quantity |
//! | DELETE | `/api/cart/{user_id}/items/{product_id}` | Remove item |
//! | POST | `/api/orders` | Place order from cart |
//! | GET | `/api/orders/user/{user_id}` | Orders of a user |
//! | GET | `/api/orders/{order_id}` | Get order |
//! | POST | `/api/payment/create-order` | Create Razorpay order |
//! | POST | `/api/payment/webhook` | Razorpay webhook |

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
