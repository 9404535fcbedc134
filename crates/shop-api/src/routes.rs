//! # Routes
//!
//! Axum router configuration for the shop API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - Catalog:
///   - GET  /api/products
///   - GET  /api/products/{product_id}
///
/// - Cart:
///   - GET    /api/cart/{user_id}
///   - POST   /api/cart/{user_id}/items
///   - PUT    /api/cart/{user_id}/items/{product_id}?newQuantity=
///   - DELETE /api/cart/{user_id}/items/{product_id}
///
/// - Orders:
///   - POST /api/orders
///   - GET  /api/orders/user/{user_id}
///   - GET  /api/orders/{order_id}
///
/// - Payment:
///   - POST /api/payment/create-order
///   - POST /api/payment/webhook
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let catalog_routes = Router::new()
        .route("/", get(handlers::list_products))
        .route("/{product_id}", get(handlers::get_product));

    let cart_routes = Router::new()
        .route("/{user_id}", get(handlers::get_cart))
        .route("/{user_id}/items", post(handlers::add_cart_item))
        .route(
            "/{user_id}/items/{product_id}",
            put(handlers::update_cart_item).delete(handlers::remove_cart_item),
        );

    let order_routes = Router::new()
        .route("/", post(handlers::place_order))
        .route("/user/{user_id}", get(handlers::orders_for_user))
        .route("/{order_id}", get(handlers::get_order));

    // Webhook takes the raw body; no JSON extractor in front of it
    let payment_routes = Router::new()
        .route("/create-order", post(handlers::create_payment_order))
        .route("/webhook", post(handlers::payment_webhook));

    let api_routes = Router::new()
        .nest("/products", catalog_routes)
        .nest("/cart", cart_routes)
        .nest("/orders", order_routes)
        .nest("/payment", payment_routes);

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
