//! # Request Handlers
//!
//! Axum request handlers for the shop API.
//! Handlers translate JSON to service calls and typed errors to HTTP statuses;
//! all business rules live in `shop-core`.

use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shop_core::{
    Amount, CartWithLines, CommerceError, ErrorKind, OrderDetails, OrderWithLines,
    PaymentOrderRequest, Product, RemoteOrder,
};
use shop_razorpay::SIGNATURE_HEADER;
use tracing::{debug, error, info, instrument, warn};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Add-to-cart request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemRequest {
    pub product_id: i64,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

fn default_quantity() -> i64 {
    1
}

/// Query string of the set-quantity endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantityParams {
    pub new_quantity: i64,
}

/// Place-order request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub user_id: i64,
    pub shipping_address: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub stock_quantity: u32,
    pub image_url: Option<String>,
    pub category_id: i64,
    pub category_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemResponse {
    pub id: i64,
    pub product_id: i64,
    pub product_name: Option<String>,
    pub product_image_url: Option<String>,
    pub quantity: u32,
    pub price_at_purchase: Decimal,
    pub item_total_price: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub id: i64,
    pub user_id: i64,
    pub cart_items: Vec<CartItemResponse>,
    pub total_cart_price: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub id: i64,
    pub product_id: i64,
    pub product_name: Option<String>,
    pub product_image_url: Option<String>,
    pub quantity: u32,
    pub price_at_order: Decimal,
    pub item_total_price: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: i64,
    pub user_id: i64,
    pub order_date: DateTime<Utc>,
    pub total_amount: Decimal,
    pub status: String,
    pub shipping_address: String,
    pub order_items: Vec<OrderItemResponse>,
}

impl From<OrderDetails> for OrderResponse {
    fn from(details: OrderDetails) -> Self {
        let order = details.order;
        Self {
            id: order.id,
            user_id: order.user_id,
            order_date: order.created_at,
            total_amount: order.total_amount.value(),
            status: order.status.as_str().to_string(),
            shipping_address: order.shipping_address,
            order_items: details
                .lines
                .into_iter()
                .map(|line| OrderItemResponse {
                    id: line.id,
                    product_id: line.product_id,
                    product_name: line.product_name,
                    product_image_url: line.product_image_url,
                    quantity: line.quantity,
                    price_at_order: line.price_at_order.value(),
                    item_total_price: line.line_total.value(),
                })
                .collect(),
        }
    }
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    pub kind: ErrorKind,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16, kind: ErrorKind) -> Self {
        Self {
            error: error.into(),
            code,
            kind,
        }
    }
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);
pub type ApiResult<T> = Result<T, ApiError>;

fn commerce_error_to_response(err: CommerceError) -> ApiError {
    let code = err.status_code();
    if code >= 500 {
        error!(kind = ?err.kind(), retryable = err.is_retryable(), "request failed: {}", err);
    } else {
        debug!(kind = ?err.kind(), "request rejected: {}", err);
    }
    let response = ErrorResponse::new(err.to_string(), code, err.kind());
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

fn not_found(message: String) -> ApiError {
    commerce_error_to_response(CommerceError::NotFound(message))
}

// =============================================================================
// View assembly
// =============================================================================

async fn product_response(state: &AppState, product: Product) -> ApiResult<ProductResponse> {
    let category = state
        .store
        .find_category(product.category_id)
        .await
        .map_err(commerce_error_to_response)?;

    Ok(ProductResponse {
        id: product.id,
        name: product.name,
        description: product.description,
        price: product.price.value(),
        stock_quantity: product.stock_quantity,
        image_url: product.image_url,
        category_id: product.category_id,
        category_name: category.map(|c| c.name),
    })
}

async fn cart_response(state: &AppState, cart: CartWithLines) -> ApiResult<CartResponse> {
    let total: Amount = cart.total().map_err(commerce_error_to_response)?;
    let mut cart_items = Vec::with_capacity(cart.lines.len());

    for line in cart.lines {
        let product = state
            .store
            .find_product(line.product_id)
            .await
            .map_err(commerce_error_to_response)?;
        let item_total = line.total().map_err(commerce_error_to_response)?;

        cart_items.push(CartItemResponse {
            id: line.id,
            product_id: line.product_id,
            product_name: product.as_ref().map(|p| p.name.clone()),
            product_image_url: product.and_then(|p| p.image_url),
            quantity: line.quantity,
            price_at_purchase: line.price_at_add.value(),
            item_total_price: item_total.value(),
        });
    }

    Ok(CartResponse {
        id: cart.cart.id,
        user_id: cart.cart.user_id,
        cart_items,
        total_cart_price: total.value(),
    })
}

async fn order_response(state: &AppState, order: OrderWithLines) -> ApiResult<OrderResponse> {
    let details = state
        .checkout
        .details(order)
        .await
        .map_err(commerce_error_to_response)?;
    Ok(details.into())
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "shopfront",
        "provider": state.provider,
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// List the catalog
pub async fn list_products(State(state): State<AppState>) -> ApiResult<Json<Vec<ProductResponse>>> {
    let products = state
        .store
        .list_products()
        .await
        .map_err(commerce_error_to_response)?;

    let mut response = Vec::with_capacity(products.len());
    for product in products {
        response.push(product_response(&state, product).await?);
    }
    Ok(Json(response))
}

/// Get single product
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
) -> ApiResult<Json<ProductResponse>> {
    let product = state
        .store
        .find_product(product_id)
        .await
        .map_err(commerce_error_to_response)?
        .ok_or_else(|| not_found(format!("product {}", product_id)))?;

    Ok(Json(product_response(&state, product).await?))
}

/// Get the user's cart, creating it on first access
pub async fn get_cart(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> ApiResult<Json<CartResponse>> {
    let cart = state
        .carts
        .get_user_cart(user_id)
        .await
        .map_err(commerce_error_to_response)?;
    Ok(Json(cart_response(&state, cart).await?))
}

/// Add a product to the cart, or increase its quantity
#[instrument(skip(state, request), fields(product_id = request.product_id))]
pub async fn add_cart_item(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(request): Json<CartItemRequest>,
) -> ApiResult<(StatusCode, Json<CartResponse>)> {
    state
        .carts
        .add_or_update_item(user_id, request.product_id, request.quantity)
        .await
        .map_err(commerce_error_to_response)?;

    let cart = state
        .carts
        .get_user_cart(user_id)
        .await
        .map_err(commerce_error_to_response)?;
    Ok((StatusCode::CREATED, Json(cart_response(&state, cart).await?)))
}

/// Overwrite the quantity of a product already in the cart
pub async fn update_cart_item(
    State(state): State<AppState>,
    Path((user_id, product_id)): Path<(i64, i64)>,
    Query(params): Query<QuantityParams>,
) -> ApiResult<Json<CartResponse>> {
    state
        .carts
        .update_item_quantity(user_id, product_id, params.new_quantity)
        .await
        .map_err(commerce_error_to_response)?
        .ok_or_else(|| not_found(format!("product {} is not in the cart", product_id)))?;

    let cart = state
        .carts
        .get_user_cart(user_id)
        .await
        .map_err(commerce_error_to_response)?;
    Ok(Json(cart_response(&state, cart).await?))
}

/// Remove a product from the cart
pub async fn remove_cart_item(
    State(state): State<AppState>,
    Path((user_id, product_id)): Path<(i64, i64)>,
) -> ApiResult<StatusCode> {
    let removed = state
        .carts
        .remove_item(user_id, product_id)
        .await
        .map_err(commerce_error_to_response)?;

    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(format!("product {} is not in the cart", product_id)))
    }
}

/// Turn the user's cart into a PENDING order
#[instrument(skip(state, request), fields(user_id = request.user_id))]
pub async fn place_order(
    State(state): State<AppState>,
    Json(request): Json<OrderRequest>,
) -> ApiResult<(StatusCode, Json<OrderResponse>)> {
    let order = state
        .checkout
        .place_order(request.user_id, &request.shipping_address)
        .await
        .map_err(commerce_error_to_response)?;

    Ok((StatusCode::CREATED, Json(order_response(&state, order).await?)))
}

/// All orders of a user
pub async fn orders_for_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> ApiResult<Json<Vec<OrderResponse>>> {
    let orders = state
        .checkout
        .orders_for_user(user_id)
        .await
        .map_err(commerce_error_to_response)?;

    let mut response = Vec::with_capacity(orders.len());
    for order in orders {
        response.push(order_response(&state, order).await?);
    }
    Ok(Json(response))
}

/// Single order by id
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
) -> ApiResult<Json<OrderResponse>> {
    let order = state
        .checkout
        .order_by_id(order_id)
        .await
        .map_err(commerce_error_to_response)?
        .ok_or_else(|| not_found(format!("order {}", order_id)))?;

    Ok(Json(order_response(&state, order).await?))
}

/// Open a gateway order for a placed order
#[instrument(skip(state, request), fields(order_id = request.order_id))]
pub async fn create_payment_order(
    State(state): State<AppState>,
    Json(request): Json<PaymentOrderRequest>,
) -> ApiResult<(StatusCode, Json<RemoteOrder>)> {
    let remote = state
        .payments
        .create_remote_order(request)
        .await
        .map_err(commerce_error_to_response)?;

    info!("Created payment order: {}", remote.id);
    Ok((StatusCode::CREATED, Json(remote)))
}

/// Handle a gateway webhook.
///
/// The body is taken as raw bytes so the signature is checked over exactly
/// what was sent.
#[instrument(
    skip(state, headers, body),
    fields(delivery_id = %uuid::Uuid::new_v4(), bytes = body.len())
)]
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<serde_json::Value>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            warn!("Webhook without {} header", SIGNATURE_HEADER);
            commerce_error_to_response(CommerceError::AuthenticationFailed(format!(
                "missing {} header",
                SIGNATURE_HEADER
            )))
        })?;

    let applied = state
        .reconciler
        .handle_webhook(&body, signature)
        .await
        .map_err(|e| {
            warn!("Webhook processing failed: {}", e);
            commerce_error_to_response(e)
        })?;

    Ok(Json(serde_json::json!({ "applied": applied })))
}
