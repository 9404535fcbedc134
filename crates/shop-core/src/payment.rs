//! # Payment Orders
//!
//! Creates the gateway-side order for an internal order. Every check runs
//! before the network call and nothing local is written, so a failed call is
//! always safe for the caller to retry.

use crate::catalog::UserId;
use crate::error::{CommerceError, CommerceResult};
use crate::gateway::{
    BoxedPaymentGateway, RemoteOrder, RemoteOrderRequest, NOTE_INTERNAL_ORDER_ID, NOTE_USER_EMAIL,
};
use crate::money::{Amount, Currency};
use crate::order::OrderId;
use crate::store::SharedStore;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{error, info, instrument, warn};

/// Receipt prefix correlating gateway payments with internal orders
pub const RECEIPT_PREFIX: &str = "order_receipt_";

/// Placeholder email when the purchaser's address is unknown
pub const UNKNOWN_USER_EMAIL: &str = "unknown_user@example.com";

/// Build the conventional receipt for an internal order
pub fn receipt_for(order_id: OrderId) -> String {
    format!("{}{}", RECEIPT_PREFIX, order_id)
}

/// Client request to open a payment for an internal order
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOrderRequest {
    pub order_id: OrderId,
    pub user_id: UserId,
    /// Must equal the order's total exactly
    pub amount: Amount,
    pub currency: String,
    pub receipt: String,
}

/// Opens gateway orders for placed orders
#[derive(Clone)]
pub struct PaymentService {
    store: SharedStore,
    gateway: BoxedPaymentGateway,
}

impl PaymentService {
    pub fn new(store: SharedStore, gateway: BoxedPaymentGateway) -> Self {
        Self { store, gateway }
    }

    /// Create a remote order after checking the request against the
    /// server-side order.
    #[instrument(skip(self, request), fields(order_id = request.order_id, provider = self.gateway.provider_name()))]
    pub async fn create_remote_order(
        &self,
        request: PaymentOrderRequest,
    ) -> CommerceResult<RemoteOrder> {
        let order = self
            .store
            .find_order(request.order_id)
            .await?
            .ok_or_else(|| {
                CommerceError::InvalidRequest(format!("order not found: {}", request.order_id))
            })?;

        let user = self
            .store
            .find_user(request.user_id)
            .await?
            .ok_or_else(|| {
                CommerceError::InvalidRequest(format!("user not found: {}", request.user_id))
            })?;

        if request.amount != order.total_amount {
            warn!(
                requested = %request.amount,
                expected = %order.total_amount,
                "payment amount mismatch"
            );
            return Err(CommerceError::InvalidRequest(format!(
                "amount mismatch for order {}",
                order.id
            )));
        }

        let amount = request.amount.to_minor_units()?;
        let currency = Currency::parse(&request.currency)?;

        if request.receipt != receipt_for(order.id) {
            warn!(receipt = %request.receipt, "receipt does not follow the order receipt convention");
        }

        let email = if user.email.is_empty() {
            UNKNOWN_USER_EMAIL.to_string()
        } else {
            user.email
        };
        let notes = BTreeMap::from([
            (NOTE_INTERNAL_ORDER_ID.to_string(), order.id.to_string()),
            (NOTE_USER_EMAIL.to_string(), email),
        ]);

        let remote_request = RemoteOrderRequest {
            amount,
            currency,
            receipt: request.receipt,
            notes,
        };

        let remote = self
            .gateway
            .create_order(&remote_request)
            .await
            .map_err(|e| {
                error!("Failed to create remote order: {}", e);
                e
            })?;

        info!(remote_order_id = %remote.id, amount, "created remote order");
        Ok(remote)
    }
}
