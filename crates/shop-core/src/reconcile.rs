//! # Webhook Reconciliation
//!
//! Applies verified gateway webhooks to internal order status.
//!
//! Deliveries may be replayed, duplicated concurrently, or arrive out of
//! order. Status only ever moves out of PENDING, through a compare-and-set,
//! so every delivery of the same event converges on the same final state and
//! a late `failed` cannot undo a `captured`.

use crate::error::{CommerceError, CommerceResult};
use crate::gateway::{BoxedPaymentGateway, WebhookEvent, NOTE_INTERNAL_ORDER_ID};
use crate::order::{OrderId, OrderStatus};
use crate::payment::RECEIPT_PREFIX;
use crate::store::SharedStore;
use tracing::{debug, info, instrument, warn};

/// Event name of order-level "paid" notifications
pub const EVENT_ORDER_PAID: &str = "order.paid";

/// Payment status the webhook calls for, if any.
///
/// The payment entity's status takes precedence over the event name.
pub fn target_status(event: &WebhookEvent) -> Option<OrderStatus> {
    match event.payment_status.as_str() {
        "captured" => Some(OrderStatus::Paid),
        "failed" => Some(OrderStatus::Failed),
        _ if event.event == EVENT_ORDER_PAID => Some(OrderStatus::Paid),
        _ => None,
    }
}

/// Internal order id a webhook refers to.
///
/// The receipt (`order_receipt_<id>`) is authoritative; the
/// `internal_order_id` note is used when the receipt is absent or unparseable.
pub fn internal_order_id(event: &WebhookEvent) -> CommerceResult<OrderId> {
    let from_receipt = event
        .receipt
        .as_deref()
        .and_then(|r| r.strip_prefix(RECEIPT_PREFIX))
        .and_then(|id| id.parse::<OrderId>().ok());

    if let Some(id) = from_receipt {
        return Ok(id);
    }

    let from_notes = event
        .notes
        .get(NOTE_INTERNAL_ORDER_ID)
        .and_then(|id| id.parse::<OrderId>().ok());

    match from_notes {
        Some(id) => {
            debug!(receipt = ?event.receipt, order_id = id, "resolved order from notes");
            Ok(id)
        }
        None => Err(CommerceError::MalformedPayload(format!(
            "cannot derive internal order id from receipt {:?}",
            event.receipt
        ))),
    }
}

/// Verifies webhook deliveries and reconciles order status
#[derive(Clone)]
pub struct PaymentReconciler {
    store: SharedStore,
    gateway: BoxedPaymentGateway,
}

impl PaymentReconciler {
    pub fn new(store: SharedStore, gateway: BoxedPaymentGateway) -> Self {
        Self { store, gateway }
    }

    /// Handle one webhook delivery.
    ///
    /// `payload` must be the request body exactly as received. Returns
    /// `Ok(true)` once the delivery is authenticated, parsed and matched to an
    /// order, whether or not the status changed.
    #[instrument(skip(self, payload, signature), fields(bytes = payload.len()))]
    pub async fn handle_webhook(&self, payload: &[u8], signature: &str) -> CommerceResult<bool> {
        let event = self.gateway.verify_webhook(payload, signature).map_err(|e| {
            warn!("Webhook rejected: {}", e);
            e
        })?;

        let order_id = internal_order_id(&event)?;
        let order = self.store.find_order(order_id).await?.ok_or_else(|| {
            CommerceError::NotFound(format!(
                "internal order not found for remote order id {}",
                event.remote_order_id
            ))
        })?;

        let Some(next) = target_status(&event) else {
            info!(
                event = %event.event,
                payment_status = %event.payment_status,
                order_id,
                "webhook carries no status change"
            );
            return Ok(true);
        };

        if order.status == next {
            debug!(order_id, status = %next, "webhook already applied");
            return Ok(true);
        }

        if !order.status.can_transition_to(next) {
            warn!(
                order_id,
                current = %order.status,
                requested = %next,
                "ignoring transition out of terminal status"
            );
            return Ok(true);
        }

        let applied = self
            .store
            .compare_and_set_order_status(order_id, order.status, next)
            .await?;

        if applied {
            info!(order_id, status = %next, event = %event.event, "order status updated");
        } else {
            // A concurrent delivery moved the order first; its write stands.
            debug!(order_id, "order status changed concurrently");
        }

        Ok(true)
    }
}
