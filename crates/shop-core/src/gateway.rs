//! # Payment Gateway Trait
//!
//! Port for remote payment providers. The checkout pipeline only needs two
//! things from a provider: create a remote order for an amount, and turn a
//! signed webhook delivery into a verified event.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │           PaymentGateway (trait)             │
//! │  ├── create_order()                          │
//! │  ├── verify_webhook()                        │
//! │  └── provider_name()                         │
//! └──────────────────────────────────────────────┘
//!                       ▲
//!               ┌───────┴───────┐
//!               │   Razorpay    │
//!               └───────────────┘
//! ```

use crate::error::CommerceResult;
use crate::money::Currency;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Note key carrying the internal order id on the remote order
pub const NOTE_INTERNAL_ORDER_ID: &str = "internal_order_id";

/// Note key carrying the purchaser's email on the remote order
pub const NOTE_USER_EMAIL: &str = "user_email";

/// Request to create a remote order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteOrderRequest {
    /// Amount in the smallest currency unit (paise, cents)
    pub amount: i64,
    pub currency: Currency,
    pub receipt: String,
    /// Free-form key/value notes echoed back in webhooks
    pub notes: BTreeMap<String, String>,
}

/// Handle mirroring the gateway's order record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteOrder {
    /// Gateway order id (e.g. `order_Nq...`)
    pub id: String,
    /// Gateway entity type, normally `"order"`
    pub entity: String,
    pub amount: i64,
    pub amount_paid: i64,
    pub amount_due: i64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    /// Gateway status string (`created`, `attempted`, `paid`)
    pub status: String,
    pub attempts: u32,
    /// Serialized as unix seconds
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
}

/// A verified webhook delivery reduced to the fields reconciliation needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// Event name (`payment.captured`, `payment.failed`, `order.paid`, ...)
    pub event: String,
    /// Gateway order id the payment belongs to
    pub remote_order_id: String,
    /// Payment entity status (`captured`, `failed`, `authorized`, ...)
    pub payment_status: String,
    /// Receipt attached when the remote order was created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<String>,
    /// Notes attached when the remote order was created
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub notes: BTreeMap<String, String>,
}

/// Core trait for payment gateway implementations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a remote order. Fails with `GatewayUnavailable` on transport or
    /// remote errors and `GatewayProtocolError` on unexpected response shapes.
    async fn create_order(&self, request: &RemoteOrderRequest) -> CommerceResult<RemoteOrder>;

    /// Verify the signature over the raw delivery bytes, then parse the event.
    ///
    /// Must fail with `AuthenticationFailed` before looking at the payload
    /// when the signature does not match, and with `MalformedPayload` when a
    /// verified payload cannot be parsed.
    fn verify_webhook(&self, payload: &[u8], signature: &str) -> CommerceResult<WebhookEvent>;

    /// Get the provider name (for logging).
    fn provider_name(&self) -> &'static str;
}

/// Type alias for a boxed payment gateway (dynamic dispatch)
pub type BoxedPaymentGateway = Arc<dyn PaymentGateway>;
