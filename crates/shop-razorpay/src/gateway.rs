//! # Razorpay Orders
//!
//! `PaymentGateway` implementation backed by the Razorpay Orders API.

use crate::config::RazorpayConfig;
use crate::webhook;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use shop_core::{
    CommerceError, CommerceResult, PaymentGateway, RemoteOrder, RemoteOrderRequest, WebhookEvent,
};
use tracing::{debug, error, info, instrument};

const PROVIDER: &str = "razorpay";

/// Razorpay payment gateway
///
/// Creates orders with basic auth (`key_id:key_secret`) and verifies
/// webhook deliveries with the webhook secret.
pub struct RazorpayGateway {
    config: RazorpayConfig,
    client: Client,
}

impl RazorpayGateway {
    /// Create a new gateway; every request is bounded by `config.timeout`
    pub fn new(config: RazorpayConfig) -> CommerceResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                CommerceError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> CommerceResult<Self> {
        Self::new(RazorpayConfig::from_env()?)
    }

    pub fn config(&self) -> &RazorpayConfig {
        &self.config
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    #[instrument(skip(self, request), fields(receipt = %request.receipt, amount = request.amount))]
    async fn create_order(&self, request: &RemoteOrderRequest) -> CommerceResult<RemoteOrder> {
        let url = self.config.orders_url();
        debug!("Creating Razorpay order: currency={}", request.currency);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!("Razorpay request failed: {}", e);
                CommerceError::gateway_unavailable("Razorpay request failed", e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            CommerceError::gateway_unavailable("Failed to read Razorpay response", e)
        })?;

        if !status.is_success() {
            error!("Razorpay API error: status={}, body={}", status, body);

            let message = match serde_json::from_str::<RazorpayErrorResponse>(&body) {
                Ok(parsed) => format!(
                    "Razorpay {} ({}): {}",
                    status, parsed.error.code, parsed.error.description
                ),
                Err(_) => format!("Razorpay HTTP {}: {}", status, body),
            };
            return Err(CommerceError::GatewayUnavailable {
                message,
                source: None,
            });
        }

        let raw: RazorpayOrderResponse = serde_json::from_str(&body).map_err(|e| {
            CommerceError::GatewayProtocolError(format!("Failed to parse Razorpay response: {}", e))
        })?;
        let order = raw.into_remote_order()?;

        info!(
            "Created Razorpay order: id={}, status={}",
            order.id, order.status
        );
        Ok(order)
    }

    fn verify_webhook(&self, payload: &[u8], signature: &str) -> CommerceResult<WebhookEvent> {
        webhook::verify_signature(&self.config.webhook_secret, payload, signature)?;
        webhook::parse_event(payload)
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

// =============================================================================
// Razorpay API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct RazorpayOrderResponse {
    id: String,
    entity: String,
    amount: i64,
    #[serde(default)]
    amount_paid: i64,
    #[serde(default)]
    amount_due: i64,
    currency: String,
    #[serde(default)]
    receipt: Option<String>,
    status: String,
    #[serde(default)]
    attempts: u32,
    created_at: serde_json::Value,
}

impl RazorpayOrderResponse {
    fn into_remote_order(self) -> CommerceResult<RemoteOrder> {
        let created_at = parse_created_at(&self.created_at)?;
        Ok(RemoteOrder {
            id: self.id,
            entity: self.entity,
            amount: self.amount,
            amount_paid: self.amount_paid,
            amount_due: self.amount_due,
            currency: self.currency,
            receipt: self.receipt,
            status: self.status,
            attempts: self.attempts,
            created_at,
        })
    }
}

/// Razorpay sends unix seconds; an RFC 3339 string is accepted as well
fn parse_created_at(value: &serde_json::Value) -> CommerceResult<DateTime<Utc>> {
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_i64().and_then(|ts| DateTime::from_timestamp(ts, 0)),
        serde_json::Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    };

    parsed.ok_or_else(|| {
        CommerceError::GatewayProtocolError(format!("unrecognized created_at value: {}", value))
    })
}

#[derive(Debug, Deserialize)]
struct RazorpayErrorResponse {
    error: RazorpayError,
}

#[derive(Debug, Deserialize)]
struct RazorpayError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webhook::{compute_signature, tests::captured_payload};
    use shop_core::Currency;
    use std::collections::BTreeMap;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway(base_url: &str) -> RazorpayGateway {
        let config = RazorpayConfig::new("rzp_test_abc123", "key-secret", "whsec")
            .with_api_base_url(base_url)
            .with_timeout(Duration::from_millis(500));
        RazorpayGateway::new(config).unwrap()
    }

    fn request() -> RemoteOrderRequest {
        RemoteOrderRequest {
            amount: 2500,
            currency: Currency::INR,
            receipt: "order_receipt_42".to_string(),
            notes: BTreeMap::from([
                ("internal_order_id".to_string(), "42".to_string()),
                ("user_email".to_string(), "asha@example.com".to_string()),
            ]),
        }
    }

    fn order_body(created_at: serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "id": "order_9A33XWu170gUtm",
            "entity": "order",
            "amount": 2500,
            "amount_paid": 0,
            "amount_due": 2500,
            "currency": "INR",
            "receipt": "order_receipt_42",
            "status": "created",
            "attempts": 0,
            "notes": { "internal_order_id": "42" },
            "created_at": created_at
        })
    }

    #[tokio::test]
    async fn test_create_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/orders"))
            .and(header_exists("authorization"))
            .and(body_json(serde_json::json!({
                "amount": 2500,
                "currency": "INR",
                "receipt": "order_receipt_42",
                "notes": { "internal_order_id": "42", "user_email": "asha@example.com" }
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(order_body(serde_json::json!(1_700_000_000))),
            )
            .expect(1)
            .mount(&server)
            .await;

        let order = gateway(&server.uri()).create_order(&request()).await.unwrap();

        assert_eq!(order.id, "order_9A33XWu170gUtm");
        assert_eq!(order.amount, 2500);
        assert_eq!(order.amount_due, 2500);
        assert_eq!(order.status, "created");
        assert_eq!(order.created_at.timestamp(), 1_700_000_000);
    }

    #[tokio::test]
    async fn test_create_order_rfc3339_timestamp() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/orders"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(order_body(serde_json::json!("2023-11-14T22:13:20Z"))),
            )
            .mount(&server)
            .await;

        let order = gateway(&server.uri()).create_order(&request()).await.unwrap();
        assert_eq!(order.created_at.timestamp(), 1_700_000_000);
    }

    #[tokio::test]
    async fn test_remote_error_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/orders"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {
                    "code": "BAD_REQUEST_ERROR",
                    "description": "The amount must be at least INR 1.00"
                }
            })))
            .mount(&server)
            .await;

        let err = gateway(&server.uri()).create_order(&request()).await.unwrap_err();

        assert!(matches!(err, CommerceError::GatewayUnavailable { .. }));
        assert!(err.to_string().contains("BAD_REQUEST_ERROR"));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_unexpected_shape_is_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/orders"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .mount(&server)
            .await;

        let err = gateway(&server.uri()).create_order(&request()).await.unwrap_err();
        assert!(matches!(err, CommerceError::GatewayProtocolError(_)));

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/orders"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(order_body(serde_json::json!(true))),
            )
            .mount(&server)
            .await;

        let err = gateway(&server.uri()).create_order(&request()).await.unwrap_err();
        assert!(matches!(err, CommerceError::GatewayProtocolError(_)));
    }

    #[tokio::test]
    async fn test_timeout_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/orders"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(order_body(serde_json::json!(1_700_000_000)))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let err = gateway(&server.uri()).create_order(&request()).await.unwrap_err();
        assert!(matches!(err, CommerceError::GatewayUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_is_unavailable() {
        let err = gateway("http://127.0.0.1:1")
            .create_order(&request())
            .await
            .unwrap_err();
        assert!(matches!(err, CommerceError::GatewayUnavailable { .. }));
    }

    #[test]
    fn test_verify_webhook() {
        let gateway = gateway("http://127.0.0.1:1");
        let body = captured_payload("order_receipt_42");
        let signature = compute_signature("whsec", body.as_bytes()).unwrap();

        let event = gateway.verify_webhook(body.as_bytes(), &signature).unwrap();
        assert_eq!(event.payment_status, "captured");

        let err = gateway.verify_webhook(body.as_bytes(), "00ff").unwrap_err();
        assert!(matches!(err, CommerceError::AuthenticationFailed(_)));
    }

    #[test]
    fn test_verify_before_parse() {
        let gateway = gateway("http://127.0.0.1:1");
        let body = b"not json";

        let err = gateway.verify_webhook(body, "00ff").unwrap_err();
        assert!(matches!(err, CommerceError::AuthenticationFailed(_)));

        let signature = compute_signature("whsec", body).unwrap();
        let err = gateway.verify_webhook(body, &signature).unwrap_err();
        assert!(matches!(err, CommerceError::MalformedPayload(_)));
    }
}
