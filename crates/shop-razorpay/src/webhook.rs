//! # Razorpay Webhook Handling
//!
//! Razorpay signs each delivery with `X-Razorpay-Signature`, the hex
//! HMAC-SHA256 of the raw request body keyed with the webhook secret.
//! The signature is checked over the exact bytes received; the body is only
//! parsed afterwards.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use shop_core::{CommerceError, CommerceResult, WebhookEvent};
use std::collections::BTreeMap;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the delivery signature
pub const SIGNATURE_HEADER: &str = "X-Razorpay-Signature";

/// Events that should be enabled on the Razorpay webhook for full functionality
pub const REQUIRED_WEBHOOK_EVENTS: &[&str] = &["payment.captured", "payment.failed", "order.paid"];

/// Verify `signature` against the HMAC of `payload` in constant time
pub fn verify_signature(secret: &str, payload: &[u8], signature: &str) -> CommerceResult<()> {
    let expected = hex::decode(signature.trim()).map_err(|_| {
        CommerceError::AuthenticationFailed("signature is not valid hex".to_string())
    })?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| CommerceError::Configuration(format!("invalid webhook secret: {}", e)))?;
    mac.update(payload);
    mac.verify_slice(&expected)
        .map_err(|_| CommerceError::AuthenticationFailed("signature mismatch".to_string()))
}

/// Hex HMAC-SHA256 of `payload`, as Razorpay computes it
pub fn compute_signature(secret: &str, payload: &[u8]) -> CommerceResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| CommerceError::Configuration(format!("invalid webhook secret: {}", e)))?;
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Parse an already-verified webhook body
pub fn parse_event(payload: &[u8]) -> CommerceResult<WebhookEvent> {
    let envelope: WebhookEnvelope = serde_json::from_slice(payload).map_err(|e| {
        CommerceError::MalformedPayload(format!("Failed to parse webhook: {}", e))
    })?;

    let payment = envelope.payload.payment.entity;
    let receipt = payment.receipt.or_else(|| {
        envelope
            .payload
            .order
            .and_then(|order| order.entity.receipt)
    });

    debug!(
        event = %envelope.event,
        account_id = ?envelope.account_id,
        payment_id = ?payment.id,
        "parsed Razorpay webhook"
    );

    Ok(WebhookEvent {
        event: envelope.event,
        remote_order_id: payment.order_id,
        payment_status: payment.status,
        receipt,
        notes: string_notes(&payment.notes),
    })
}

/// Razorpay sends `notes` as an object, or as `[]` when empty
fn string_notes(notes: &serde_json::Value) -> BTreeMap<String, String> {
    notes
        .as_object()
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| match v {
                    serde_json::Value::String(s) => Some((k.clone(), s.clone())),
                    serde_json::Value::Number(n) => Some((k.clone(), n.to_string())),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

// =============================================================================
// Razorpay Webhook Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct WebhookEnvelope {
    event: String,
    #[serde(default)]
    account_id: Option<String>,
    payload: WebhookPayload,
}

#[derive(Debug, Deserialize)]
struct WebhookPayload {
    payment: EntityWrapper<PaymentEntity>,
    #[serde(default)]
    order: Option<EntityWrapper<OrderEntity>>,
}

#[derive(Debug, Deserialize)]
struct EntityWrapper<T> {
    entity: T,
}

#[derive(Debug, Deserialize)]
struct PaymentEntity {
    #[serde(default)]
    id: Option<String>,
    order_id: String,
    status: String,
    #[serde(default)]
    receipt: Option<String>,
    #[serde(default)]
    notes: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct OrderEntity {
    #[serde(default)]
    receipt: Option<String>,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn captured_payload(receipt: &str) -> String {
        serde_json::json!({
            "entity": "event",
            "account_id": "acc_test",
            "event": "payment.captured",
            "contains": ["payment"],
            "payload": {
                "payment": {
                    "entity": {
                        "id": "pay_29QQoUBi66xm2f",
                        "entity": "payment",
                        "amount": 2500,
                        "currency": "INR",
                        "status": "captured",
                        "order_id": "order_9A33XWu170gUtm",
                        "receipt": receipt,
                        "notes": { "internal_order_id": "42" }
                    }
                }
            },
            "created_at": 1_700_000_000
        })
        .to_string()
    }

    #[test]
    fn test_signature_roundtrip() {
        let body = captured_payload("order_receipt_42");
        let sig = compute_signature("whsec", body.as_bytes()).unwrap();

        assert_eq!(sig.len(), 64);
        assert!(verify_signature("whsec", body.as_bytes(), &sig).is_ok());
    }

    #[test]
    fn test_signature_mismatch() {
        let body = captured_payload("order_receipt_42");
        let sig = compute_signature("other-secret", body.as_bytes()).unwrap();

        let err = verify_signature("whsec", body.as_bytes(), &sig).unwrap_err();
        assert!(matches!(err, CommerceError::AuthenticationFailed(_)));

        let err = verify_signature("whsec", body.as_bytes(), "not-hex").unwrap_err();
        assert!(matches!(err, CommerceError::AuthenticationFailed(_)));
    }

    #[test]
    fn test_reserialized_body_fails_verification() {
        let body = captured_payload("order_receipt_42");
        let sig = compute_signature("whsec", body.as_bytes()).unwrap();

        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        let pretty = serde_json::to_string_pretty(&value).unwrap();

        assert!(verify_signature("whsec", pretty.as_bytes(), &sig).is_err());
    }

    #[test]
    fn test_parse_captured_event() {
        let event = parse_event(captured_payload("order_receipt_42").as_bytes()).unwrap();

        assert_eq!(event.event, "payment.captured");
        assert_eq!(event.payment_status, "captured");
        assert_eq!(event.remote_order_id, "order_9A33XWu170gUtm");
        assert_eq!(event.receipt.as_deref(), Some("order_receipt_42"));
        assert_eq!(event.notes.get("internal_order_id").map(String::as_str), Some("42"));
    }

    #[test]
    fn test_receipt_from_order_entity_and_empty_notes() {
        let body = serde_json::json!({
            "event": "order.paid",
            "payload": {
                "payment": { "entity": { "order_id": "order_1", "status": "captured", "notes": [] } },
                "order": { "entity": { "id": "order_1", "receipt": "order_receipt_7" } }
            }
        })
        .to_string();

        let event = parse_event(body.as_bytes()).unwrap();
        assert_eq!(event.receipt.as_deref(), Some("order_receipt_7"));
        assert!(event.notes.is_empty());
    }

    #[test]
    fn test_missing_fields_are_malformed() {
        let err = parse_event(br#"{"event":"payment.captured","payload":{}}"#).unwrap_err();
        assert!(matches!(err, CommerceError::MalformedPayload(_)));

        let err = parse_event(b"not json").unwrap_err();
        assert!(matches!(err, CommerceError::MalformedPayload(_)));
    }
}
