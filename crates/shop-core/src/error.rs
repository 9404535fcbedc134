//! # Commerce Error Types
//!
//! Typed error handling for the checkout and payment pipeline.
//! All core operations return `Result<T, CommerceError>`; callers branch on
//! the variant (or on [`CommerceError::kind`]), never on the message text.

use serde::Serialize;
use thiserror::Error;

/// Boxed underlying cause carried by gateway failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Core error type for all commerce operations
#[derive(Debug, Error)]
pub enum CommerceError {
    /// Missing user, cart, order or product
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation not allowed in the current state (empty cart, bad quantity)
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Caller supplied data that disagrees with the server's records
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Webhook signature did not match
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Webhook body could not be parsed or lacks required fields
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Transport or remote failure talking to the payment gateway
    #[error("Payment gateway unavailable: {message}")]
    GatewayUnavailable {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Gateway answered with a shape we do not understand
    #[error("Payment gateway protocol error: {0}")]
    GatewayProtocolError(String),

    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error (store invariant broken)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Closed set of failure categories exposed to API clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    InvalidRequest,
    AuthenticationFailed,
    MalformedPayload,
    GatewayUnavailable,
    GatewayProtocolError,
    Configuration,
    Internal,
}

impl CommerceError {
    /// Build a `GatewayUnavailable` wrapping the underlying cause
    pub fn gateway_unavailable(
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        CommerceError::GatewayUnavailable {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// The failure category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            CommerceError::NotFound(_) => ErrorKind::NotFound,
            CommerceError::InvalidState(_) => ErrorKind::InvalidState,
            CommerceError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            CommerceError::AuthenticationFailed(_) => ErrorKind::AuthenticationFailed,
            CommerceError::MalformedPayload(_) => ErrorKind::MalformedPayload,
            CommerceError::GatewayUnavailable { .. } => ErrorKind::GatewayUnavailable,
            CommerceError::GatewayProtocolError(_) => ErrorKind::GatewayProtocolError,
            CommerceError::Configuration(_) => ErrorKind::Configuration,
            CommerceError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Returns true if retrying the same call may succeed.
    ///
    /// Webhook deliveries that fail with a non-retryable error are still
    /// reported as failures, but the gateway gains nothing by redelivering.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CommerceError::GatewayUnavailable { .. } | CommerceError::Internal(_)
        )
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            CommerceError::NotFound(_) => 404,
            CommerceError::InvalidState(_) => 409,
            CommerceError::InvalidRequest(_) => 400,
            CommerceError::AuthenticationFailed(_) => 401,
            CommerceError::MalformedPayload(_) => 422,
            CommerceError::GatewayUnavailable { .. } => 503,
            CommerceError::GatewayProtocolError(_) => 502,
            CommerceError::Configuration(_) => 500,
            CommerceError::Internal(_) => 500,
        }
    }
}

/// Result type alias for commerce operations
pub type CommerceResult<T> = Result<T, CommerceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_retryable_errors() {
        assert!(CommerceError::gateway_unavailable("timeout", "connect refused").is_retryable());
        assert!(!CommerceError::MalformedPayload("bad json".into()).is_retryable());
        assert!(!CommerceError::NotFound("order 9".into()).is_retryable());
        assert!(!CommerceError::AuthenticationFailed("bad sig".into()).is_retryable());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(CommerceError::InvalidRequest("x".into()).status_code(), 400);
        assert_eq!(CommerceError::NotFound("x".into()).status_code(), 404);
        assert_eq!(CommerceError::InvalidState("x".into()).status_code(), 409);
        assert_eq!(
            CommerceError::AuthenticationFailed("x".into()).status_code(),
            401
        );
        assert_eq!(
            CommerceError::GatewayProtocolError("x".into()).status_code(),
            502
        );
    }

    #[test]
    fn test_gateway_unavailable_keeps_source() {
        let err = CommerceError::gateway_unavailable("create order failed", "dns failure");
        assert_eq!(err.kind(), ErrorKind::GatewayUnavailable);
        assert_eq!(err.source().map(|s| s.to_string()), Some("dns failure".to_string()));
    }
}
