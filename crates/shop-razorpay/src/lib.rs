//! # shop-razorpay
//!
//! Razorpay payment gateway for shopfront-rs.
//!
//! - **RazorpayGateway** creates orders through the Orders API and verifies
//!   webhook deliveries signed with `X-Razorpay-Signature`.
//! - **RazorpayConfig** loads keys and the webhook secret from the environment.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use shop_razorpay::RazorpayGateway;
//! use shop_core::{PaymentService, PaymentReconciler};
//!
//! let gateway = Arc::new(RazorpayGateway::from_env()?);
//! let payments = PaymentService::new(store.clone(), gateway.clone());
//! let reconciler = PaymentReconciler::new(store, gateway);
//! ```
//!
//! Enable these events on the dashboard webhook: see [`REQUIRED_WEBHOOK_EVENTS`].

pub mod config;
pub mod gateway;
pub mod webhook;

// Re-exports
pub use config::RazorpayConfig;
pub use gateway::RazorpayGateway;
pub use webhook::{compute_signature, verify_signature, REQUIRED_WEBHOOK_EVENTS, SIGNATURE_HEADER};
