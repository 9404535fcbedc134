//! # Application State
//!
//! Shared state for the Axum application.
//! Holds the store, the services built over it, and configuration.

use shop_core::{
    BoxedPaymentGateway, CartService, CheckoutService, InMemoryStore, PaymentReconciler,
    PaymentService, SeedCatalog, SharedStore,
};
use shop_razorpay::RazorpayGateway;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

const DEFAULT_CATALOG_PATH: &str = "config/catalog.toml";

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Environment (development, staging, production)
    pub environment: String,
    /// TOML seed catalog loaded into the store at startup
    pub catalog_path: String,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            catalog_path: std::env::var("CATALOG_PATH")
                .unwrap_or_else(|_| DEFAULT_CATALOG_PATH.to_string()),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid socket address {}:{}: {}", self.host, self.port, e))
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: AppConfig,
    pub store: SharedStore,
    pub carts: CartService,
    pub checkout: CheckoutService,
    pub payments: PaymentService,
    pub reconciler: PaymentReconciler,
    /// Name of the configured payment provider
    pub provider: &'static str,
}

impl AppState {
    /// Create state from the environment: seed catalog plus Razorpay
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();

        let catalog = load_catalog(&config.catalog_path)?;
        let store: SharedStore = Arc::new(InMemoryStore::from_catalog(catalog));

        let gateway = RazorpayGateway::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to initialize Razorpay: {}", e))?;
        if gateway.config().is_live_mode() {
            tracing::info!("Razorpay running with live keys");
        }

        Ok(Self::with_gateway(config, store, Arc::new(gateway)))
    }

    /// Wire services over an existing store and gateway
    pub fn with_gateway(
        config: AppConfig,
        store: SharedStore,
        gateway: BoxedPaymentGateway,
    ) -> Self {
        Self {
            provider: gateway.provider_name(),
            carts: CartService::new(store.clone()),
            checkout: CheckoutService::new(store.clone()),
            payments: PaymentService::new(store.clone(), gateway.clone()),
            reconciler: PaymentReconciler::new(store.clone(), gateway),
            store,
            config,
        }
    }
}

/// Load the seed catalog; a missing file yields an empty catalog
pub fn load_catalog(path: impl AsRef<Path>) -> anyhow::Result<SeedCatalog> {
    let path = path.as_ref();
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let catalog = SeedCatalog::from_toml_str(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
            tracing::info!(
                "Loaded {} users, {} products from {}",
                catalog.users.len(),
                catalog.products.len(),
                path.display()
            );
            Ok(catalog)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!("No catalog found at {}, using empty store", path.display());
            Ok(SeedCatalog::new())
        }
        Err(e) => Err(anyhow::anyhow!("Failed to read {}: {}", path.display(), e)),
    }
}
