//! # Application State
//!
//! Shared state for the Axum application: the shop, the payment gateway
//! and the server configuration.

use shop_core::{BoxedPaymentGateway, CatalogSeed, Shop, ShopError, ShopResult};
use shop_razorpay::RazorpayGateway;
use std::net::{AddrParseError, SocketAddr};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the storefront
    pub base_url: String,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Name shown on the checkout widget
    pub store_name: String,
    /// Seed catalog loaded at startup, if the file exists
    pub catalog_path: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            base_url: "http://localhost:8080".to_string(),
            environment: "development".to_string(),
            store_name: "NexTick".to_string(),
            catalog_path: "config/catalog.toml".to_string(),
        }
    }
}

impl AppConfig {
    /// Load from environment variables, falling back to the defaults
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            base_url: std::env::var("BASE_URL").unwrap_or(defaults.base_url),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            store_name: std::env::var("STORE_NAME").unwrap_or(defaults.store_name),
            catalog_path: std::env::var("CATALOG_PATH").unwrap_or(defaults.catalog_path),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub shop: Arc<Shop>,
    pub gateway: BoxedPaymentGateway,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(shop: Arc<Shop>, gateway: BoxedPaymentGateway, config: AppConfig) -> Self {
        Self {
            shop,
            gateway,
            config,
        }
    }

    /// Build the state from the environment: Razorpay keys, server config
    /// and the seed catalog.
    pub fn from_env() -> ShopResult<Self> {
        let config = AppConfig::from_env();
        let gateway = RazorpayGateway::from_env()?;
        let shop = Shop::default();

        if let Some(seed) = load_catalog_seed(&config.catalog_path)? {
            shop.seed(seed)?;
        }

        Ok(Self::new(Arc::new(shop), Arc::new(gateway), config))
    }
}

/// Read the seed catalog, `None` when the file is absent
pub fn load_catalog_seed(path: impl AsRef<Path>) -> ShopResult<Option<CatalogSeed>> {
    let path = path.as_ref();
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => {
            warn!("No seed catalog at {}, starting empty", path.display());
            return Ok(None);
        }
    };

    let seed = CatalogSeed::from_toml(&content).map_err(|e| {
        ShopError::Configuration(format!("Failed to parse {}: {}", path.display(), e))
    })?;
    info!(
        "Loaded seed catalog from {}: {} categories, {} brands, {} products",
        path.display(),
        seed.categories.len(),
        seed.brands.len(),
        seed.products.len()
    );
    Ok(Some(seed))
}
