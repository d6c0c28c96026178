//! # Razorpay Configuration
//!
//! API keys and the webhook secret are loaded from environment variables.

use shop_core::ShopError;
use std::env;

pub const DEFAULT_API_BASE_URL: &str = "https://api.razorpay.com";

/// Razorpay API configuration
#[derive(Debug, Clone)]
pub struct RazorpayConfig {
    /// Key id (rzp_test_... or rzp_live_...), also handed to the checkout widget
    pub key_id: String,

    /// Key secret, signs checkout callbacks
    pub key_secret: String,

    /// Webhook secret set in the Razorpay dashboard
    pub webhook_secret: Option<String>,

    /// API base URL (for testing/mocking)
    pub api_base_url: String,
}

impl RazorpayConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `RAZORPAY_KEY_ID`
    /// - `RAZORPAY_KEY_SECRET`
    ///
    /// Optional:
    /// - `RAZORPAY_WEBHOOK_SECRET` (webhooks are rejected without it)
    pub fn from_env() -> Result<Self, ShopError> {
        dotenvy::dotenv().ok();

        let key_id = env::var("RAZORPAY_KEY_ID")
            .map_err(|_| ShopError::Configuration("RAZORPAY_KEY_ID not set".to_string()))?;

        let key_secret = env::var("RAZORPAY_KEY_SECRET")
            .map_err(|_| ShopError::Configuration("RAZORPAY_KEY_SECRET not set".to_string()))?;

        if !key_id.starts_with("rzp_") {
            return Err(ShopError::Configuration(
                "RAZORPAY_KEY_ID must start with rzp_test_ or rzp_live_".to_string(),
            ));
        }

        if key_secret.trim().is_empty() {
            return Err(ShopError::Configuration(
                "RAZORPAY_KEY_SECRET is empty".to_string(),
            ));
        }

        let webhook_secret = env::var("RAZORPAY_WEBHOOK_SECRET")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let api_base_url = env::var("RAZORPAY_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string());

        Ok(Self {
            key_id,
            key_secret,
            webhook_secret,
            api_base_url,
        })
    }

    /// Create config with explicit values (for testing)
    pub fn new(key_id: impl Into<String>, key_secret: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
            key_secret: key_secret.into(),
            webhook_secret: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }

    /// Check if using test keys
    pub fn is_test_mode(&self) -> bool {
        self.key_id.starts_with("rzp_test_")
    }

    /// Check if using live keys
    pub fn is_live_mode(&self) -> bool {
        self.key_id.starts_with("rzp_live_")
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Builder: set the webhook secret
    pub fn with_webhook_secret(mut self, secret: impl Into<String>) -> Self {
        self.webhook_secret = Some(secret.into());
        self
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url, path)
    }
}
