//! # Shop Error Types
//!
//! Typed error handling for the storefront and back-office.
//! All shop operations return `Result<T, ShopError>`.

use crate::money::Price;
use crate::order::OrderStatus;
use thiserror::Error;

/// Core error type for all shop operations
#[derive(Debug, Error)]
pub enum ShopError {
    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A document the request refers to does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Unique name/code already taken, or a dependent document blocks the change
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Customer account is blocked by the admin
    #[error("Customer account is blocked: {customer_id}")]
    CustomerBlocked { customer_id: String },

    /// The caller may not act on this document
    #[error("Not permitted: {0}")]
    NotPermitted(String),

    /// Not enough units left
    #[error("Insufficient stock for {product}: only {available} available")]
    OutOfStock { product: String, available: u32 },

    /// Per-product cart limit reached
    #[error("Maximum of {max} units per product")]
    QuantityLimit { max: u32 },

    /// Status change not allowed by the order lifecycle
    #[error("Invalid status change from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Coupon cannot be applied
    #[error("Coupon rejected: {0}")]
    CouponRejected(String),

    /// Wallet balance too low
    #[error("Insufficient wallet balance: required {}, available {}", .required.display(), .available.display())]
    InsufficientBalance { required: Price, available: Price },

    /// Payment method not allowed for this order
    #[error("Payment method not allowed: {0}")]
    PaymentNotAllowed(String),

    /// Checkout signature from the gateway did not match
    #[error("Invalid payment signature: {0}")]
    SignatureMismatch(String),

    /// Payment provider API error
    #[error("Provider error [{provider}]: {message}")]
    ProviderError { provider: String, message: String },

    /// Network/HTTP error communicating with provider
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Webhook signature verification failed
    #[error("Webhook verification failed: {0}")]
    WebhookVerificationFailed(String),

    /// Webhook payload parsing error
    #[error("Webhook parse error: {0}")]
    WebhookParseError(String),

    /// Rate limited by provider
    #[error("Rate limited by {provider}, retry after {retry_after_secs} seconds")]
    RateLimited {
        provider: String,
        retry_after_secs: u64,
    },

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ShopError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        ShopError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns true if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ShopError::NetworkError(_)
                | ShopError::RateLimited { .. }
                | ShopError::ProviderError { .. }
        )
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            ShopError::Configuration(_) => 500,
            ShopError::InvalidRequest(_) => 400,
            ShopError::NotFound { .. } => 404,
            ShopError::Conflict(_) => 409,
            ShopError::CustomerBlocked { .. } => 403,
            ShopError::NotPermitted(_) => 403,
            ShopError::OutOfStock { .. } => 409,
            ShopError::QuantityLimit { .. } => 400,
            ShopError::InvalidTransition { .. } => 400,
            ShopError::CouponRejected(_) => 400,
            ShopError::InsufficientBalance { .. } => 400,
            ShopError::PaymentNotAllowed(_) => 400,
            ShopError::SignatureMismatch(_) => 400,
            ShopError::ProviderError { .. } => 502,
            ShopError::NetworkError(_) => 503,
            ShopError::WebhookVerificationFailed(_) => 401,
            ShopError::WebhookParseError(_) => 400,
            ShopError::RateLimited { .. } => 429,
            ShopError::Internal(_) => 500,
            ShopError::Serialization(_) => 500,
        }
    }
}

/// Result type alias for shop operations
pub type ShopResult<T> = Result<T, ShopError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;

    #[test]
    fn test_retryable_errors() {
        assert!(ShopError::NetworkError("timeout".into()).is_retryable());
        assert!(ShopError::RateLimited {
            provider: "razorpay".into(),
            retry_after_secs: 60
        }
        .is_retryable());
        assert!(!ShopError::InvalidRequest("bad data".into()).is_retryable());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ShopError::InvalidRequest("test".into()).status_code(), 400);
        assert_eq!(ShopError::not_found("Product", "x").status_code(), 404);
        assert_eq!(
            ShopError::CustomerBlocked {
                customer_id: "c".into()
            }
            .status_code(),
            403
        );
        assert_eq!(
            ShopError::InvalidTransition {
                from: OrderStatus::Delivered,
                to: OrderStatus::Pending
            }
            .status_code(),
            400
        );
    }

    #[test]
    fn test_balance_message() {
        let err = ShopError::InsufficientBalance {
            required: Price::from_minor(150_00, Currency::INR),
            available: Price::from_minor(20_00, Currency::INR),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient wallet balance: required ₹150.00, available ₹20.00"
        );
    }
}
