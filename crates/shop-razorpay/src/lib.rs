//! # shop-razorpay
//!
//! Razorpay payment gateway for the NexTick storefront.
//!
//! [`RazorpayGateway`] implements `shop_core::PaymentGateway` on top of the
//! Razorpay Orders API:
//! - creates gateway orders for online checkouts and wallet top-ups
//! - fetches payments to confirm their capture state
//! - verifies the checkout callback signature
//! - verifies and parses webhooks
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use shop_razorpay::RazorpayGateway;
//! use shop_core::PaymentGateway;
//!
//! let gateway = RazorpayGateway::from_env()?;
//! let order = gateway.create_order(&amount_due, &receipt).await?;
//!
//! // hand order.id and gateway.key_id() to the checkout widget, then:
//! gateway.verify_payment_signature(&order.id, &payment_id, &signature)?;
//! ```
//!
//! ## Webhook Handling
//!
//! ```rust,ignore
//! use shop_razorpay::{dispatch_webhook_event, CapturedPayment, WebhookHandler};
//!
//! struct Confirmer;
//!
//! impl WebhookHandler for Confirmer {
//!     fn on_payment_captured(&self, data: CapturedPayment) -> ShopResult<()> {
//!         // mark the order paid
//!         Ok(())
//!     }
//! }
//!
//! let event = gateway.verify_webhook(payload, signature).await?;
//! dispatch_webhook_event(&Confirmer, event)?;
//! ```

pub mod client;
pub mod config;
pub mod webhook;

// Re-exports
pub use client::{compute_hmac_sha256, RazorpayGateway};
pub use config::RazorpayConfig;
pub use webhook::{
    dispatch_webhook_event, CapturedPayment, LoggingWebhookHandler, WebhookHandler,
    REQUIRED_WEBHOOK_EVENTS,
};
