//! # Payment Gateway Trait
//!
//! Online payments go through a hosted gateway checkout. The shop creates a
//! gateway order for the amount due, the shopper pays in the gateway's
//! widget, and the browser posts back the payment id with a signature that
//! the gateway implementation verifies before the order is confirmed.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    PaymentGateway (trait)                   │
//! │  ├── create_order()                                         │
//! │  ├── fetch_payment()                                        │
//! │  ├── verify_payment_signature()                             │
//! │  └── verify_webhook()                                       │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                   ┌────────┴────────┐
//!                   │ RazorpayGateway │
//!                   └─────────────────┘
//! ```

use crate::error::ShopResult;
use crate::money::Price;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// An order created on the gateway side
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayOrder {
    /// Gateway's order id (e.g. `order_...`)
    pub id: String,
    pub amount: Price,
    /// Our reference (order id or top-up id)
    pub receipt: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    Created,
    Authorized,
    Captured,
    Refunded,
    Failed,
}

impl PaymentState {
    pub fn parse(s: &str) -> Self {
        match s {
            "authorized" => PaymentState::Authorized,
            "captured" => PaymentState::Captured,
            "refunded" => PaymentState::Refunded,
            "failed" => PaymentState::Failed,
            _ => PaymentState::Created,
        }
    }
}

/// A payment as reported by the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayPayment {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    pub amount: Price,
    pub state: PaymentState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

impl GatewayPayment {
    pub fn is_captured(&self) -> bool {
        self.state == PaymentState::Captured
    }
}

/// Webhook event types we care about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayEventType {
    PaymentCaptured,
    PaymentFailed,
    OrderPaid,
    RefundProcessed,
    /// Unknown event (passthrough)
    Unknown(String),
}

/// A verified webhook event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayEvent {
    pub event_type: GatewayEventType,
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    /// Amount in smallest unit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
    /// Raw event data (for debugging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<serde_json::Value>,
    pub received_at: DateTime<Utc>,
}

/// Core trait for payment gateway implementations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a gateway order for `amount`.
    ///
    /// # Arguments
    /// * `amount` - Amount due, in the store currency
    /// * `receipt` - Our reference, echoed back by the gateway
    async fn create_order(&self, amount: &Price, receipt: &str) -> ShopResult<GatewayOrder>;

    /// Look a payment up on the gateway.
    async fn fetch_payment(&self, payment_id: &str) -> ShopResult<GatewayPayment>;

    /// Verify the signature the checkout widget returned for a payment.
    fn verify_payment_signature(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> ShopResult<()>;

    /// Verify a webhook signature and parse the event.
    ///
    /// # Arguments
    /// * `payload` - Raw webhook body bytes
    /// * `signature` - Signature header from the request
    async fn verify_webhook(&self, payload: &[u8], signature: &str) -> ShopResult<GatewayEvent>;

    /// Get the provider name (for logging and routing).
    fn provider_name(&self) -> &'static str;

    /// Public key id handed to the checkout widget
    fn key_id(&self) -> &str;

    /// Get the webhook endpoint path for this provider.
    /// Default: `/webhook/{provider_name}`
    fn webhook_path(&self) -> String {
        format!("/webhook/{}", self.provider_name())
    }
}

/// Type alias for a shared payment gateway (dynamic dispatch)
pub type BoxedPaymentGateway = Arc<dyn PaymentGateway>;
