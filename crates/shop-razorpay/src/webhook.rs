//! # Razorpay Webhook Handling
//!
//! Routes verified gateway events to a [`WebhookHandler`].
//! Webhooks back up the checkout callback: a shopper who closes the tab
//! after paying still gets the order confirmed from `payment.captured`.

use shop_core::{GatewayEvent, GatewayEventType, ShopError, ShopResult};
use tracing::{debug, info, warn};

/// Payment details carried by `payment.captured` and `order.paid`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedPayment {
    /// Gateway order id (`order_...`)
    pub order_id: String,
    /// Gateway payment id (`pay_...`)
    pub payment_id: String,
    /// Amount in paise
    pub amount: i64,
}

impl CapturedPayment {
    /// Pull the payment out of a verified event
    pub fn from_event(event: &GatewayEvent) -> ShopResult<Self> {
        let order_id = event.order_id.clone().ok_or_else(|| {
            ShopError::WebhookParseError("Missing order id".to_string())
        })?;

        let payment_id = event.payment_id.clone().ok_or_else(|| {
            ShopError::WebhookParseError("Missing payment id".to_string())
        })?;

        Ok(Self {
            order_id,
            payment_id,
            amount: event.amount.unwrap_or(0),
        })
    }
}

/// Webhook event handler trait
///
/// Implement this trait to act on gateway events. Every method logs and
/// succeeds by default.
#[allow(unused_variables)]
pub trait WebhookHandler: Send + Sync {
    /// Called when a payment is captured
    fn on_payment_captured(&self, data: CapturedPayment) -> ShopResult<()> {
        info!(
            "Payment captured: payment={}, order={}, amount={}",
            data.payment_id, data.order_id, data.amount
        );
        Ok(())
    }

    /// Called when a payment attempt fails
    fn on_payment_failed(&self, event: &GatewayEvent) -> ShopResult<()> {
        warn!("Payment failed: {:?} for order {:?}", event.payment_id, event.order_id);
        Ok(())
    }

    /// Called when every payment for a gateway order is captured
    fn on_order_paid(&self, data: CapturedPayment) -> ShopResult<()> {
        info!("Order paid: order={}, payment={}", data.order_id, data.payment_id);
        Ok(())
    }

    /// Called when a gateway-side refund completes
    fn on_refund_processed(&self, event: &GatewayEvent) -> ShopResult<()> {
        info!("Refund processed: {:?}, amount={:?}", event.payment_id, event.amount);
        Ok(())
    }

    /// Called for unknown/unhandled events
    fn on_unknown_event(&self, event: &GatewayEvent) -> ShopResult<()> {
        debug!("Unhandled webhook event: {:?}", event.event_type);
        Ok(())
    }
}

/// Default webhook handler (just logs events)
pub struct LoggingWebhookHandler;

impl WebhookHandler for LoggingWebhookHandler {}

/// Dispatch a webhook event to the appropriate handler method
pub fn dispatch_webhook_event(handler: &dyn WebhookHandler, event: GatewayEvent) -> ShopResult<()> {
    match &event.event_type {
        GatewayEventType::PaymentCaptured => {
            handler.on_payment_captured(CapturedPayment::from_event(&event)?)
        }
        GatewayEventType::PaymentFailed => handler.on_payment_failed(&event),
        GatewayEventType::OrderPaid => handler.on_order_paid(CapturedPayment::from_event(&event)?),
        GatewayEventType::RefundProcessed => handler.on_refund_processed(&event),
        GatewayEventType::Unknown(_) => handler.on_unknown_event(&event),
    }
}

/// Events to enable on the Razorpay dashboard webhook
pub const REQUIRED_WEBHOOK_EVENTS: &[&str] = &[
    "payment.captured",
    "payment.failed",
    "order.paid",
    "refund.processed",
];
