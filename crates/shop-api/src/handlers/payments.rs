//! Online payments: gateway orders, checkout callbacks, wallet top-ups and
//! the gateway webhook.
//!
//! ```text
//!  place order / retry / top-up ──▶ gateway.create_order ──▶ widget
//!                                                             │
//!  verify callback ◀── razorpay_{order_id,payment_id,signature}
//!        │
//!        ├── order    ──▶ shop.confirm_online_payment
//!        └── top-up   ──▶ shop.complete_top_up
//!
//!  failure report ──▶ gateway.fetch_payment ──▶ captured? confirm : fail
//!
//!  /webhook/razorpay ──▶ verify_webhook ──▶ ShopWebhookHandler (same effects)
//! ```

use super::{bad_request, shop_error_to_response, ApiError, ApiResult};
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use shop_core::{
    GatewayEvent, Order, OrderUpdate, PaymentState, Price, Shop, ShopError, ShopResult, TopUp,
    Wallet,
};
use shop_razorpay::{dispatch_webhook_event, CapturedPayment, WebhookHandler};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

pub const SIGNATURE_HEADER: &str = "x-razorpay-signature";

/// What the checkout widget needs to open a payment
#[derive(Debug, Clone, Serialize)]
pub struct GatewayCheckout {
    pub provider: String,
    pub key_id: String,
    pub gateway_order_id: String,
    pub amount: Price,
    pub store_name: String,
}

/// Fields the checkout widget posts back after a payment
#[derive(Debug, Deserialize)]
pub struct PaymentCallback {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

#[derive(Debug, Deserialize)]
pub struct PaymentFailure {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
}

#[derive(Debug, Deserialize)]
pub struct TopUpRequest {
    /// Amount in paise
    pub amount: i64,
}

#[derive(Debug, Serialize)]
pub struct TopUpStarted {
    pub top_up: TopUp,
    pub payment: GatewayCheckout,
}

async fn create_gateway_checkout(
    state: &AppState,
    amount: &Price,
    receipt: &str,
) -> Result<GatewayCheckout, ApiError> {
    let gateway = &state.gateway;
    let gateway_order = gateway.create_order(amount, receipt).await.map_err(|e| {
        error!("Failed to create gateway order: {}", e);
        shop_error_to_response(e)
    })?;

    Ok(GatewayCheckout {
        provider: gateway.provider_name().to_string(),
        key_id: gateway.key_id().to_string(),
        gateway_order_id: gateway_order.id,
        amount: gateway_order.amount,
        store_name: state.config.store_name.clone(),
    })
}

/// Create a gateway order for an online order and attach it
pub(crate) async fn open_gateway_order(
    state: &AppState,
    order: Order,
) -> Result<(Order, GatewayCheckout), ApiError> {
    let checkout =
        create_gateway_checkout(state, &order.final_amount, &order.id.to_string()).await?;
    let order = state
        .shop
        .attach_gateway_order(order.id, &checkout.gateway_order_id)
        .map_err(shop_error_to_response)?;
    info!(
        "Gateway order {} opened for order {}",
        checkout.gateway_order_id, order.id
    );
    Ok((order, checkout))
}

/// Checkout callback for an online order
#[instrument(skip(state, callback), fields(gateway_order = %callback.razorpay_order_id))]
pub async fn verify_order_payment(
    State(state): State<AppState>,
    Path((customer_id, order_id)): Path<(Uuid, Uuid)>,
    Json(callback): Json<PaymentCallback>,
) -> ApiResult<OrderUpdate> {
    state
        .shop
        .customer_order(customer_id, order_id)
        .map_err(shop_error_to_response)?;
    state
        .gateway
        .verify_payment_signature(
            &callback.razorpay_order_id,
            &callback.razorpay_payment_id,
            &callback.razorpay_signature,
        )
        .map_err(shop_error_to_response)?;

    state
        .shop
        .confirm_online_payment(
            order_id,
            &callback.razorpay_order_id,
            &callback.razorpay_payment_id,
            true,
        )
        .map(Json)
        .map_err(shop_error_to_response)
}

/// Look up a payment the widget reported as failed. Returns `true` when the
/// gateway actually captured it.
async fn reported_outcome(state: &AppState, failure: &PaymentFailure) -> Result<bool, ApiError> {
    let payment = state
        .gateway
        .fetch_payment(&failure.razorpay_payment_id)
        .await
        .map_err(|e| {
            error!("Failed to fetch payment {}: {}", failure.razorpay_payment_id, e);
            shop_error_to_response(e)
        })?;
    if let Some(order_id) = &payment.order_id {
        if order_id != &failure.razorpay_order_id {
            warn!(
                "Payment {} belongs to {}, not {}",
                payment.id, order_id, failure.razorpay_order_id
            );
            return Err(bad_request("Payment does not belong to this gateway order"));
        }
    }

    match payment.state {
        PaymentState::Captured => {
            info!("Payment {} reported failed but was captured", payment.id);
            Ok(true)
        }
        PaymentState::Failed => Ok(false),
        other => Err(shop_error_to_response(ShopError::Conflict(format!(
            "Payment {} is {:?} and not settled yet",
            payment.id, other
        )))),
    }
}

/// The widget reported a failed payment; the order stays open for a retry
pub async fn order_payment_failed(
    State(state): State<AppState>,
    Path((customer_id, order_id)): Path<(Uuid, Uuid)>,
    Json(failure): Json<PaymentFailure>,
) -> ApiResult<OrderUpdate> {
    state
        .shop
        .customer_order(customer_id, order_id)
        .map_err(shop_error_to_response)?;
    let captured = reported_outcome(&state, &failure).await?;

    state
        .shop
        .confirm_online_payment(
            order_id,
            &failure.razorpay_order_id,
            &failure.razorpay_payment_id,
            captured,
        )
        .map(Json)
        .map_err(shop_error_to_response)
}

/// Open a fresh gateway order for an unpaid online order
#[instrument(skip(state))]
pub async fn retry_payment(
    State(state): State<AppState>,
    Path((customer_id, order_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<GatewayCheckout> {
    let order = state
        .shop
        .retryable_order(customer_id, order_id)
        .map_err(shop_error_to_response)?;
    let (_, checkout) = open_gateway_order(&state, order).await?;
    Ok(Json(checkout))
}

#[instrument(skip(state, request), fields(amount = request.amount))]
pub async fn start_top_up(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
    Json(request): Json<TopUpRequest>,
) -> Result<(StatusCode, Json<TopUpStarted>), ApiError> {
    let amount = Price::check_amount(request.amount, "Top-up amount")
        .map(|minor| Price::from_minor(minor, state.shop.currency()))
        .map_err(shop_error_to_response)?;
    state
        .shop
        .customer(customer_id)
        .map_err(shop_error_to_response)?;

    let receipt = format!("topup_{}", Uuid::new_v4().simple());
    let payment = create_gateway_checkout(&state, &amount, &receipt).await?;
    let top_up = state
        .shop
        .begin_top_up(customer_id, amount, &payment.gateway_order_id)
        .map_err(shop_error_to_response)?;

    Ok((StatusCode::CREATED, Json(TopUpStarted { top_up, payment })))
}

#[instrument(skip(state, callback), fields(gateway_order = %callback.razorpay_order_id))]
pub async fn verify_top_up(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
    Json(callback): Json<PaymentCallback>,
) -> ApiResult<Wallet> {
    state
        .shop
        .top_up(customer_id, &callback.razorpay_order_id)
        .map_err(shop_error_to_response)?;
    state
        .gateway
        .verify_payment_signature(
            &callback.razorpay_order_id,
            &callback.razorpay_payment_id,
            &callback.razorpay_signature,
        )
        .map_err(shop_error_to_response)?;

    state
        .shop
        .complete_top_up(&callback.razorpay_order_id, &callback.razorpay_payment_id)
        .map(Json)
        .map_err(shop_error_to_response)
}

pub async fn top_up_failed(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
    Json(failure): Json<PaymentFailure>,
) -> ApiResult<Wallet> {
    state
        .shop
        .top_up(customer_id, &failure.razorpay_order_id)
        .map_err(shop_error_to_response)?;

    let result = if reported_outcome(&state, &failure).await? {
        state
            .shop
            .complete_top_up(&failure.razorpay_order_id, &failure.razorpay_payment_id)
    } else {
        state.shop.fail_top_up(&failure.razorpay_order_id)
    };
    result.map(Json).map_err(shop_error_to_response)
}

// =============================================================================
// Webhook
// =============================================================================

/// Applies gateway events to the shop: confirms online orders and settles
/// wallet top-ups that the browser callback never reported.
pub struct ShopWebhookHandler {
    shop: Arc<Shop>,
}

impl ShopWebhookHandler {
    pub fn new(shop: Arc<Shop>) -> Self {
        Self { shop }
    }

    fn settle(&self, gateway_order_id: &str, payment_id: &str, captured: bool) -> ShopResult<()> {
        if let Some(order) = self.shop.order_by_gateway_order(gateway_order_id)? {
            self.shop
                .confirm_online_payment(order.id, gateway_order_id, payment_id, captured)?;
            return Ok(());
        }

        if self.shop.is_top_up(gateway_order_id)? {
            let result = if captured {
                self.shop.complete_top_up(gateway_order_id, payment_id)
            } else {
                self.shop.fail_top_up(gateway_order_id)
            };
            return match result {
                Ok(_) => Ok(()),
                // Already settled by the browser callback
                Err(ShopError::Conflict(reason)) => {
                    debug!("{}", reason);
                    Ok(())
                }
                Err(e) => Err(e),
            };
        }

        warn!("Webhook for unknown gateway order {}", gateway_order_id);
        Ok(())
    }
}

impl WebhookHandler for ShopWebhookHandler {
    fn on_payment_captured(&self, data: CapturedPayment) -> ShopResult<()> {
        info!("Payment captured: {} for {}", data.payment_id, data.order_id);
        self.settle(&data.order_id, &data.payment_id, true)
    }

    fn on_order_paid(&self, data: CapturedPayment) -> ShopResult<()> {
        self.settle(&data.order_id, &data.payment_id, true)
    }

    fn on_payment_failed(&self, event: &GatewayEvent) -> ShopResult<()> {
        match (&event.order_id, &event.payment_id) {
            (Some(order_id), Some(payment_id)) => self.settle(order_id, payment_id, false),
            _ => {
                warn!("payment.failed without order or payment id");
                Ok(())
            }
        }
    }
}

/// Handle the Razorpay webhook
#[instrument(skip(state, headers, body))]
pub async fn razorpay_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| super::bad_request("Missing X-Razorpay-Signature header"))?;

    let event = state
        .gateway
        .verify_webhook(&body, signature)
        .await
        .map_err(|e| {
            error!("Webhook verification failed: {}", e);
            shop_error_to_response(e)
        })?;

    info!(
        "Received webhook: type={:?}, order={:?}",
        event.event_type, event.order_id
    );

    let handler = ShopWebhookHandler::new(state.shop.clone());
    dispatch_webhook_event(&handler, event).map_err(|e| {
        error!("Webhook handler error: {}", e);
        shop_error_to_response(e)
    })?;

    Ok(StatusCode::OK)
}
