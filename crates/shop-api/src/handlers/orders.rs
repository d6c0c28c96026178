//! Checkout and the customer side of the order lifecycle.

use super::payments::{open_gateway_order, GatewayCheckout};
use super::{bad_request, shop_error_to_response, ApiError, ApiResult, PageQuery};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use shop_core::{
    Actor, BuyNow, CheckoutSummary, CouponPreview, ItemRequest, Order, OrderStatusView,
    OrderUpdate, Page, PaymentMethod, PaymentStatus, PlaceOrder,
};
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ApplyCoupon {
    pub code: String,
    /// Preview against a buy-now product instead of the cart
    #[serde(default)]
    pub buy_now: Option<BuyNow>,
}

#[derive(Debug, Deserialize)]
pub struct ReasonRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct ItemsRequest {
    pub items: Vec<ItemRequest>,
}

#[derive(Debug, Serialize)]
pub struct PlacedOrder {
    pub order: Order,
    /// Present for online orders: hand it to the checkout widget
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<GatewayCheckout>,
}

pub async fn checkout_summary(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
) -> ApiResult<CheckoutSummary> {
    state
        .shop
        .checkout_summary(customer_id, Utc::now())
        .map(Json)
        .map_err(shop_error_to_response)
}

/// Preview a coupon against the cart (or a buy-now product)
pub async fn apply_coupon(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
    Json(request): Json<ApplyCoupon>,
) -> ApiResult<CouponPreview> {
    let shop = &state.shop;
    let subtotal = match &request.buy_now {
        Some(buy_now) => shop
            .effective_price(buy_now.product_id)
            .map_err(shop_error_to_response)?
            .times(buy_now.quantity),
        None => shop.cart(customer_id).map_err(shop_error_to_response)?.total,
    };
    if subtotal.is_zero() {
        return Err(bad_request("Nothing to apply the coupon to"));
    }

    shop.preview_coupon(customer_id, &request.code, subtotal, Utc::now())
        .map(Json)
        .map_err(shop_error_to_response)
}

/// Place an order. Unpaid online orders come back with the gateway order
/// the checkout widget needs; they are confirmed by the payment callback.
#[instrument(skip(state, request), fields(method = ?request.payment_method))]
pub async fn place_order(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
    Json(request): Json<PlaceOrder>,
) -> Result<(StatusCode, Json<PlacedOrder>), ApiError> {
    let order = state
        .shop
        .place_order(customer_id, request, Utc::now())
        .map_err(shop_error_to_response)?;
    info!(
        "Order {} placed: total={}, method={:?}",
        order.id,
        order.final_amount.display(),
        order.payment_method
    );

    // A zero total is settled on placement and never reaches the gateway
    let awaits_gateway = order.payment_method == PaymentMethod::Online
        && order.payment_status == PaymentStatus::Pending;
    let placed = if awaits_gateway {
        let (order, payment) = open_gateway_order(&state, order).await?;
        PlacedOrder {
            order,
            payment: Some(payment),
        }
    } else {
        PlacedOrder {
            order,
            payment: None,
        }
    };
    Ok((StatusCode::CREATED, Json(placed)))
}

pub async fn order_history(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Page<Order>> {
    state
        .shop
        .order_history(customer_id, query.page)
        .map(Json)
        .map_err(shop_error_to_response)
}

pub async fn get_order(
    State(state): State<AppState>,
    Path((customer_id, order_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Order> {
    state
        .shop
        .customer_order(customer_id, order_id)
        .map(Json)
        .map_err(shop_error_to_response)
}

pub async fn order_status(
    State(state): State<AppState>,
    Path((customer_id, order_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<OrderStatusView> {
    state
        .shop
        .order_status(customer_id, order_id)
        .map(Json)
        .map_err(shop_error_to_response)
}

#[instrument(skip(state, request))]
pub async fn cancel_order(
    State(state): State<AppState>,
    Path((customer_id, order_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<ReasonRequest>,
) -> ApiResult<OrderUpdate> {
    state
        .shop
        .cancel_order(customer_id, order_id, &request.reason)
        .map(Json)
        .map_err(shop_error_to_response)
}

#[instrument(skip(state, request))]
pub async fn request_return(
    State(state): State<AppState>,
    Path((customer_id, order_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<ReasonRequest>,
) -> ApiResult<OrderUpdate> {
    state
        .shop
        .request_return(customer_id, order_id, &request.reason)
        .map(Json)
        .map_err(shop_error_to_response)
}

#[instrument(skip(state, request), fields(items = request.items.len()))]
pub async fn cancel_items(
    State(state): State<AppState>,
    Path((customer_id, order_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<ItemsRequest>,
) -> ApiResult<OrderUpdate> {
    state
        .shop
        .cancel_items(customer_id, order_id, request.items)
        .map(Json)
        .map_err(shop_error_to_response)
}

#[instrument(skip(state, request), fields(items = request.items.len()))]
pub async fn return_items(
    State(state): State<AppState>,
    Path((customer_id, order_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<ItemsRequest>,
) -> ApiResult<OrderUpdate> {
    state
        .shop
        .request_item_returns(customer_id, order_id, request.items)
        .map(Json)
        .map_err(shop_error_to_response)
}

pub async fn delete_order(
    State(state): State<AppState>,
    Path((customer_id, order_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    state
        .shop
        .delete_order(Actor::Customer(customer_id), order_id)
        .map_err(shop_error_to_response)?;
    Ok(StatusCode::NO_CONTENT)
}
