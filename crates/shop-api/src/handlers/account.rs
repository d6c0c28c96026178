//! Customer account: registration, addresses, cart, wishlist, wallet and
//! reviews. The customer is identified by the `{customer_id}` path segment.

use super::{shop_error_to_response, ApiError, ApiResult, PageQuery};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use shop_core::{
    Address, AddressInput, CartView, Customer, ProductSummary, Review, ReviewInput,
    WalletStatement, WishlistToggle,
};
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct RegisterCustomer {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfile {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProductRef {
    pub product_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct QuantityRequest {
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
pub struct WishlistResponse {
    pub product_id: Uuid,
    pub result: WishlistToggle,
}

#[instrument(skip(state, request), fields(email = %request.email))]
pub async fn register_customer(
    State(state): State<AppState>,
    Json(request): Json<RegisterCustomer>,
) -> Result<(StatusCode, Json<Customer>), ApiError> {
    let customer = state
        .shop
        .register_customer(&request.name, &request.email, request.phone)
        .map_err(shop_error_to_response)?;
    info!("Registered customer {}", customer.id);
    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn get_customer(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
) -> ApiResult<Customer> {
    state
        .shop
        .customer(customer_id)
        .map(Json)
        .map_err(shop_error_to_response)
}

pub async fn update_profile(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
    Json(request): Json<UpdateProfile>,
) -> ApiResult<Customer> {
    state
        .shop
        .update_profile(customer_id, &request.name, request.phone.as_deref())
        .map(Json)
        .map_err(shop_error_to_response)
}

// =============================================================================
// Addresses
// =============================================================================

pub async fn list_addresses(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
) -> ApiResult<Vec<Address>> {
    state
        .shop
        .addresses(customer_id)
        .map(Json)
        .map_err(shop_error_to_response)
}

pub async fn add_address(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
    Json(input): Json<AddressInput>,
) -> Result<(StatusCode, Json<Address>), ApiError> {
    let address = state
        .shop
        .add_address(customer_id, input)
        .map_err(shop_error_to_response)?;
    Ok((StatusCode::CREATED, Json(address)))
}

pub async fn edit_address(
    State(state): State<AppState>,
    Path((customer_id, address_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<AddressInput>,
) -> ApiResult<Address> {
    state
        .shop
        .edit_address(customer_id, address_id, input)
        .map(Json)
        .map_err(shop_error_to_response)
}

pub async fn remove_address(
    State(state): State<AppState>,
    Path((customer_id, address_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    state
        .shop
        .remove_address(customer_id, address_id)
        .map_err(shop_error_to_response)?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Cart & wishlist
// =============================================================================

pub async fn get_cart(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
) -> ApiResult<CartView> {
    state
        .shop
        .cart(customer_id)
        .map(Json)
        .map_err(shop_error_to_response)
}

/// Add one unit of a product
#[instrument(skip(state, request), fields(product_id = %request.product_id))]
pub async fn add_to_cart(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
    Json(request): Json<ProductRef>,
) -> ApiResult<CartView> {
    state
        .shop
        .add_to_cart(customer_id, request.product_id)
        .map(Json)
        .map_err(shop_error_to_response)
}

pub async fn update_cart_quantity(
    State(state): State<AppState>,
    Path((customer_id, product_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<QuantityRequest>,
) -> ApiResult<CartView> {
    state
        .shop
        .update_cart_quantity(customer_id, product_id, request.quantity)
        .map(Json)
        .map_err(shop_error_to_response)
}

pub async fn remove_from_cart(
    State(state): State<AppState>,
    Path((customer_id, product_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<CartView> {
    state
        .shop
        .remove_from_cart(customer_id, product_id)
        .map(Json)
        .map_err(shop_error_to_response)
}

pub async fn get_wishlist(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
) -> ApiResult<Vec<ProductSummary>> {
    state
        .shop
        .wishlist(customer_id)
        .map(Json)
        .map_err(shop_error_to_response)
}

pub async fn toggle_wishlist(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
    Json(request): Json<ProductRef>,
) -> ApiResult<WishlistResponse> {
    let result = state
        .shop
        .toggle_wishlist(customer_id, request.product_id)
        .map_err(shop_error_to_response)?;
    Ok(Json(WishlistResponse {
        product_id: request.product_id,
        result,
    }))
}

pub async fn remove_from_wishlist(
    State(state): State<AppState>,
    Path((customer_id, product_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    state
        .shop
        .remove_from_wishlist(customer_id, product_id)
        .map_err(shop_error_to_response)?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Wallet & reviews
// =============================================================================

/// Balance and one page of wallet history
pub async fn wallet_statement(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> ApiResult<WalletStatement> {
    state
        .shop
        .wallet_history(customer_id, query.page)
        .map(Json)
        .map_err(shop_error_to_response)
}

#[instrument(skip(state, input), fields(product_id = %input.product_id))]
pub async fn add_review(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
    Json(input): Json<ReviewInput>,
) -> Result<(StatusCode, Json<Review>), ApiError> {
    let review = state
        .shop
        .add_review(customer_id, input)
        .map_err(shop_error_to_response)?;
    Ok((StatusCode::CREATED, Json(review)))
}
