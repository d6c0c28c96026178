//! Public storefront: home page, catalog browsing, banners and coupons.

use super::{shop_error_to_response, ApiResult};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use shop_core::{
    Banner, Category, Coupon, Page, ProductDetail, ProductQuery, ProductSummary, Review,
};
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct HomePage {
    pub store_name: String,
    pub banners: Vec<Banner>,
    pub categories: Vec<Category>,
    pub new_arrivals: Vec<ProductSummary>,
}

pub async fn home(State(state): State<AppState>) -> ApiResult<HomePage> {
    let shop = &state.shop;
    let banners = shop.active_banners(Utc::now()).map_err(shop_error_to_response)?;
    let categories = shop.listed_categories().map_err(shop_error_to_response)?;
    let new_arrivals = shop
        .browse(&ProductQuery::default())
        .map_err(shop_error_to_response)?
        .items;

    Ok(Json(HomePage {
        store_name: state.config.store_name.clone(),
        banners,
        categories,
        new_arrivals,
    }))
}

/// Filtered, sorted and paginated product listing
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> ApiResult<Page<ProductSummary>> {
    state.shop.browse(&query).map(Json).map_err(shop_error_to_response)
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> ApiResult<ProductDetail> {
    state
        .shop
        .product_detail(product_id)
        .map(Json)
        .map_err(shop_error_to_response)
}

pub async fn product_reviews(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> ApiResult<Vec<Review>> {
    state
        .shop
        .product_reviews(product_id)
        .map(Json)
        .map_err(shop_error_to_response)
}

pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Vec<Category>> {
    state
        .shop
        .listed_categories()
        .map(Json)
        .map_err(shop_error_to_response)
}

pub async fn list_banners(State(state): State<AppState>) -> ApiResult<Vec<Banner>> {
    state
        .shop
        .active_banners(Utc::now())
        .map(Json)
        .map_err(shop_error_to_response)
}

/// Coupons a shopper can use today
pub async fn list_coupons(State(state): State<AppState>) -> ApiResult<Vec<Coupon>> {
    state
        .shop
        .available_coupons(Utc::now())
        .map(Json)
        .map_err(shop_error_to_response)
}
