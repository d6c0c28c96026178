//! Back-office: catalog management, customers, orders, coupons, banners,
//! the dashboard and sales reports.

use super::{bad_request, shop_error_to_response, ApiError, ApiResult, PageQuery, SearchQuery};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use shop_core::{
    Actor, AdminOrders, Banner, BannerInput, Brand, Category, ChartFilter, Coupon, CouponInput,
    Customer, DashboardSummary, NewProduct, Order, OrderStatus, OrderUpdate, Page, Product,
    ProductSummary, ProductUpdate, SalesChart, SalesPeriod, SalesReport, TopPerformers,
};
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct BrandRequest {
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListedRequest {
    pub listed: bool,
}

#[derive(Debug, Deserialize)]
pub struct BlockRequest {
    pub blocked: bool,
}

#[derive(Debug, Deserialize)]
pub struct OfferRequest {
    pub percent: u8,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub summary: DashboardSummary,
    pub top: TopPerformers,
}

#[derive(Debug, Deserialize)]
pub struct ChartQuery {
    #[serde(default)]
    pub filter: Option<ChartFilter>,
    #[serde(default)]
    pub year: Option<i32>,
}

/// `?period=custom&start=2026-01-01&end=2026-01-31&page=2`
#[derive(Debug, Default, Deserialize)]
pub struct SalesReportQuery {
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub end: Option<NaiveDate>,
    #[serde(default)]
    pub page: usize,
}

impl SalesReportQuery {
    pub fn period(&self) -> Result<SalesPeriod, ApiError> {
        let period = match self.period.as_deref().unwrap_or("all") {
            "all" => SalesPeriod::All,
            "daily" => SalesPeriod::Daily,
            "weekly" => SalesPeriod::Weekly,
            "monthly" => SalesPeriod::Monthly,
            "yearly" => SalesPeriod::Yearly,
            "custom" => match (self.start, self.end) {
                (Some(start), Some(end)) => SalesPeriod::Custom { start, end },
                _ => return Err(bad_request("Custom period needs start and end dates")),
            },
            other => return Err(bad_request(format!("Unknown report period: {}", other))),
        };
        Ok(period)
    }
}

// =============================================================================
// Dashboard & reports
// =============================================================================

pub async fn dashboard(State(state): State<AppState>) -> ApiResult<Dashboard> {
    let summary = state.shop.dashboard().map_err(shop_error_to_response)?;
    let top = state.shop.top_performers().map_err(shop_error_to_response)?;
    Ok(Json(Dashboard { summary, top }))
}

pub async fn sales_chart(
    State(state): State<AppState>,
    Query(query): Query<ChartQuery>,
) -> ApiResult<SalesChart> {
    let today = Utc::now().date_naive();
    state
        .shop
        .sales_chart(
            query.filter.unwrap_or(ChartFilter::Monthly),
            query.year.unwrap_or(today.year()),
            today,
        )
        .map(Json)
        .map_err(shop_error_to_response)
}

pub async fn sales_report(
    State(state): State<AppState>,
    Query(query): Query<SalesReportQuery>,
) -> ApiResult<SalesReport> {
    let period = query.period()?;
    state
        .shop
        .sales_report(period, query.page, Utc::now())
        .map(Json)
        .map_err(shop_error_to_response)
}

// =============================================================================
// Customers
// =============================================================================

pub async fn list_customers(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Page<Customer>> {
    state
        .shop
        .customers(query.search(), query.page)
        .map(Json)
        .map_err(shop_error_to_response)
}

#[instrument(skip(state, request), fields(blocked = request.blocked))]
pub async fn set_customer_blocked(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
    Json(request): Json<BlockRequest>,
) -> ApiResult<Customer> {
    state
        .shop
        .set_customer_blocked(customer_id, request.blocked)
        .map(Json)
        .map_err(shop_error_to_response)
}

// =============================================================================
// Categories
// =============================================================================

pub async fn list_categories(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Page<Category>> {
    state
        .shop
        .list_categories(query.search(), query.page)
        .map(Json)
        .map_err(shop_error_to_response)
}

pub async fn add_category(
    State(state): State<AppState>,
    Json(request): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let category = state
        .shop
        .add_category(&request.name, &request.description)
        .map_err(shop_error_to_response)?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn edit_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
    Json(request): Json<CategoryRequest>,
) -> ApiResult<Category> {
    state
        .shop
        .edit_category(category_id, &request.name, &request.description)
        .map(Json)
        .map_err(shop_error_to_response)
}

pub async fn set_category_listed(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
    Json(request): Json<ListedRequest>,
) -> ApiResult<Category> {
    state
        .shop
        .set_category_listed(category_id, request.listed)
        .map(Json)
        .map_err(shop_error_to_response)
}

pub async fn remove_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .shop
        .remove_category(category_id)
        .map_err(shop_error_to_response)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_category_offer(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
    Json(request): Json<OfferRequest>,
) -> ApiResult<Category> {
    state
        .shop
        .add_category_offer(category_id, request.percent)
        .map(Json)
        .map_err(shop_error_to_response)
}

pub async fn remove_category_offer(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
) -> ApiResult<Category> {
    state
        .shop
        .remove_category_offer(category_id)
        .map(Json)
        .map_err(shop_error_to_response)
}

// =============================================================================
// Brands
// =============================================================================

pub async fn list_brands(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Page<Brand>> {
    state
        .shop
        .list_brands(query.search(), query.page)
        .map(Json)
        .map_err(shop_error_to_response)
}

pub async fn add_brand(
    State(state): State<AppState>,
    Json(request): Json<BrandRequest>,
) -> Result<(StatusCode, Json<Brand>), ApiError> {
    let brand = state
        .shop
        .add_brand(&request.name, request.image)
        .map_err(shop_error_to_response)?;
    Ok((StatusCode::CREATED, Json(brand)))
}

pub async fn set_brand_blocked(
    State(state): State<AppState>,
    Path(brand_id): Path<Uuid>,
    Json(request): Json<BlockRequest>,
) -> ApiResult<Brand> {
    state
        .shop
        .set_brand_blocked(brand_id, request.blocked)
        .map(Json)
        .map_err(shop_error_to_response)
}

pub async fn remove_brand(
    State(state): State<AppState>,
    Path(brand_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .shop
        .remove_brand(brand_id)
        .map_err(shop_error_to_response)?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Products
// =============================================================================

pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Page<ProductSummary>> {
    state
        .shop
        .admin_products(query.search(), query.page)
        .map(Json)
        .map_err(shop_error_to_response)
}

#[instrument(skip(state, input), fields(name = %input.name))]
pub async fn add_product(
    State(state): State<AppState>,
    Json(input): Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product = state
        .shop
        .add_product(input)
        .map_err(shop_error_to_response)?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> ApiResult<ProductSummary> {
    state
        .shop
        .product(product_id)
        .map(Json)
        .map_err(shop_error_to_response)
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Json(input): Json<ProductUpdate>,
) -> ApiResult<Product> {
    state
        .shop
        .update_product(product_id, input)
        .map(Json)
        .map_err(shop_error_to_response)
}

pub async fn set_product_blocked(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Json(request): Json<BlockRequest>,
) -> ApiResult<Product> {
    state
        .shop
        .set_product_blocked(product_id, request.blocked)
        .map(Json)
        .map_err(shop_error_to_response)
}

pub async fn add_product_offer(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Json(request): Json<OfferRequest>,
) -> ApiResult<ProductSummary> {
    state
        .shop
        .add_product_offer(product_id, request.percent)
        .map(Json)
        .map_err(shop_error_to_response)
}

pub async fn remove_product_offer(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> ApiResult<ProductSummary> {
    state
        .shop
        .remove_product_offer(product_id)
        .map(Json)
        .map_err(shop_error_to_response)
}

// =============================================================================
// Orders
// =============================================================================

pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<AdminOrders> {
    state
        .shop
        .admin_orders(query.page)
        .map(Json)
        .map_err(shop_error_to_response)
}

pub async fn cancelled_orders(State(state): State<AppState>) -> ApiResult<Vec<Order>> {
    state
        .shop
        .cancelled_orders()
        .map(Json)
        .map_err(shop_error_to_response)
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Order> {
    state
        .shop
        .order(order_id)
        .map(Json)
        .map_err(shop_error_to_response)
}

#[instrument(skip(state, request), fields(status = %request.status))]
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(request): Json<StatusRequest>,
) -> ApiResult<OrderUpdate> {
    let update = state
        .shop
        .update_order_status(order_id, request.status)
        .map_err(shop_error_to_response)?;
    info!(
        "Order {} is now {}, refunded {}",
        order_id,
        update.order.status,
        update.refunded.display()
    );
    Ok(Json(update))
}

#[instrument(skip(state, request), fields(status = %request.status))]
pub async fn update_item_status(
    State(state): State<AppState>,
    Path((order_id, product_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<StatusRequest>,
) -> ApiResult<OrderUpdate> {
    state
        .shop
        .update_item_status(order_id, product_id, request.status)
        .map(Json)
        .map_err(shop_error_to_response)
}

pub async fn delete_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .shop
        .delete_order(Actor::Admin, order_id)
        .map_err(shop_error_to_response)?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Coupons & banners
// =============================================================================

pub async fn list_coupons(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Page<Coupon>> {
    state
        .shop
        .coupons(query.page)
        .map(Json)
        .map_err(shop_error_to_response)
}

pub async fn create_coupon(
    State(state): State<AppState>,
    Json(input): Json<CouponInput>,
) -> Result<(StatusCode, Json<Coupon>), ApiError> {
    let coupon = state
        .shop
        .create_coupon(input)
        .map_err(shop_error_to_response)?;
    Ok((StatusCode::CREATED, Json(coupon)))
}

pub async fn get_coupon(
    State(state): State<AppState>,
    Path(coupon_id): Path<Uuid>,
) -> ApiResult<Coupon> {
    state
        .shop
        .coupon(coupon_id)
        .map(Json)
        .map_err(shop_error_to_response)
}

pub async fn update_coupon(
    State(state): State<AppState>,
    Path(coupon_id): Path<Uuid>,
    Json(input): Json<CouponInput>,
) -> ApiResult<Coupon> {
    state
        .shop
        .update_coupon(coupon_id, input)
        .map(Json)
        .map_err(shop_error_to_response)
}

pub async fn delete_coupon(
    State(state): State<AppState>,
    Path(coupon_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .shop
        .delete_coupon(coupon_id)
        .map_err(shop_error_to_response)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_banners(State(state): State<AppState>) -> ApiResult<Vec<Banner>> {
    state
        .shop
        .banners()
        .map(Json)
        .map_err(shop_error_to_response)
}

pub async fn add_banner(
    State(state): State<AppState>,
    Json(input): Json<BannerInput>,
) -> Result<(StatusCode, Json<Banner>), ApiError> {
    let banner = state
        .shop
        .add_banner(input)
        .map_err(shop_error_to_response)?;
    Ok((StatusCode::CREATED, Json(banner)))
}

pub async fn toggle_banner(
    State(state): State<AppState>,
    Path(banner_id): Path<Uuid>,
) -> ApiResult<Banner> {
    state
        .shop
        .toggle_banner(banner_id)
        .map(Json)
        .map_err(shop_error_to_response)
}

pub async fn delete_banner(
    State(state): State<AppState>,
    Path(banner_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .shop
        .delete_banner(banner_id)
        .map_err(shop_error_to_response)?;
    Ok(StatusCode::NO_CONTENT)
}
