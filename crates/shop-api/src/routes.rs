//! # Routes
//!
//! Axum router for the storefront and back-office API.

use crate::handlers::{self, account, admin, orders, payments, storefront};
use crate::state::AppState;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - Storefront (`/api/v1`): home, products, categories, banners, coupons
/// - Customer (`/api/v1/customers/{customer_id}/...`): addresses, cart,
///   wishlist, wallet, checkout, orders, payments, reviews
/// - Back-office (`/api/v1/admin/...`): dashboard, reports, catalog,
///   customers, orders, coupons, banners
/// - Webhooks: `POST /webhook/razorpay`
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Webhooks verify the raw body, so they sit outside the API nest
    let webhook_routes = Router::new().route("/razorpay", post(payments::razorpay_webhook));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        .nest("/api/v1", api_routes())
        .nest("/webhook", webhook_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/home", get(storefront::home))
        .route("/products", get(storefront::list_products))
        .route("/products/{product_id}", get(storefront::get_product))
        .route("/products/{product_id}/reviews", get(storefront::product_reviews))
        .route("/categories", get(storefront::list_categories))
        .route("/banners", get(storefront::list_banners))
        .route("/coupons", get(storefront::list_coupons))
        .route("/customers", post(account::register_customer))
        .nest("/customers/{customer_id}", customer_routes())
        .nest("/admin", admin_routes())
}

fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::get_customer).put(account::update_profile))
        // Addresses
        .route(
            "/addresses",
            get(account::list_addresses).post(account::add_address),
        )
        .route(
            "/addresses/{address_id}",
            put(account::edit_address).delete(account::remove_address),
        )
        // Cart & wishlist
        .route("/cart", get(account::get_cart).post(account::add_to_cart))
        .route(
            "/cart/{product_id}",
            put(account::update_cart_quantity).delete(account::remove_from_cart),
        )
        .route(
            "/wishlist",
            get(account::get_wishlist).post(account::toggle_wishlist),
        )
        .route("/wishlist/{product_id}", delete(account::remove_from_wishlist))
        // Wallet
        .route("/wallet", get(account::wallet_statement))
        .route("/wallet/top-up", post(payments::start_top_up))
        .route("/wallet/top-up/verify", post(payments::verify_top_up))
        .route("/wallet/top-up/failed", post(payments::top_up_failed))
        // Checkout
        .route("/checkout", get(orders::checkout_summary))
        .route("/coupons/apply", post(orders::apply_coupon))
        // Orders
        .route(
            "/orders",
            get(orders::order_history).post(orders::place_order),
        )
        .route(
            "/orders/{order_id}",
            get(orders::get_order).delete(orders::delete_order),
        )
        .route("/orders/{order_id}/status", get(orders::order_status))
        .route("/orders/{order_id}/cancel", post(orders::cancel_order))
        .route("/orders/{order_id}/return", post(orders::request_return))
        .route("/orders/{order_id}/items/cancel", post(orders::cancel_items))
        .route("/orders/{order_id}/items/return", post(orders::return_items))
        .route(
            "/orders/{order_id}/payment/verify",
            post(payments::verify_order_payment),
        )
        .route(
            "/orders/{order_id}/payment/failed",
            post(payments::order_payment_failed),
        )
        .route(
            "/orders/{order_id}/payment/retry",
            post(payments::retry_payment),
        )
        // Reviews
        .route("/reviews", post(account::add_review))
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        // Dashboard & reports
        .route("/dashboard", get(admin::dashboard))
        .route("/dashboard/chart", get(admin::sales_chart))
        .route("/reports/sales", get(admin::sales_report))
        // Customers
        .route("/customers", get(admin::list_customers))
        .route("/customers/{customer_id}", put(admin::set_customer_blocked))
        // Categories
        .route(
            "/categories",
            get(admin::list_categories).post(admin::add_category),
        )
        .route(
            "/categories/{category_id}",
            put(admin::edit_category).delete(admin::remove_category),
        )
        .route(
            "/categories/{category_id}/listed",
            put(admin::set_category_listed),
        )
        .route(
            "/categories/{category_id}/offer",
            post(admin::add_category_offer).delete(admin::remove_category_offer),
        )
        // Brands
        .route("/brands", get(admin::list_brands).post(admin::add_brand))
        .route(
            "/brands/{brand_id}",
            put(admin::set_brand_blocked).delete(admin::remove_brand),
        )
        // Products
        .route(
            "/products",
            get(admin::list_products).post(admin::add_product),
        )
        .route(
            "/products/{product_id}",
            get(admin::get_product).put(admin::update_product),
        )
        .route(
            "/products/{product_id}/blocked",
            put(admin::set_product_blocked),
        )
        .route(
            "/products/{product_id}/offer",
            post(admin::add_product_offer).delete(admin::remove_product_offer),
        )
        // Orders
        .route("/orders", get(admin::list_orders))
        .route("/orders/cancelled", get(admin::cancelled_orders))
        .route(
            "/orders/{order_id}",
            get(admin::get_order).delete(admin::delete_order),
        )
        .route("/orders/{order_id}/status", put(admin::update_order_status))
        .route(
            "/orders/{order_id}/items/{product_id}/status",
            put(admin::update_item_status),
        )
        // Coupons
        .route(
            "/coupons",
            get(admin::list_coupons).post(admin::create_coupon),
        )
        .route(
            "/coupons/{coupon_id}",
            get(admin::get_coupon)
                .put(admin::update_coupon)
                .delete(admin::delete_coupon),
        )
        // Banners
        .route("/banners", get(admin::list_banners).post(admin::add_banner))
        .route(
            "/banners/{banner_id}",
            put(admin::toggle_banner).delete(admin::delete_banner),
        )
}
