//! # shop-core
//!
//! Core types and operations for the NexTick storefront.
//!
//! This crate provides:
//! - `Shop`, the in-process store every storefront and back-office
//!   operation runs against
//! - the catalog, cart, wishlist, coupons and the customer wallet
//! - checkout and the order lifecycle (cancellations, returns, refunds)
//! - dashboard and sales reports
//! - `PaymentGateway` trait for implementing payment gateways
//! - `ShopError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use shop_core::{Shop, PlaceOrder, PaymentMethod};
//!
//! let shop = Shop::default();
//! let customer = shop.register_customer("Asha", "asha@example.com", None)?;
//! shop.add_to_cart(customer.id, product_id)?;
//!
//! let order = shop.place_order(customer.id, PlaceOrder {
//!     address_id,
//!     payment_method: PaymentMethod::Cod,
//!     coupon_code: None,
//!     buy_now: None,
//! }, chrono::Utc::now())?;
//!
//! // later, from the back-office
//! shop.update_order_status(order.id, OrderStatus::Processing)?;
//! ```

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod content;
pub mod coupon;
pub mod customer;
pub mod error;
pub mod gateway;
pub mod lifecycle;
pub mod money;
pub mod order;
pub mod report;
pub mod store;
pub mod wallet;

#[cfg(test)]
mod testkit;

// Re-exports for convenience
pub use cart::{CartItem, CartLine, CartView, WishlistToggle, MAX_QTY_PER_PRODUCT};
pub use catalog::{
    Brand, CatalogSeed, Category, NewProduct, Product, ProductDetail, ProductQuery, ProductSort,
    ProductSummary, ProductUpdate,
};
pub use checkout::{BuyNow, CheckoutSummary, PlaceOrder, COD_LIMIT_MINOR};
pub use content::{Banner, BannerInput, Review, ReviewInput};
pub use coupon::{Coupon, CouponInput, CouponPreview};
pub use customer::{Address, AddressInput, Customer};
pub use error::{ShopError, ShopResult};
pub use gateway::{
    BoxedPaymentGateway, GatewayEvent, GatewayEventType, GatewayOrder, GatewayPayment,
    PaymentGateway, PaymentState,
};
pub use lifecycle::{AdminOrders, ItemRequest, OrderStats, OrderStatusView};
pub use money::{Currency, Price};
pub use order::{
    Actor, ItemStatus, Order, OrderItem, OrderStatus, OrderUpdate, PaymentMethod, PaymentStatus,
};
pub use report::{
    ChartFilter, DashboardSummary, SalesChart, SalesPeriod, SalesReport, TopPerformers,
};
pub use store::{Page, Shop};
pub use wallet::{TopUp, TransactionKind, Wallet, WalletStatement, WalletTransaction};
