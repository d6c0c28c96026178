//! # shop-api
//!
//! HTTP API for the NexTick storefront and back-office.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - JSON endpoints for the storefront, customer accounts and the back-office
//! - Razorpay checkout callbacks and the webhook endpoint
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | GET | `/api/v1/home` | Banners, categories and new arrivals |
//! | GET | `/api/v1/products` | Filtered product listing |
//! | GET | `/api/v1/products/{id}` | Product detail with related products |
//! | POST | `/api/v1/customers` | Register a customer |
//! | PUT | `/api/v1/customers/{id}` | Update name and phone |
//! | POST | `/api/v1/customers/{id}/cart` | Add a product to the cart |
//! | POST | `/api/v1/customers/{id}/orders` | Place an order |
//! | POST | `/api/v1/customers/{id}/orders/{order_id}/payment/verify` | Confirm an online payment |
//! | POST | `/api/v1/customers/{id}/wallet/top-up` | Start a wallet top-up |
//! | PUT | `/api/v1/admin/orders/{id}/status` | Move an order through its lifecycle |
//! | GET | `/api/v1/admin/reports/sales` | Sales report |
//! | POST | `/webhook/razorpay` | Razorpay webhook |

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
