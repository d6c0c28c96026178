//! # NexTick
//!
//! Storefront and back-office API server.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables (or copy .env.example to .env)
//! export RAZORPAY_KEY_ID=rzp_test_...
//! export RAZORPAY_KEY_SECRET=...
//! export RAZORPAY_WEBHOOK_SECRET=...
//!
//! # Run the server
//! nextick
//! ```

use shop_api::{routes, state::AppState};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    print_banner();

    let state = AppState::from_env()?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Store: {}", state.config.store_name);
    info!("Payment gateway: {}", state.gateway.provider_name());

    let webhook_path = state.gateway.webhook_path();
    let app = routes::create_router(state);

    info!("NexTick starting on http://{}", addr);

    if !is_prod {
        info!("Health: http://{}/health", addr);
        info!("Storefront: http://{}/api/v1/home", addr);
        info!("Webhook: POST http://{}{}", addr, webhook_path);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// `LOG_FORMAT=json` switches to JSON lines
fn init_tracing() {
    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    let json = std::env::var("LOG_FORMAT")
        .map(|f| f.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }
}

fn print_banner() {
    println!(
        r#"
  NexTick
  ━━━━━━━━━━━━━━━━━━━━━━━
  Storefront & back-office
  Version: {}

"#,
        env!("CARGO_PKG_VERSION")
    );
}
