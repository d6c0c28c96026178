//! # Razorpay Gateway
//!
//! Orders API client plus checkout and webhook signature verification.
//!
//! The checkout flow:
//! 1. `create_order` registers the amount due with Razorpay and returns an
//!    `order_...` id for the checkout widget.
//! 2. The widget posts back `razorpay_order_id`, `razorpay_payment_id` and
//!    `razorpay_signature`; `verify_payment_signature` checks the HMAC of
//!    `order_id|payment_id` under the key secret.
//! 3. Webhooks carry an `X-Razorpay-Signature` header, the HMAC of the raw
//!    body under the webhook secret.

use crate::config::RazorpayConfig;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shop_core::{
    Currency, GatewayEvent, GatewayEventType, GatewayOrder, GatewayPayment, PaymentGateway,
    PaymentState, Price, ShopError, ShopResult,
};
use tracing::{debug, error, info, instrument, warn};

const PROVIDER: &str = "razorpay";

/// Seconds to wait when a 429 carries no `Retry-After`
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Razorpay implementation of [`PaymentGateway`]
pub struct RazorpayGateway {
    config: RazorpayConfig,
    client: Client,
}

impl RazorpayGateway {
    pub fn new(config: RazorpayConfig) -> ShopResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| ShopError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> ShopResult<Self> {
        Self::new(RazorpayConfig::from_env()?)
    }

    pub fn config(&self) -> &RazorpayConfig {
        &self.config
    }

    /// Send an authenticated request and decode the JSON body
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ShopResult<T> {
        let response = request
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .send()
            .await
            .map_err(|e| ShopError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            warn!(retry_after_secs, "Razorpay rate limit hit");
            return Err(ShopError::RateLimited {
                provider: PROVIDER.to_string(),
                retry_after_secs,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ShopError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            error!("Razorpay API error: status={}, body={}", status, body);

            if let Ok(error_response) = serde_json::from_str::<RazorpayErrorResponse>(&body) {
                return Err(ShopError::ProviderError {
                    provider: PROVIDER.to_string(),
                    message: error_response.error.description,
                });
            }

            return Err(ShopError::ProviderError {
                provider: PROVIDER.to_string(),
                message: format!("HTTP {}: {}", status, body),
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            ShopError::Serialization(format!("Failed to parse Razorpay response: {}", e))
        })
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    #[instrument(skip(self, amount), fields(amount_minor = amount.amount))]
    async fn create_order(&self, amount: &Price, receipt: &str) -> ShopResult<GatewayOrder> {
        if amount.amount <= 0 {
            return Err(ShopError::InvalidRequest(
                "Gateway order amount must be positive".to_string(),
            ));
        }

        let request = CreateOrderRequest {
            amount: amount.amount,
            currency: amount.currency.as_str(),
            receipt,
        };
        debug!("Creating Razorpay order: receipt={}", receipt);

        let order: RazorpayOrder = self
            .send(self.client.post(self.config.url("/v1/orders")).json(&request))
            .await?;

        info!("Created Razorpay order: id={}, amount={}", order.id, order.amount);

        let currency = Currency::parse(&order.currency).unwrap_or(amount.currency);
        Ok(GatewayOrder {
            id: order.id,
            amount: Price::from_minor(order.amount, currency),
            receipt: order.receipt.unwrap_or_else(|| receipt.to_string()),
            status: order.status,
            created_at: order
                .created_at
                .and_then(|ts| DateTime::from_timestamp(ts, 0))
                .unwrap_or_else(Utc::now),
        })
    }

    #[instrument(skip(self))]
    async fn fetch_payment(&self, payment_id: &str) -> ShopResult<GatewayPayment> {
        if payment_id.trim().is_empty() {
            return Err(ShopError::InvalidRequest("Payment id is required".to_string()));
        }

        let payment: RazorpayPayment = self
            .send(
                self.client
                    .get(self.config.url(&format!("/v1/payments/{}", payment_id))),
            )
            .await?;

        debug!("Fetched Razorpay payment: id={}, status={}", payment.id, payment.status);

        let currency = Currency::parse(&payment.currency).unwrap_or_default();
        Ok(GatewayPayment {
            id: payment.id,
            order_id: payment.order_id,
            amount: Price::from_minor(payment.amount, currency),
            state: PaymentState::parse(&payment.status),
            method: payment.method,
        })
    }

    fn verify_payment_signature(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> ShopResult<()> {
        let message = format!("{}|{}", order_id, payment_id);
        let expected = compute_hmac_sha256(&self.config.key_secret, message.as_bytes())?;

        if !constant_time_compare(signature, &expected) {
            warn!(order_id, payment_id, "Checkout signature mismatch");
            return Err(ShopError::SignatureMismatch(
                "Payment signature does not match".to_string(),
            ));
        }
        Ok(())
    }

    #[instrument(skip(self, payload, signature))]
    async fn verify_webhook(&self, payload: &[u8], signature: &str) -> ShopResult<GatewayEvent> {
        let secret = self.config.webhook_secret.as_deref().ok_or_else(|| {
            ShopError::WebhookVerificationFailed("Webhook secret not configured".to_string())
        })?;

        let expected = compute_hmac_sha256(secret, payload)?;
        if !constant_time_compare(signature, &expected) {
            return Err(ShopError::WebhookVerificationFailed(
                "Signature mismatch".to_string(),
            ));
        }

        let event: RazorpayWebhookEvent = serde_json::from_slice(payload).map_err(|e| {
            ShopError::WebhookParseError(format!("Failed to parse webhook: {}", e))
        })?;

        debug!("Verified Razorpay webhook: event={}", event.event);

        let event_type = match event.event.as_str() {
            "payment.captured" => GatewayEventType::PaymentCaptured,
            "payment.failed" => GatewayEventType::PaymentFailed,
            "order.paid" => GatewayEventType::OrderPaid,
            "refund.processed" => GatewayEventType::RefundProcessed,
            other => GatewayEventType::Unknown(other.to_string()),
        };

        let payload = event.payload;
        let payment = payload.pointer("/payment/entity");
        let refund = payload.pointer("/refund/entity");
        let str_field = |v: Option<&serde_json::Value>, key: &str| {
            v.and_then(|e| e.get(key))
                .and_then(|v| v.as_str())
                .map(String::from)
        };

        let order_id = str_field(payment, "order_id")
            .or_else(|| str_field(payload.pointer("/order/entity"), "id"));
        let payment_id = str_field(payment, "id").or_else(|| str_field(refund, "payment_id"));
        let amount = match event_type {
            GatewayEventType::RefundProcessed => refund.and_then(|r| r.get("amount")),
            _ => payment.and_then(|p| p.get("amount")),
        }
        .and_then(|v| v.as_i64());

        Ok(GatewayEvent {
            event_type,
            provider: PROVIDER.to_string(),
            order_id,
            payment_id,
            amount,
            raw_data: Some(payload),
            received_at: event
                .created_at
                .and_then(|ts| DateTime::from_timestamp(ts, 0))
                .unwrap_or_else(Utc::now),
        })
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    fn key_id(&self) -> &str {
        &self.config.key_id
    }
}

// =============================================================================
// Razorpay API Types
// =============================================================================

#[derive(Debug, Serialize)]
struct CreateOrderRequest<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

#[derive(Debug, Deserialize)]
struct RazorpayOrder {
    id: String,
    amount: i64,
    currency: String,
    #[serde(default)]
    receipt: Option<String>,
    status: String,
    #[serde(default)]
    created_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RazorpayPayment {
    id: String,
    amount: i64,
    currency: String,
    status: String,
    #[serde(default)]
    order_id: Option<String>,
    #[serde(default)]
    method: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RazorpayErrorResponse {
    error: RazorpayError,
}

#[derive(Debug, Deserialize)]
struct RazorpayError {
    description: String,
}

#[derive(Debug, Deserialize)]
struct RazorpayWebhookEvent {
    event: String,
    #[serde(default)]
    payload: serde_json::Value,
    #[serde(default)]
    created_at: Option<i64>,
}

// =============================================================================
// Signatures
// =============================================================================

/// Hex-encoded HMAC-SHA256 of `message` under `secret`
pub fn compute_hmac_sha256(secret: &str, message: &[u8]) -> ShopResult<String> {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ShopError::Internal(format!("HMAC key rejected: {}", e)))?;
    mac.update(message);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway(base_url: &str) -> RazorpayGateway {
        let config = RazorpayConfig::new("rzp_test_key", "test_secret")
            .with_api_base_url(base_url)
            .with_webhook_secret("hook_secret");
        RazorpayGateway::new(config).unwrap()
    }

    #[test]
    fn test_hmac_sha256() {
        let sig = compute_hmac_sha256("key", b"The quick brown fox jumps over the lazy dog").unwrap();
        assert_eq!(
            sig,
            "f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8"
        );
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc123", "abc123"));
        assert!(!constant_time_compare("abc123", "abc124"));
        assert!(!constant_time_compare("abc", "abcd"));
    }

    #[test]
    fn test_verify_payment_signature() {
        let gateway = gateway("http://localhost");
        let good = compute_hmac_sha256("test_secret", b"order_1|pay_1").unwrap();

        assert!(gateway.verify_payment_signature("order_1", "pay_1", &good).is_ok());
        assert!(matches!(
            gateway.verify_payment_signature("order_1", "pay_2", &good),
            Err(ShopError::SignatureMismatch(_))
        ));
    }

    #[tokio::test]
    async fn test_create_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/orders"))
            .and(header_exists("authorization"))
            .and(body_partial_json(json!({
                "amount": 129950,
                "currency": "INR",
                "receipt": "rcpt_42"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "order_Abc123",
                "entity": "order",
                "amount": 129950,
                "amount_paid": 0,
                "currency": "INR",
                "receipt": "rcpt_42",
                "status": "created",
                "created_at": 1_700_000_000
            })))
            .expect(1)
            .mount(&server)
            .await;

        let order = gateway(&server.uri())
            .create_order(&Price::from_minor(129950, Currency::INR), "rcpt_42")
            .await
            .unwrap();

        assert_eq!(order.id, "order_Abc123");
        assert_eq!(order.amount.amount, 129950);
        assert_eq!(order.receipt, "rcpt_42");
        assert_eq!(order.status, "created");
        assert_eq!(order.created_at.timestamp(), 1_700_000_000);
    }

    #[tokio::test]
    async fn test_create_order_rejects_zero_amount() {
        let result = gateway("http://localhost")
            .create_order(&Price::zero(Currency::INR), "rcpt")
            .await;
        assert!(matches!(result, Err(ShopError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_provider_error_is_mapped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/orders"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {
                    "code": "BAD_REQUEST_ERROR",
                    "description": "The amount must be atleast INR 1.00"
                }
            })))
            .mount(&server)
            .await;

        let err = gateway(&server.uri())
            .create_order(&Price::from_minor(50, Currency::INR), "rcpt")
            .await
            .unwrap_err();

        match err {
            ShopError::ProviderError { provider, message } => {
                assert_eq!(provider, "razorpay");
                assert!(message.contains("atleast"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rate_limit_is_mapped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/payments/pay_1"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
            .mount(&server)
            .await;

        let err = gateway(&server.uri()).fetch_payment("pay_1").await.unwrap_err();
        assert!(err.is_retryable());
        assert!(matches!(
            err,
            ShopError::RateLimited {
                retry_after_secs: 7,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_fetch_payment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/payments/pay_Xyz"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "pay_Xyz",
                "entity": "payment",
                "amount": 50000,
                "currency": "INR",
                "status": "captured",
                "order_id": "order_Abc123",
                "method": "upi"
            })))
            .mount(&server)
            .await;

        let payment = gateway(&server.uri()).fetch_payment("pay_Xyz").await.unwrap();
        assert!(payment.is_captured());
        assert_eq!(payment.order_id.as_deref(), Some("order_Abc123"));
        assert_eq!(payment.amount, Price::from_minor(50000, Currency::INR));
        assert_eq!(payment.method.as_deref(), Some("upi"));
    }

    #[tokio::test]
    async fn test_verify_webhook() {
        let body = json!({
            "entity": "event",
            "event": "payment.captured",
            "contains": ["payment"],
            "payload": {
                "payment": {
                    "entity": {
                        "id": "pay_Xyz",
                        "order_id": "order_Abc123",
                        "amount": 50000,
                        "status": "captured"
                    }
                }
            },
            "created_at": 1_700_000_100
        })
        .to_string();
        let gateway = gateway("http://localhost");
        let signature = compute_hmac_sha256("hook_secret", body.as_bytes()).unwrap();

        let event = gateway.verify_webhook(body.as_bytes(), &signature).await.unwrap();
        assert_eq!(event.event_type, GatewayEventType::PaymentCaptured);
        assert_eq!(event.order_id.as_deref(), Some("order_Abc123"));
        assert_eq!(event.payment_id.as_deref(), Some("pay_Xyz"));
        assert_eq!(event.amount, Some(50000));

        let err = gateway.verify_webhook(body.as_bytes(), "deadbeef").await.unwrap_err();
        assert!(matches!(err, ShopError::WebhookVerificationFailed(_)));
    }

    #[tokio::test]
    async fn test_refund_webhook_amount() {
        let body = json!({
            "event": "refund.processed",
            "payload": {
                "refund": { "entity": { "id": "rfnd_1", "payment_id": "pay_Xyz", "amount": 2000 } },
                "payment": { "entity": { "id": "pay_Xyz", "order_id": "order_Abc123", "amount": 50000 } }
            }
        })
        .to_string();
        let gateway = gateway("http://localhost");
        let signature = compute_hmac_sha256("hook_secret", body.as_bytes()).unwrap();

        let event = gateway.verify_webhook(body.as_bytes(), &signature).await.unwrap();
        assert_eq!(event.event_type, GatewayEventType::RefundProcessed);
        assert_eq!(event.amount, Some(2000));
    }

    #[tokio::test]
    async fn test_webhook_without_secret() {
        let config = RazorpayConfig::new("rzp_test_key", "test_secret");
        let gateway = RazorpayGateway::new(config).unwrap();
        let result = gateway.verify_webhook(b"{}", "sig").await;
        assert!(matches!(result, Err(ShopError::WebhookVerificationFailed(_))));
    }
}
