//! # Request Handlers
//!
//! Axum request handlers, grouped by the part of the shop they serve.
//! Every handler returns `Result<_, ApiError>`; shop errors are rendered as
//! `{ "success": false, "error": ..., "code": ... }` with the status from
//! `ShopError::status_code()`.

pub mod account;
pub mod admin;
pub mod orders;
pub mod payments;
pub mod storefront;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use shop_core::ShopError;
use tracing::{debug, error};

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: u16,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            success: false,
            error: error.into(),
            code,
        }
    }
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub type ApiResult<T> = Result<Json<T>, ApiError>;

pub fn shop_error_to_response(err: ShopError) -> ApiError {
    let code = err.status_code();
    if code >= 500 {
        error!("Request failed: {}", err);
    } else {
        debug!("Request rejected: {}", err);
    }
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorResponse::new(err.to_string(), code)))
}

pub fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new(message, 400)),
    )
}

/// `?page=` for paginated listings
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: usize,
}

/// `?search=&page=` for admin listings
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub page: usize,
}

impl SearchQuery {
    pub fn search(&self) -> Option<&str> {
        self.search.as_deref().filter(|s| !s.trim().is_empty())
    }
}

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "nextick",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shop_core::{Currency, Price};

    #[test]
    fn test_error_response() {
        let err = ErrorResponse::new("Test error", 400);
        assert!(!err.success);
        assert_eq!(err.error, "Test error");
        assert_eq!(err.code, 400);
    }

    #[test]
    fn test_shop_error_conversion() {
        let (status, Json(body)) =
            shop_error_to_response(ShopError::InvalidRequest("Bad data".to_string()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "Invalid request: Bad data");

        let (status, _) = shop_error_to_response(ShopError::InsufficientBalance {
            required: Price::from_minor(100, Currency::INR),
            available: Price::zero(Currency::INR),
        });
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = shop_error_to_response(ShopError::not_found("Order", "x"));
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_blank_search_is_ignored() {
        let query = SearchQuery {
            search: Some("  ".into()),
            page: 1,
        };
        assert!(query.search().is_none());
    }
}
