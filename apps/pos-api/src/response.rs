//! API response envelope.
//!
//! Every JSON response, success or error, uses the same shape:
//!
//! ```json
//! {
//!   "success": true,
//!   "data": { ... },
//!   "message": "Order created",
//!   "timestamp": "2026-10-19T08:30:00+00:00",
//!   "version": "2.0.0"
//! }
//! ```
//!
//! The billing UI predates this server and checks `success` before
//! reading `data`, so the field names are fixed. All five keys are always
//! present: errors carry `"data": null`, and a success without its own
//! message says [`DEFAULT_MESSAGE`].

use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::error::ApiError;

/// API version reported in every envelope.
pub const API_VERSION: &str = "2.0.0";

/// Message on successes that don't set one.
pub const DEFAULT_MESSAGE: &str = "Operation successful";

/// Unified API response structure.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub timestamp: String,
    pub version: &'static str,
}

impl<T> ApiResponse<T> {
    /// Create a successful response
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            message: Some(DEFAULT_MESSAGE.to_string()),
            timestamp: Utc::now().to_rfc3339(),
            version: API_VERSION,
        }
    }

    /// Create a successful response with custom message
    pub fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        ApiResponse {
            message: Some(message.into()),
            ..ApiResponse::ok(data)
        }
    }
}

impl ApiResponse<()> {
    /// Create an error response
    pub fn error(message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            message: Some(message.into()),
            timestamp: Utc::now().to_rfc3339(),
            version: API_VERSION,
        }
    }
}

/// Handler result carrying the envelope.
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Handler result for creates (`201 Created`).
pub type Created<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

/// `200 OK` with data.
pub fn ok<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::ok(data)))
}

/// `201 Created` with data and a message.
pub fn created<T: Serialize>(data: T, message: impl Into<String>) -> Created<T> {
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok_with_message(data, message)),
    ))
}
