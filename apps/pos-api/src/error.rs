//! # API Error Type
//!
//! Maps every lower-layer error onto an HTTP status and the response
//! envelope.
//!
//! ## Status Mapping
//! ```text
//! ┌──────────────────────────────────────────┬────────┬─────────────────────┐
//! │ Source                                   │ Status │ Message             │
//! ├──────────────────────────────────────────┼────────┼─────────────────────┤
//! │ ValidationError, InvalidCart, bad JSON   │ 400    │ as raised           │
//! │ DbError::NotFound                        │ 404    │ as raised           │
//! │ DbError::UniqueViolation                 │ 409    │ as raised           │
//! │ OrderNumberCollision                     │ 409    │ as raised           │
//! │ InvalidCoupon, CouponExhausted,          │ 422    │ as raised           │
//! │ MinimumOrderNotMet, CatalogItemUnavail., │        │                     │
//! │ OrderLocked                              │        │                     │
//! │ rate limiter                             │ 429    │ fixed               │
//! │ anything else                            │ 500    │ generic, cause      │
//! │                                          │        │ logged with error!  │
//! └──────────────────────────────────────────┴────────┴─────────────────────┘
//! ```

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

use crate::response::ApiResponse;
use thrive_core::{CoreError, ValidationError};
use thrive_db::{CheckoutError, DbError};

/// Errors returned by handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed input (400).
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// Well-formed request that breaks a business rule (422).
    #[error("{0}")]
    BusinessRule(String),

    #[error("Too many requests, try again later")]
    RateLimited,

    /// Never shown to the client; logged when rendered.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::BusinessRule(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match &self {
            ApiError::Internal(cause) => {
                error!(target: "internal", error = %cause, "Internal error occurred");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ApiResponse::error(message))).into_response()
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(inner) => inner.into(),
            CoreError::InvalidCart { .. } => ApiError::Validation(err.to_string()),
            CoreError::InvalidCoupon(_)
            | CoreError::CouponExhausted(_)
            | CoreError::MinimumOrderNotMet { .. }
            | CoreError::CatalogItemUnavailable(_)
            | CoreError::OrderLocked { .. } => ApiError::BusinessRule(err.to_string()),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Rejected(core) => core.into(),
            DbError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            DbError::UniqueViolation { .. } => ApiError::Conflict(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::Rejected(core) => core.into(),
            CheckoutError::OrderNumberCollision { .. } => ApiError::Conflict(err.to_string()),
            // Cause already logged by thrive-db
            CheckoutError::OrderCreationFailed => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use thrive_core::{CatalogItemRef, Money};

    #[test]
    fn test_core_errors_map_to_statuses() {
        let cases = [
            (CoreError::invalid_cart("Cart is empty"), StatusCode::BAD_REQUEST),
            (CoreError::InvalidCoupon("X".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (CoreError::CouponExhausted("X".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (
                CoreError::MinimumOrderNotMet {
                    minimum: Money::from_cents(50000),
                    subtotal: Money::from_cents(100),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                CoreError::CatalogItemUnavailable(CatalogItemRef::Product("p".into())),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                CoreError::Validation(ValidationError::required("name")),
                StatusCode::BAD_REQUEST,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_db_errors_map_to_statuses() {
        assert_eq!(
            ApiError::from(DbError::not_found("Product", "p1")).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(DbError::duplicate("sku", "CCLATT100")).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(DbError::QueryFailed("disk I/O error".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(CheckoutError::OrderNumberCollision { attempts: 5 }).status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_internal_message_is_generic() {
        let err = ApiError::from(DbError::QueryFailed("no such table: orders".into()));
        assert!(matches!(err, ApiError::Internal(_)));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
