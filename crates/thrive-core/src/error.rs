//! # Error Types
//!
//! Domain-specific error types for thrive-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  thrive-core errors (this file)                                        │
//! │  ├── CoreError        - Cart, coupon and catalog rule violations       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  thrive-db errors (separate crate)                                     │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── CheckoutError    - Order finalization outcome                     │
//! │                                                                         │
//! │  pos-api errors                                                        │
//! │  └── ApiError         - HTTP status + response envelope                │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → CheckoutError → ApiError → Client │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. `thiserror` derives, no manual Display impls
//! 2. Messages carry the offending value (coupon code, item id, amount)
//! 3. Every variant maps to exactly one HTTP status in pos-api

use thiserror::Error;

use crate::money::Money;
use crate::types::{CatalogItemRef, OrderStatus};

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised by the pricing engine and the
/// checkout validators.
///
/// None of these are raised for an expired or inactive offer during a
/// *preview*: ineligible offers simply contribute nothing there.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Cart is empty or a line is malformed.
    ///
    /// ## When This Occurs
    /// - No lines at all
    /// - Quantity below 1 or above `MAX_ITEM_QUANTITY`
    /// - Negative unit price
    /// - More than `MAX_CART_ITEMS` lines
    #[error("Invalid cart: {reason}")]
    InvalidCart { reason: String },

    /// Coupon code does not match an active offer valid right now.
    #[error("Invalid or expired coupon code: {0}")]
    InvalidCoupon(String),

    /// Coupon has been redeemed `usage_limit` times already.
    ///
    /// ## User Workflow
    /// ```text
    /// Cashier enters "WELCOME10" (limit 100, used 100)
    ///      │
    ///      ▼
    /// CouponExhausted("WELCOME10")
    ///      │
    ///      ▼
    /// UI shows: "Coupon usage limit exceeded"
    /// ```
    #[error("Coupon usage limit exceeded: {0}")]
    CouponExhausted(String),

    /// Subtotal is below the coupon's minimum order amount.
    #[error("Minimum order amount for this coupon is {minimum} (subtotal {subtotal})")]
    MinimumOrderNotMet { minimum: Money, subtotal: Money },

    /// A product or combo referenced by the cart is missing or inactive.
    #[error("Catalog item unavailable: {0}")]
    CatalogItemUnavailable(CatalogItemRef),

    /// The order's status forbids the change (closed orders can't move,
    /// only pending orders can be deleted).
    #[error("Cannot {action} order {order_number}: it is {status}")]
    OrderLocked {
        order_number: String,
        status: OrderStatus,
        action: &'static str,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates an InvalidCart error.
    pub fn invalid_cart(reason: impl Into<String>) -> Self {
        CoreError::InvalidCart {
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any business logic or database write runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (bad mobile number, unparseable time, ...).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Two fields that must be ordered are not (start after end).
    #[error("{start_field} must not be after {end_field}")]
    InvalidRange {
        start_field: String,
        end_field: String,
    },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::MinimumOrderNotMet {
            minimum: Money::from_cents(50000),
            subtotal: Money::from_cents(14000),
        };
        assert_eq!(
            err.to_string(),
            "Minimum order amount for this coupon is 500.00 (subtotal 140.00)"
        );

        let err = CoreError::CatalogItemUnavailable(CatalogItemRef::Combo("c-1".to_string()));
        assert_eq!(err.to_string(), "Catalog item unavailable: combo c-1");

        let err = CoreError::OrderLocked {
            order_number: "TC2610190042".to_string(),
            status: OrderStatus::Completed,
            action: "update",
        };
        assert_eq!(err.to_string(), "Cannot update order TC2610190042: it is completed");
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(ValidationError::required("name").to_string(), "name is required");

        let err = ValidationError::InvalidRange {
            start_field: "start_date".to_string(),
            end_field: "end_date".to_string(),
        };
        assert_eq!(err.to_string(), "start_date must not be after end_date");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("mobile").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
