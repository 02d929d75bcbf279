//! # Validation Module
//!
//! Input validation for catalog, offer and checkout payloads.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Billing UI                                                   │
//! │  └── Immediate feedback (empty fields, obvious typos)                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: pos-api handler                                              │
//! │  ├── JSON decoding                                                     │
//! │  └── THIS MODULE: business rule validation                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── UNIQUE (sku, coupon_code, mobile, order_number)                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{NaiveDate, NaiveTime};

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::Percent;
use crate::{MAX_ITEM_QUANTITY, MAX_PRICE};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Minimum search length; shorter queries return nothing.
pub const MIN_SEARCH_LEN: usize = 2;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a display name (product, combo, offer).
///
/// ## Rules
/// - Not empty after trimming
/// - At most 200 characters
///
/// ## Returns
/// The trimmed name.
pub fn validate_name(field: &str, name: &str) -> ValidationResult<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::required(field));
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(name.to_string())
}

/// Validates a SKU.
///
/// ## Rules
/// - 1 to 50 characters
/// - Letters, digits, hyphens and underscores only
///
/// ## Example
/// ```rust
/// use thrive_core::validation::validate_sku;
///
/// assert!(validate_sku("CCLATT123").is_ok());
/// assert!(validate_sku("has space").is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::required("sku"));
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_') {
        return Err(ValidationError::invalid_format(
            "sku",
            "must contain only letters, numbers, hyphens, and underscores",
        ));
    }

    Ok(())
}

/// Validates and normalizes a coupon code to uppercase.
pub fn validate_coupon_code(code: &str) -> ValidationResult<String> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::required("coupon_code"));
    }

    if code.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "coupon_code".to_string(),
            max: 50,
        });
    }

    if !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(ValidationError::invalid_format(
            "coupon_code",
            "must contain only letters, numbers, hyphens, and underscores",
        ));
    }

    Ok(code.to_ascii_uppercase())
}

/// Validates a customer mobile number.
///
/// ## Rules
/// - Spaces, dashes and a leading `+` are stripped
/// - 10 to 15 digits remain
///
/// ## Returns
/// The digits-only form used as the customer key.
///
/// ## Example
/// ```rust
/// use thrive_core::validation::validate_mobile;
///
/// assert_eq!(validate_mobile("+91 98765-43210").unwrap(), "919876543210");
/// assert!(validate_mobile("12345").is_err());
/// ```
pub fn validate_mobile(mobile: &str) -> ValidationResult<String> {
    let trimmed = mobile.trim();
    let trimmed = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let digits: String = trimmed.chars().filter(|c| *c != ' ' && *c != '-').collect();

    if digits.is_empty() {
        return Err(ValidationError::required("mobile"));
    }

    if !digits.chars().all(|c| c.is_ascii_digit()) || !(10..=15).contains(&digits.len()) {
        return Err(ValidationError::invalid_format("mobile", "must be 10 to 15 digits"));
    }

    Ok(digits)
}

/// Trims a search query; `None` when it is too short to run.
pub fn validate_search_query(query: &str) -> ValidationResult<Option<String>> {
    let query = query.trim();

    if query.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    if query.chars().count() < MIN_SEARCH_LEN {
        return Ok(None);
    }

    Ok(Some(query.to_string()))
}

/// Parses an `HH:MM` (or `HH:MM:SS`) offer time bound.
pub fn parse_time_of_day(field: &str, value: &str) -> ValidationResult<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| ValidationError::invalid_format(field, "expected HH:MM"))
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a cart quantity.
///
/// ## Rules
/// - At least 1
/// - At most `MAX_ITEM_QUANTITY` (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a selling price. Catalog writes require a price above zero
/// and at most `MAX_PRICE`.
pub fn validate_selling_price(field: &str, price: Money) -> ValidationResult<()> {
    if !price.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    if price > MAX_PRICE {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: MAX_PRICE.cents(),
        });
    }

    Ok(())
}

/// Validates an amount in `0..=MAX_PRICE` (making cost, minimum order, ...).
pub fn validate_non_negative(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() || amount > MAX_PRICE {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_PRICE.cents(),
        });
    }

    Ok(())
}

/// Validates an offer percentage: `0 < pct ≤ 100`.
pub fn validate_discount_percent(pct: Percent) -> ValidationResult<()> {
    if pct.is_zero() || pct > Percent::HUNDRED {
        return Err(ValidationError::OutOfRange {
            field: "discount_percent".to_string(),
            min: 0,
            max: 100,
        });
    }

    Ok(())
}

/// Validates the store tax rate: `0 ≤ rate ≤ 100`.
pub fn validate_tax_rate(rate: Percent) -> ValidationResult<()> {
    if rate > Percent::HUNDRED {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 100,
        });
    }

    Ok(())
}

// =============================================================================
// Window Validators
// =============================================================================

/// Validates an offer's date window (inclusive, start ≤ end).
pub fn validate_date_window(start: NaiveDate, end: NaiveDate) -> ValidationResult<()> {
    if start > end {
        return Err(ValidationError::InvalidRange {
            start_field: "start_date".to_string(),
            end_field: "end_date".to_string(),
        });
    }

    Ok(())
}

/// Validates an optional intraday window.
///
/// ## Rules
/// - Both bounds or neither
/// - start ≤ end (windows that wrap past midnight are not supported)
pub fn validate_time_window(start: Option<NaiveTime>, end: Option<NaiveTime>) -> ValidationResult<()> {
    match (start, end) {
        (None, None) => Ok(()),
        (Some(start), Some(end)) if start <= end => Ok(()),
        (Some(_), Some(_)) => Err(ValidationError::InvalidRange {
            start_field: "start_time".to_string(),
            end_field: "end_time".to_string(),
        }),
        (Some(_), None) => Err(ValidationError::required("end_time")),
        (None, Some(_)) => Err(ValidationError::required("start_time")),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("name", "  Cold Coffee ").unwrap(), "Cold Coffee");
        assert!(validate_name("name", "   ").is_err());
        assert!(validate_name("name", &"A".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("CCLATT123").is_ok());
        assert!(validate_sku("latte_1").is_ok());
        assert!(validate_sku("").is_err());
        assert!(validate_sku("has space").is_err());
        assert!(validate_sku(&"A".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_coupon_code_normalizes() {
        assert_eq!(validate_coupon_code(" welcome10 ").unwrap(), "WELCOME10");
        assert!(validate_coupon_code("").is_err());
        assert!(validate_coupon_code("NO SPACES").is_err());
    }

    #[test]
    fn test_validate_mobile() {
        assert_eq!(validate_mobile("9876543210").unwrap(), "9876543210");
        assert_eq!(validate_mobile("98765 43210").unwrap(), "9876543210");
        assert!(validate_mobile("").is_err());
        assert!(validate_mobile("98765").is_err());
        assert!(validate_mobile("98765abc10").is_err());
        assert!(validate_mobile(&"9".repeat(16)).is_err());
    }

    #[test]
    fn test_validate_search_query() {
        assert_eq!(validate_search_query(" la ").unwrap(), Some("la".to_string()));
        assert_eq!(validate_search_query("l").unwrap(), None);
        assert!(validate_search_query(&"q".repeat(101)).is_err());
    }

    #[test]
    fn test_parse_time_of_day() {
        assert_eq!(
            parse_time_of_day("start_time", "16:30").unwrap(),
            NaiveTime::from_hms_opt(16, 30, 0).unwrap()
        );
        assert!(parse_time_of_day("start_time", "16:30:15").is_ok());
        assert!(parse_time_of_day("start_time", "4pm").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_amounts() {
        assert!(validate_selling_price("price", Money::from_cents(1)).is_ok());
        assert!(validate_selling_price("price", Money::zero()).is_err());
        assert!(validate_non_negative("making_cost", Money::zero()).is_ok());
        assert!(validate_non_negative("making_cost", Money::from_cents(-1)).is_err());

        assert!(validate_selling_price("price", MAX_PRICE).is_ok());
        assert!(matches!(
            validate_selling_price("price", Money::from_cents(i64::MAX / 2)),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(validate_non_negative("min_order_amount", MAX_PRICE + Money::from_cents(1)).is_err());
    }

    #[test]
    fn test_validate_percentages() {
        assert!(validate_discount_percent(Percent::from_bps(1)).is_ok());
        assert!(validate_discount_percent(Percent::HUNDRED).is_ok());
        assert!(validate_discount_percent(Percent::zero()).is_err());
        assert!(validate_discount_percent(Percent::from_bps(10_001)).is_err());

        assert!(validate_tax_rate(Percent::zero()).is_ok());
        assert!(validate_tax_rate(Percent::from_bps(1800)).is_ok());
        assert!(validate_tax_rate(Percent::from_bps(10_001)).is_err());
    }

    #[test]
    fn test_validate_windows() {
        let d = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        assert!(validate_date_window(d("2026-10-01"), d("2026-10-01")).is_ok());
        assert!(validate_date_window(d("2026-10-02"), d("2026-10-01")).is_err());

        let t = |h| NaiveTime::from_hms_opt(h, 0, 0);
        assert!(validate_time_window(None, None).is_ok());
        assert!(validate_time_window(t(9), t(11)).is_ok());
        assert!(validate_time_window(t(11), t(9)).is_err());
        assert!(validate_time_window(t(9), None).is_err());
        assert!(validate_time_window(None, t(9)).is_err());
    }
}
