//! # Drafts
//!
//! Unsaved catalog and offer payloads. Each draft knows how to validate
//! and normalize itself; repositories only ever persist validated drafts.
//!
//! ```text
//! API request ──► XxxDraft ──► draft.validate()? ──► repository.create(&draft)
//!                                   │
//!                                   └── trims names, uppercases coupon
//!                                       codes, drops scope on store-wide
//!                                       offers
//! ```

use chrono::{NaiveDate, NaiveTime};

use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{CatalogItemRef, Discount};
use crate::validation::{
    validate_coupon_code, validate_date_window, validate_discount_percent, validate_name,
    validate_non_negative, validate_selling_price, validate_sku, validate_time_window,
};

// =============================================================================
// Product
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub name: String,
    /// Generated from the name when `None`.
    pub sku: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Money,
    pub making_cost: Money,
    pub stock_quantity: i64,
    pub min_stock_level: i64,
    pub image_url: Option<String>,
    pub is_active: bool,
}

impl ProductDraft {
    /// Validates and normalizes in place.
    ///
    /// ## Rules
    /// - Name required, ≤ 200 chars
    /// - Price > 0, making cost ≥ 0
    /// - Explicit SKU must be well-formed (uppercased)
    /// - Stock levels ≥ 0
    pub fn validate(&mut self) -> CoreResult<()> {
        self.name = validate_name("name", &self.name)?;
        validate_selling_price("price", self.price)?;
        validate_non_negative("making_cost", self.making_cost)?;

        self.sku = match self.sku.take().map(|s| s.trim().to_string()) {
            Some(sku) if !sku.is_empty() => {
                validate_sku(&sku)?;
                Some(sku.to_ascii_uppercase())
            }
            _ => None,
        };

        if self.stock_quantity < 0 {
            return Err(ValidationError::OutOfRange {
                field: "stock_quantity".to_string(),
                min: 0,
                max: i64::MAX,
            }
            .into());
        }
        if self.min_stock_level < 0 {
            return Err(ValidationError::OutOfRange {
                field: "min_stock_level".to_string(),
                min: 0,
                max: i64::MAX,
            }
            .into());
        }

        self.description = non_blank(self.description.take());
        self.category = non_blank(self.category.take());
        self.image_url = non_blank(self.image_url.take());

        Ok(())
    }
}

/// SKU prefix derived from a product name: `CC` + first four letters or
/// digits, uppercased. The repository appends a random `100..=999`.
///
/// ## Example
/// ```rust
/// use thrive_core::drafts::sku_stem;
///
/// assert_eq!(sku_stem("Cold Coffee"), "CCCOLD");
/// assert_eq!(sku_stem("Tea"), "CCTEA");
/// ```
pub fn sku_stem(name: &str) -> String {
    let letters: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(4)
        .collect::<String>()
        .to_ascii_uppercase();
    format!("CC{}", letters)
}

// =============================================================================
// Combo
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ComboDraft {
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    /// Component products in display order. Duplicates are allowed
    /// (two lattes in one combo).
    pub product_ids: Vec<String>,
    pub is_active: bool,
}

impl ComboDraft {
    pub fn validate(&mut self) -> CoreResult<()> {
        self.name = validate_name("name", &self.name)?;
        validate_selling_price("price", self.price)?;

        self.product_ids = self
            .product_ids
            .iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();

        if self.product_ids.is_empty() {
            return Err(ValidationError::required("products").into());
        }

        self.description = non_blank(self.description.take());

        Ok(())
    }
}

// =============================================================================
// Offer
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct OfferDraft {
    pub name: String,
    pub description: Option<String>,
    pub discount: Discount,
    pub apply_to_all: bool,
    pub scope: Vec<CatalogItemRef>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub is_active: bool,
    pub coupon_code: Option<String>,
    pub usage_limit: Option<i64>,
    pub min_order_amount: Option<Money>,
    pub max_discount_amount: Option<Money>,
}

impl OfferDraft {
    /// Validates and normalizes in place.
    ///
    /// ## Rules
    /// - Name required
    /// - `start_date ≤ end_date`; time bounds both-or-neither, ordered
    /// - Percentage in (0, 100]; fixed amount > 0
    /// - Scoped offers list at least one item (duplicates removed);
    ///   store-wide offers carry no scope
    /// - Coupon code uppercased; usage limit ≥ 1
    /// - Minimum order ≥ 0; discount cap > 0
    pub fn validate(&mut self) -> CoreResult<()> {
        self.name = validate_name("name", &self.name)?;
        validate_date_window(self.start_date, self.end_date)?;
        validate_time_window(self.start_time, self.end_time)?;

        match self.discount {
            Discount::Percentage(pct) => validate_discount_percent(pct)?,
            Discount::FixedAmount(value) => validate_selling_price("discount_value", value)?,
        }

        if self.apply_to_all {
            self.scope.clear();
        } else {
            let mut seen = Vec::with_capacity(self.scope.len());
            for item in self.scope.drain(..) {
                if !seen.contains(&item) {
                    seen.push(item);
                }
            }
            self.scope = seen;
            if self.scope.is_empty() {
                return Err(ValidationError::required("applicable_items").into());
            }
        }

        self.coupon_code = match self.coupon_code.take() {
            Some(code) if !code.trim().is_empty() => Some(validate_coupon_code(&code)?),
            _ => None,
        };

        if let Some(limit) = self.usage_limit {
            if limit < 1 {
                return Err(ValidationError::MustBePositive {
                    field: "usage_limit".to_string(),
                }
                .into());
            }
        }

        if let Some(minimum) = self.min_order_amount {
            validate_non_negative("min_order_amount", minimum)?;
        }
        if let Some(cap) = self.max_discount_amount {
            validate_selling_price("max_discount_amount", cap)?;
        }

        self.description = non_blank(self.description.take());

        Ok(())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// =============================================================================
// Unit Tests
// =============================================================================
