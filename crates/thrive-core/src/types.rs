//! # Domain Types
//!
//! Core domain types used throughout Thrive POS.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │     Combo       │   │     Offer       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  discount       │       │
//! │  │  sku            │   │  product_ids    │   │  date/time win  │       │
//! │  │  price_cents    │   │  price_cents    │   │  apply_to_all   │       │
//! │  │  making_cost    │   │  making_cost Σ  │   │  scope[]        │       │
//! │  └─────────────────┘   └─────────────────┘   │  coupon fields  │       │
//! │           ▲                     ▲            └─────────────────┘       │
//! │           └──── CatalogItemRef ─┘                     │                 │
//! │                 Product(id) | Combo(id) ◄── scope ────┘                 │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Order       │   │   OrderItem     │   │    Customer     │       │
//! │  │  order_number   │   │  item ref       │   │  mobile (uniq)  │       │
//! │  │  totals (cents) │   │  price snapshot │   │  name           │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Percent
// =============================================================================

/// A percentage in basis points (1 bps = 0.01%).
///
/// Used for both the store tax rate (1800 = 18%) and percentage offers
/// (1250 = 12.5% off).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Percent(u32);

impl Percent {
    /// 100%.
    pub const HUNDRED: Percent = Percent(10_000);

    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Percent(bps)
    }

    /// Creates a percentage from a float such as `12.5`, rounded to the
    /// nearest basis point. Only for request decoding; never for math.
    pub fn from_percentage(pct: f64) -> Self {
        Percent((pct * 100.0).round() as u32)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a float percentage (display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Percent(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for Percent {
    fn default() -> Self {
        Percent::zero()
    }
}

/// Renders `18.00`, `12.50`.
impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// Parses decimal text (`"18"`, `"18.00"`, `"12.5"`) without going
/// through floating point. At most two fractional digits.
impl FromStr for Percent {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ValidationError::invalid_format("percent", format!("'{}' is not a percentage", s));
        let s = s.trim();
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() || frac.len() > 2 {
            return Err(bad());
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(bad());
        }
        let whole: u32 = whole.parse().map_err(|_| bad())?;
        let frac: u32 = if frac.is_empty() {
            0
        } else {
            let padded = format!("{:0<2}", frac);
            padded.parse().map_err(|_| bad())?
        };
        whole
            .checked_mul(100)
            .and_then(|w| w.checked_add(frac))
            .map(Percent)
            .ok_or_else(bad)
    }
}

// =============================================================================
// Catalog Item Reference
// =============================================================================

/// Which table a catalog reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Product,
    Combo,
}

impl ItemType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ItemType::Product => "product",
            ItemType::Combo => "combo",
        }
    }
}

impl FromStr for ItemType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "product" => Ok(ItemType::Product),
            "combo" => Ok(ItemType::Combo),
            _ => Err(ValidationError::NotAllowed {
                field: "item_type".to_string(),
                allowed: vec!["product".to_string(), "combo".to_string()],
            }),
        }
    }
}

/// A typed pointer at a product or a combo.
///
/// Resolved once when a cart line or an offer scope entry is built;
/// downstream code matches on the variant instead of comparing strings.
///
/// ## Serialization
/// ```json
/// { "item_type": "combo", "item_id": "3f0c..." }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "item_type", content = "item_id", rename_all = "lowercase")]
pub enum CatalogItemRef {
    Product(String),
    Combo(String),
}

impl CatalogItemRef {
    pub fn new(item_type: ItemType, id: impl Into<String>) -> Self {
        match item_type {
            ItemType::Product => CatalogItemRef::Product(id.into()),
            ItemType::Combo => CatalogItemRef::Combo(id.into()),
        }
    }

    pub fn item_type(&self) -> ItemType {
        match self {
            CatalogItemRef::Product(_) => ItemType::Product,
            CatalogItemRef::Combo(_) => ItemType::Combo,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            CatalogItemRef::Product(id) | CatalogItemRef::Combo(id) => id,
        }
    }

    /// Parses the legacy `"product-<id>"` / `"combo-<id>"` form used by
    /// the offer form's item picker.
    pub fn parse_tagged(value: &str) -> Result<Self, ValidationError> {
        let (kind, id) = value
            .split_once('-')
            .ok_or_else(|| ValidationError::invalid_format("applicable_items", format!("'{}' is not type-id", value)))?;
        if id.trim().is_empty() {
            return Err(ValidationError::required("applicable_items id"));
        }
        Ok(CatalogItemRef::new(kind.parse()?, id.trim()))
    }
}

impl fmt::Display for CatalogItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.item_type().as_str(), self.id())
    }
}

// =============================================================================
// Product
// =============================================================================

/// A menu item.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit, generated as `CC<NAME><NNN>` when omitted.
    pub sku: String,

    pub name: String,

    pub description: Option<String>,

    pub category: Option<String>,

    /// Selling price in minor units.
    pub price_cents: i64,

    /// What it costs the kitchen to make one, for profit reporting.
    pub making_cost_cents: i64,

    pub stock_quantity: i64,

    /// Dashboard flags the product once stock falls to this level.
    pub min_stock_level: i64,

    pub image_url: Option<String>,

    /// Inactive products stay in the table for order history.
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    #[inline]
    pub fn making_cost(&self) -> Money {
        Money::from_cents(self.making_cost_cents)
    }

    pub fn item_ref(&self) -> CatalogItemRef {
        CatalogItemRef::Product(self.id.clone())
    }

    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity <= self.min_stock_level
    }
}

// =============================================================================
// Combo
// =============================================================================

/// A fixed bundle of products sold at one price.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Combo {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,

    /// Cached Σ of the component products' making costs, refreshed
    /// whenever the combo is written.
    pub making_cost_cents: i64,

    pub is_active: bool,

    /// Component product ids in display order. Loaded from `combo_items`.
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub product_ids: Vec<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Combo {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    #[inline]
    pub fn making_cost(&self) -> Money {
        Money::from_cents(self.making_cost_cents)
    }

    pub fn item_ref(&self) -> CatalogItemRef {
        CatalogItemRef::Combo(self.id.clone())
    }

    /// Sums component making costs. A product listed twice counts twice.
    ///
    /// ## Example
    /// ```rust
    /// use thrive_core::{Combo, Money};
    ///
    /// let cost = Combo::aggregate_making_cost([Money::from_cents(1500), Money::from_cents(2000)]);
    /// assert_eq!(cost.cents(), 3500);
    /// ```
    pub fn aggregate_making_cost(component_costs: impl IntoIterator<Item = Money>) -> Money {
        component_costs.into_iter().sum()
    }
}

// =============================================================================
// Offers
// =============================================================================

/// How an offer's value is stored in the `offers.offer_type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OfferType {
    Percentage,
    FixedAmount,
}

/// What an offer takes off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Discount {
    /// Percent off the subtotal (store-wide) or off each matching line.
    Percentage(Percent),
    /// Flat amount off the subtotal (store-wide) or off each matching
    /// line, never more than that line's own total.
    FixedAmount(Money),
}

impl Discount {
    pub fn offer_type(&self) -> OfferType {
        match self {
            Discount::Percentage(_) => OfferType::Percentage,
            Discount::FixedAmount(_) => OfferType::FixedAmount,
        }
    }

    /// The integer stored in `offers.discount_value`: basis points for
    /// percentages, minor units for fixed amounts.
    pub fn stored_value(&self) -> i64 {
        match self {
            Discount::Percentage(p) => p.bps() as i64,
            Discount::FixedAmount(m) => m.cents(),
        }
    }

    /// Inverse of [`Discount::offer_type`] + [`Discount::stored_value`].
    pub fn from_stored(offer_type: OfferType, value: i64) -> Self {
        match offer_type {
            OfferType::Percentage => {
                Discount::Percentage(Percent::from_bps(value.clamp(0, u32::MAX as i64) as u32))
            }
            OfferType::FixedAmount => Discount::FixedAmount(Money::from_cents(value)),
        }
    }
}

/// A discount rule: store-wide or item-scoped, optionally bound to a
/// coupon code.
///
/// ## Eligibility
/// ```text
/// is_active? ──no──► excluded
///     │yes
///     ▼
/// start_date ≤ today ≤ end_date? ──no──► excluded
///     │yes
///     ▼
/// start_time ≤ now ≤ end_time? (when set) ──no──► excluded
///     │yes
///     ▼
/// candidate
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Offer {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub discount: Discount,

    /// When false, only lines matching `scope` are discounted.
    pub apply_to_all: bool,
    #[serde(rename = "applicable_items")]
    pub scope: Vec<CatalogItemRef>,

    #[ts(as = "String")]
    pub start_date: NaiveDate,
    #[ts(as = "String")]
    pub end_date: NaiveDate,
    #[ts(as = "Option<String>")]
    pub start_time: Option<NaiveTime>,
    #[ts(as = "Option<String>")]
    pub end_time: Option<NaiveTime>,

    pub is_active: bool,

    pub coupon_code: Option<String>,
    pub usage_limit: Option<i64>,
    pub usage_count: i64,
    pub min_order_amount: Option<Money>,

    /// Caps this offer's total contribution to a bill.
    pub max_discount_amount: Option<Money>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Offer {
    /// Whether the offer may be applied at local wall-clock time `now`.
    /// All bounds are inclusive and the time of day is compared in whole
    /// seconds, so `18:00:00.5` is still inside a window ending `18:00`.
    pub fn is_available_at(&self, now: NaiveDateTime) -> bool {
        if !self.is_active {
            return false;
        }

        let today = now.date();
        if today < self.start_date || today > self.end_date {
            return false;
        }

        let time = now.time();
        let time = time.with_nanosecond(0).unwrap_or(time);
        if let Some(start) = self.start_time {
            if time < start {
                return false;
            }
        }
        if let Some(end) = self.end_time {
            if time > end {
                return false;
            }
        }

        true
    }

    /// Whether a cart line for `item` is discounted by this offer.
    pub fn applies_to(&self, item: &CatalogItemRef) -> bool {
        self.apply_to_all || self.scope.contains(item)
    }

    /// Whether the coupon has no redemptions left.
    pub fn is_exhausted(&self) -> bool {
        match self.usage_limit {
            Some(limit) => self.usage_count >= limit,
            None => false,
        }
    }
}

/// Row of `GET /api/offers?checkout_offers=1`, the billing screen's
/// offer picker.
///
/// `discount_percent` is the picker's label value: the percentage for
/// percentage offers, the amount in major units for fixed ones. Pricing
/// never reads it; the preview re-reads offers by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutOffer {
    pub id: String,
    pub name: String,
    pub discount_percent: f64,
    pub discount_type: OfferType,
    pub apply_to_all: bool,
    pub applicable_items: Vec<CatalogItemRef>,
}

impl From<&Offer> for CheckoutOffer {
    fn from(offer: &Offer) -> Self {
        let discount_percent = match offer.discount {
            Discount::Percentage(pct) => pct.percentage(),
            Discount::FixedAmount(value) => value.cents() as f64 / 100.0,
        };
        CheckoutOffer {
            id: offer.id.clone(),
            name: offer.name.clone(),
            discount_percent,
            discount_type: offer.discount.offer_type(),
            apply_to_all: offer.apply_to_all,
            applicable_items: offer.scope.clone(),
        }
    }
}

// =============================================================================
// Order Enums
// =============================================================================

/// Generates `as_str`, `ALL` and a `FromStr` that reports the allowed set.
macro_rules! string_enum {
    ($ty:ident, $field:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub const fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }
        }

        impl FromStr for $ty {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($ty::$variant),)+
                    _ => Err(ValidationError::NotAllowed {
                        field: $field.to_string(),
                        allowed: $ty::ALL.iter().map(|v| v.as_str().to_string()).collect(),
                    }),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Upi,
    Wallet,
    Online,
}

string_enum!(PaymentMethod, "payment_method", {
    Cash => "cash",
    Card => "card",
    Upi => "upi",
    Wallet => "wallet",
    Online => "online",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    DineIn,
    Takeaway,
    Delivery,
    Online,
}

string_enum!(OrderType, "order_type", {
    DineIn => "dine_in",
    Takeaway => "takeaway",
    Delivery => "delivery",
    Online => "online",
});

impl Default for OrderType {
    fn default() -> Self {
        OrderType::DineIn
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Preparing,
    Ready,
    Completed,
    Cancelled,
}

string_enum!(OrderStatus, "status", {
    Pending => "pending",
    Preparing => "preparing",
    Ready => "ready",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl OrderStatus {
    /// Completed and cancelled orders never change status again.
    pub const fn is_closed(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

// =============================================================================
// Order
// =============================================================================

/// A finalized order. Totals never change after insert.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: String,

    /// Human-facing number printed on the bill, e.g. `TC2610190427`.
    pub order_number: String,

    pub customer_id: Option<String>,
    pub order_type: OrderType,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub final_amount_cents: i64,

    /// Tax rate that was in force at checkout.
    pub tax_rate_bps: u32,

    pub applied_offer_id: Option<String>,
    pub coupon_code: Option<String>,
    pub notes: Option<String>,

    /// Local calendar date of the sale. Reports group on this.
    #[ts(as = "String")]
    pub business_date: NaiveDate,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Order {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    #[inline]
    pub fn discount(&self) -> Money {
        Money::from_cents(self.discount_cents)
    }

    #[inline]
    pub fn tax(&self) -> Money {
        Money::from_cents(self.tax_cents)
    }

    #[inline]
    pub fn final_amount(&self) -> Money {
        Money::from_cents(self.final_amount_cents)
    }
}

/// A line of a finalized order. Name, price and making cost are frozen
/// at sale time so later catalog edits don't rewrite history.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub item_type: ItemType,
    pub item_id: String,
    pub name_snapshot: String,
    pub unit_price_cents: i64,
    pub making_cost_cents: i64,
    pub quantity: i64,
    pub line_total_cents: i64,
}

impl OrderItem {
    pub fn item_ref(&self) -> CatalogItemRef {
        CatalogItemRef::new(self.item_type, self.item_id.clone())
    }

    /// `(price − making_cost) × quantity`.
    pub fn profit(&self) -> Money {
        Money::from_cents(self.unit_price_cents - self.making_cost_cents).multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Customer
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: Option<String>,
    /// Digits only, unique.
    pub mobile: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
