//! # Pricing Engine
//!
//! Turns a cart plus a set of offers into subtotal, discount and total.
//! Two entry points share one discount rule:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Checkout Pricing                                │
//! │                                                                         │
//! │  Billing screen (preview)              POST /api/orders (authoritative) │
//! │  ─────────────────────────             ──────────────────────────────── │
//! │  cart (client snapshot prices)         cart (prices re-read from DB)    │
//! │  + any selected offers                 + at most one coupon offer       │
//! │  + optional quick 10%                  + coupon checks (limit, minimum) │
//! │          │                                        │                     │
//! │          ▼                                        ▼                     │
//! │  compute_cart_totals()                 finalize_totals()                │
//! │          │                                        │                     │
//! │          └──────────► offer_discount() ◄──────────┘                     │
//! │                              │                                          │
//! │                              ▼                                          │
//! │              discount = min(Σ contributions, subtotal)                  │
//! │              total    = subtotal − discount                             │
//! │                              │                                          │
//! │                              ▼ (authoritative only)                     │
//! │              tax      = total × tax_rate                                │
//! │              final    = total + tax                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything here is pure: `now` is a parameter, nothing is read from
//! the clock, and identical inputs give identical minor-unit results.
//!
//! ## Example
//! ```rust
//! use chrono::NaiveDate;
//! use thrive_core::pricing::{compute_cart_totals, CartLine};
//! use thrive_core::{CatalogItemRef, Money};
//!
//! let cart = vec![
//!     CartLine::new(CatalogItemRef::Product("latte".into()), Money::from_cents(4500), 2),
//!     CartLine::new(CatalogItemRef::Combo("brunch".into()), Money::from_cents(5000), 1),
//! ];
//! let now = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap().and_hms_opt(10, 0, 0).unwrap();
//!
//! let totals = compute_cart_totals(&cart, &[], now, true).unwrap();
//! assert_eq!(totals.subtotal.cents(), 14000);
//! assert_eq!(totals.discount.cents(), 1400);
//! assert_eq!(totals.total.cents(), 12600);
//! ```

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{CatalogItemRef, Discount, Offer, Percent};
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY, MAX_PRICE};

/// The billing screen's ad-hoc "quick discount" toggle: flat 10% of the
/// subtotal, independent of the offer catalog.
pub const QUICK_DISCOUNT_RATE: Percent = Percent::from_bps(1000);

// =============================================================================
// Cart Types
// =============================================================================

/// One line of an in-progress bill.
///
/// `unit_price` is the price captured when the line was added. The
/// preview trusts it; order finalization replaces it with the current
/// catalog price before calling [`finalize_totals`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartLine {
    pub item: CatalogItemRef,
    pub unit_price: Money,
    pub quantity: i64,
}

impl CartLine {
    pub fn new(item: CatalogItemRef, unit_price: Money, quantity: i64) -> Self {
        CartLine {
            item,
            unit_price,
            quantity,
        }
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

/// Preview result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartTotals {
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
}

impl CartTotals {
    /// Applies the clamp: `0 ≤ discount ≤ subtotal`, `total ≥ 0`.
    fn clamped(subtotal: Money, raw_discount: Money) -> Self {
        let discount = raw_discount.min(subtotal).max(Money::zero());
        let total = (subtotal - discount).max(Money::zero());
        CartTotals {
            subtotal,
            discount,
            total,
        }
    }
}

/// Authoritative result, persisted on the order row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub final_amount: Money,
}

// =============================================================================
// Cart Validation
// =============================================================================

/// Rejects empty carts and malformed lines.
///
/// ## Rules
/// - At least one line, at most `MAX_CART_ITEMS`
/// - Every quantity in `1..=MAX_ITEM_QUANTITY`
/// - No negative unit prices (zero is a comped item), none above `MAX_PRICE`
/// - The subtotal fits in `Money` without overflow
pub fn validate_cart(cart: &[CartLine]) -> CoreResult<()> {
    if cart.is_empty() {
        return Err(CoreError::invalid_cart("cart is empty"));
    }

    if cart.len() > MAX_CART_ITEMS {
        return Err(CoreError::invalid_cart(format!(
            "cart cannot have more than {} lines",
            MAX_CART_ITEMS
        )));
    }

    for (index, line) in cart.iter().enumerate() {
        let n = index + 1;
        if line.quantity < 1 {
            return Err(CoreError::invalid_cart(format!(
                "line {}: quantity must be at least 1",
                n
            )));
        }
        if line.quantity > MAX_ITEM_QUANTITY {
            return Err(CoreError::invalid_cart(format!(
                "line {}: quantity cannot exceed {}",
                n, MAX_ITEM_QUANTITY
            )));
        }
        if line.unit_price.is_negative() {
            return Err(CoreError::invalid_cart(format!(
                "line {}: unit price cannot be negative",
                n
            )));
        }
        if line.unit_price > MAX_PRICE {
            return Err(CoreError::invalid_cart(format!(
                "line {}: unit price cannot exceed {}",
                n, MAX_PRICE
            )));
        }
    }

    cart.iter()
        .try_fold(Money::zero(), |acc, line| {
            line.unit_price
                .checked_multiply_quantity(line.quantity)
                .and_then(|total| acc.checked_add(total))
        })
        .ok_or_else(|| CoreError::invalid_cart("cart total is too large"))?;

    Ok(())
}

/// `Σ unit_price × quantity`. Callers run [`validate_cart`] first.
pub fn cart_subtotal(cart: &[CartLine]) -> Money {
    cart.iter().map(CartLine::line_total).sum()
}

// =============================================================================
// Discount Rule
// =============================================================================

/// One offer's contribution to a bill, before the bill-level clamp.
///
/// ## Rules
/// ```text
///                    Percentage(p)               FixedAmount(v)
/// apply_to_all       subtotal × p                v
/// scoped             Σ line × p  (matching)      Σ min(v, line)  (matching)
/// ```
/// A `max_discount_amount` caps the result either way.
///
/// Eligibility is not checked here; callers filter first.
pub fn offer_discount(offer: &Offer, cart: &[CartLine], subtotal: Money) -> Money {
    let raw = if offer.apply_to_all {
        match offer.discount {
            Discount::Percentage(pct) => subtotal.percent_of(pct),
            Discount::FixedAmount(value) => value,
        }
    } else {
        cart.iter()
            .filter(|line| offer.applies_to(&line.item))
            .map(|line| {
                let line_total = line.line_total();
                match offer.discount {
                    Discount::Percentage(pct) => line_total.percent_of(pct),
                    Discount::FixedAmount(value) => value.min(line_total),
                }
            })
            .sum()
    };

    let capped = match offer.max_discount_amount {
        Some(cap) => raw.min(cap),
        None => raw,
    };

    capped.max(Money::zero())
}

// =============================================================================
// Preview
// =============================================================================

/// Live billing preview.
///
/// Offers not available at `now` are skipped silently, even when the
/// cashier selected them by id. Contributions (and the quick discount)
/// add up; only the final discount is clamped to the subtotal.
pub fn compute_cart_totals(
    cart: &[CartLine],
    candidate_offers: &[Offer],
    now: NaiveDateTime,
    quick_discount: bool,
) -> CoreResult<CartTotals> {
    validate_cart(cart)?;

    let subtotal = cart_subtotal(cart);

    let mut raw_discount: Money = candidate_offers
        .iter()
        .filter(|offer| offer.is_available_at(now))
        .map(|offer| offer_discount(offer, cart, subtotal))
        .sum();

    if quick_discount {
        raw_discount += subtotal.percent_of(QUICK_DISCOUNT_RATE);
    }

    Ok(CartTotals::clamped(subtotal, raw_discount))
}

// =============================================================================
// Authoritative Totals
// =============================================================================

/// Checks a resolved coupon offer against the bill.
///
/// ## Order of Checks
/// 1. Active and inside its date/time window → else `InvalidCoupon`
/// 2. Redemptions left → else `CouponExhausted`
/// 3. `subtotal ≥ min_order_amount` → else `MinimumOrderNotMet`
pub fn check_coupon(offer: &Offer, subtotal: Money, now: NaiveDateTime) -> CoreResult<()> {
    let code = || offer.coupon_code.clone().unwrap_or_else(|| offer.name.clone());

    if !offer.is_available_at(now) {
        return Err(CoreError::InvalidCoupon(code()));
    }

    if offer.is_exhausted() {
        return Err(CoreError::CouponExhausted(code()));
    }

    if let Some(minimum) = offer.min_order_amount {
        if subtotal < minimum {
            return Err(CoreError::MinimumOrderNotMet { minimum, subtotal });
        }
    }

    Ok(())
}

/// Totals for an order about to be written.
///
/// `cart` must already carry server-resolved prices. At most one coupon
/// offer applies; the quick discount and multi-offer stacking are
/// preview-only. Tax is charged on the discounted subtotal.
pub fn finalize_totals(
    cart: &[CartLine],
    coupon: Option<&Offer>,
    tax_rate: Percent,
    now: NaiveDateTime,
) -> CoreResult<OrderTotals> {
    validate_cart(cart)?;

    let subtotal = cart_subtotal(cart);

    let raw_discount = match coupon {
        Some(offer) => {
            check_coupon(offer, subtotal, now)?;
            offer_discount(offer, cart, subtotal)
        }
        None => Money::zero(),
    };

    let totals = CartTotals::clamped(subtotal, raw_discount);
    let tax = totals.total.calculate_tax(tax_rate);

    Ok(OrderTotals {
        subtotal,
        discount: totals.discount,
        tax,
        final_amount: totals.total + tax,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime, Utc};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap()
    }

    fn product(id: &str, cents: i64, qty: i64) -> CartLine {
        CartLine::new(CatalogItemRef::Product(id.to_string()), Money::from_cents(cents), qty)
    }

    fn combo(id: &str, cents: i64, qty: i64) -> CartLine {
        CartLine::new(CatalogItemRef::Combo(id.to_string()), Money::from_cents(cents), qty)
    }

    fn store_wide(discount: Discount) -> Offer {
        Offer {
            id: "offer".to_string(),
            name: "Offer".to_string(),
            description: None,
            discount,
            apply_to_all: true,
            scope: vec![],
            start_date: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 10, 31).unwrap(),
            start_time: None,
            end_time: None,
            is_active: true,
            coupon_code: None,
            usage_limit: None,
            usage_count: 0,
            min_order_amount: None,
            max_discount_amount: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn scoped(discount: Discount, scope: Vec<CatalogItemRef>) -> Offer {
        Offer {
            apply_to_all: false,
            scope,
            ..store_wide(discount)
        }
    }

    fn pct(bps: u32) -> Discount {
        Discount::Percentage(Percent::from_bps(bps))
    }

    fn fixed(cents: i64) -> Discount {
        Discount::FixedAmount(Money::from_cents(cents))
    }

    // -------------------------------------------------------------------------
    // Cart validation
    // -------------------------------------------------------------------------

    #[test]
    fn test_empty_cart_rejected() {
        let err = compute_cart_totals(&[], &[], now(), false).unwrap_err();
        assert!(matches!(err, CoreError::InvalidCart { .. }));
    }

    #[test]
    fn test_bad_lines_rejected() {
        for cart in [
            vec![product("a", 100, 0)],
            vec![product("a", 100, -2)],
            vec![product("a", -1, 1)],
            vec![product("a", 100, MAX_ITEM_QUANTITY + 1)],
        ] {
            let err = compute_cart_totals(&cart, &[], now(), false).unwrap_err();
            assert!(matches!(err, CoreError::InvalidCart { .. }), "{:?}", cart);
        }
    }

    #[test]
    fn test_oversized_prices_rejected_not_overflowed() {
        let cart = vec![product("gold", i64::MAX / 2, 3)];
        let err = compute_cart_totals(&cart, &[], now(), false).unwrap_err();
        assert!(matches!(err, CoreError::InvalidCart { .. }));

        let cart = vec![product("gold", MAX_PRICE.cents() + 1, 1)];
        let err = finalize_totals(&cart, None, Percent::from_bps(1800), now()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidCart { .. }));
    }

    #[test]
    fn test_largest_cart_still_prices() {
        let cart: Vec<CartLine> = (0..MAX_CART_ITEMS)
            .map(|i| product(&format!("p{}", i), MAX_PRICE.cents(), MAX_ITEM_QUANTITY))
            .collect();
        let totals = finalize_totals(&cart, None, Percent::HUNDRED, now()).unwrap();
        let expected = MAX_PRICE.cents() * MAX_ITEM_QUANTITY * MAX_CART_ITEMS as i64;
        assert_eq!(totals.subtotal.cents(), expected);
        assert_eq!(totals.final_amount.cents(), expected * 2);
    }

    #[test]
    fn test_zero_price_line_allowed() {
        let totals = compute_cart_totals(&[product("water", 0, 1)], &[], now(), false).unwrap();
        assert_eq!(totals.total, Money::zero());
    }

    // -------------------------------------------------------------------------
    // Subtotal
    // -------------------------------------------------------------------------

    #[test]
    fn test_subtotal_exact() {
        let cart = vec![product("latte", 4500, 2), product("sandwich", 5000, 1)];
        let totals = compute_cart_totals(&cart, &[], now(), false).unwrap();
        assert_eq!(totals.subtotal.cents(), 14000);
        assert_eq!(totals.discount, Money::zero());
        assert_eq!(totals.total.cents(), 14000);
    }

    #[test]
    fn test_subtotal_no_drift_on_awkward_prices() {
        // 0.10 + 0.20 style amounts that drift as floats
        let cart = vec![product("a", 10, 3), product("b", 20, 7), product("c", 4510, 1)];
        assert_eq!(cart_subtotal(&cart).cents(), 30 + 140 + 4510);
    }

    // -------------------------------------------------------------------------
    // Discount rule
    // -------------------------------------------------------------------------

    #[test]
    fn test_store_wide_percentage() {
        let cart = vec![product("latte", 4500, 2), product("sandwich", 5000, 1)];
        let totals = compute_cart_totals(&cart, &[store_wide(pct(1500))], now(), false).unwrap();
        assert_eq!(totals.discount.cents(), 2100);
        assert_eq!(totals.total.cents(), 11900);
    }

    #[test]
    fn test_store_wide_fixed_capped_by_max_discount() {
        let cart = vec![product("latte", 4500, 2)];
        let mut offer = store_wide(fixed(5000));
        offer.max_discount_amount = Some(Money::from_cents(3000));
        let totals = compute_cart_totals(&cart, &[offer], now(), false).unwrap();
        assert_eq!(totals.discount.cents(), 3000);
    }

    #[test]
    fn test_store_wide_percentage_capped_by_max_discount() {
        let cart = vec![product("latte", 10000, 1)];
        let mut offer = store_wide(pct(5000));
        offer.max_discount_amount = Some(Money::from_cents(2000));
        assert_eq!(offer_discount(&offer, &cart, cart_subtotal(&cart)).cents(), 2000);
    }

    #[test]
    fn test_scoped_percentage_only_matching_lines() {
        let cart = vec![product("latte", 4500, 2), combo("brunch", 5000, 1)];
        let offer = scoped(pct(1000), vec![CatalogItemRef::Combo("brunch".to_string())]);
        let totals = compute_cart_totals(&cart, &[offer], now(), false).unwrap();
        assert_eq!(totals.discount.cents(), 500);
    }

    #[test]
    fn test_scoped_type_must_match_not_just_id() {
        // Same id string, different table
        let cart = vec![product("x1", 4500, 1)];
        let offer = scoped(pct(5000), vec![CatalogItemRef::Combo("x1".to_string())]);
        let totals = compute_cart_totals(&cart, &[offer], now(), false).unwrap();
        assert_eq!(totals.discount, Money::zero());
    }

    #[test]
    fn test_scoped_fixed_never_exceeds_line_total() {
        let cart = vec![product("cookie", 3000, 1), product("latte", 4500, 1)];
        let offer = scoped(fixed(5000), vec![CatalogItemRef::Product("cookie".to_string())]);
        let totals = compute_cart_totals(&cart, &[offer], now(), false).unwrap();
        assert_eq!(totals.discount.cents(), 3000);
    }

    #[test]
    fn test_scoped_fixed_applies_per_matching_line() {
        let cart = vec![product("a", 3000, 1), product("b", 800, 1), product("c", 9000, 1)];
        let offer = scoped(
            fixed(1000),
            vec![
                CatalogItemRef::Product("a".to_string()),
                CatalogItemRef::Product("b".to_string()),
            ],
        );
        // min(10, 30) + min(10, 8)
        assert_eq!(offer_discount(&offer, &cart, cart_subtotal(&cart)).cents(), 1800);
    }

    #[test]
    fn test_quick_discount_is_ten_percent() {
        let cart = vec![product("latte", 4500, 2), product("sandwich", 5000, 1)];
        let totals = compute_cart_totals(&cart, &[], now(), true).unwrap();
        assert_eq!(totals.discount.cents(), 1400);
    }

    #[test]
    fn test_quick_discount_stacks_with_offers() {
        let cart = vec![product("latte", 10000, 1)];
        let totals = compute_cart_totals(&cart, &[store_wide(pct(2000))], now(), true).unwrap();
        assert_eq!(totals.discount.cents(), 3000);
        assert_eq!(totals.total.cents(), 7000);
    }

    #[test]
    fn test_discount_clamped_to_subtotal() {
        let cart = vec![product("latte", 10000, 1)];
        let offers = vec![store_wide(pct(6000)), store_wide(pct(6000))];
        let totals = compute_cart_totals(&cart, &offers, now(), false).unwrap();
        assert_eq!(totals.discount.cents(), 10000);
        assert_eq!(totals.total, Money::zero());
    }

    #[test]
    fn test_fixed_larger_than_subtotal_clamped() {
        let cart = vec![product("espresso", 2500, 1)];
        let totals = compute_cart_totals(&cart, &[store_wide(fixed(10000))], now(), false).unwrap();
        assert_eq!(totals.discount.cents(), 2500);
        assert_eq!(totals.total, Money::zero());
    }

    // -------------------------------------------------------------------------
    // Eligibility
    // -------------------------------------------------------------------------

    #[test]
    fn test_expired_offer_contributes_nothing() {
        let cart = vec![product("latte", 10000, 1)];
        let mut offer = store_wide(pct(5000));
        offer.end_date = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let totals = compute_cart_totals(&cart, &[offer], now(), false).unwrap();
        assert_eq!(totals.discount, Money::zero());
    }

    #[test]
    fn test_future_and_inactive_offers_contribute_nothing() {
        let cart = vec![product("latte", 10000, 1)];
        let mut future = store_wide(pct(5000));
        future.start_date = NaiveDate::from_ymd_opt(2026, 10, 20).unwrap();
        let mut inactive = store_wide(pct(5000));
        inactive.is_active = false;
        let totals = compute_cart_totals(&cart, &[future, inactive], now(), false).unwrap();
        assert_eq!(totals.discount, Money::zero());
    }

    #[test]
    fn test_offer_outside_time_window_skipped() {
        let cart = vec![product("latte", 10000, 1)];
        let mut evening = store_wide(pct(5000));
        evening.start_time = NaiveTime::from_hms_opt(17, 0, 0);
        evening.end_time = NaiveTime::from_hms_opt(19, 0, 0);
        let totals = compute_cart_totals(&cart, &[evening.clone()], now(), false).unwrap();
        assert_eq!(totals.discount, Money::zero());

        let at_six = NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(18, 0, 0)
            .unwrap();
        let totals = compute_cart_totals(&cart, &[evening], at_six, false).unwrap();
        assert_eq!(totals.discount.cents(), 5000);
    }

    // -------------------------------------------------------------------------
    // Properties
    // -------------------------------------------------------------------------

    /// Small deterministic generator so the property sweep needs no extra crates.
    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self, bound: u64) -> u64 {
            self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (self.0 >> 33) % bound
        }
    }

    #[test]
    fn test_totals_invariants_hold_across_random_carts() {
        let mut rng = Lcg(42);
        for _ in 0..500 {
            let lines = 1 + rng.next(6) as usize;
            let cart: Vec<CartLine> = (0..lines)
                .map(|i| product(&format!("p{}", i), rng.next(20_000) as i64, 1 + rng.next(5) as i64))
                .collect();

            let mut offers = Vec::new();
            for _ in 0..rng.next(4) {
                let discount = if rng.next(2) == 0 {
                    pct(1 + rng.next(10_000) as u32)
                } else {
                    fixed(rng.next(30_000) as i64)
                };
                let offer = if rng.next(2) == 0 {
                    store_wide(discount)
                } else {
                    scoped(discount, vec![CatalogItemRef::Product(format!("p{}", rng.next(6)))])
                };
                offers.push(offer);
            }
            let quick = rng.next(2) == 0;

            let totals = compute_cart_totals(&cart, &offers, now(), quick).unwrap();
            let expected: i64 = cart.iter().map(|l| l.unit_price.cents() * l.quantity).sum();

            assert_eq!(totals.subtotal.cents(), expected);
            assert!(totals.discount >= Money::zero());
            assert!(totals.discount <= totals.subtotal);
            assert_eq!(totals.total, totals.subtotal - totals.discount);
            assert!(totals.total >= Money::zero());

            // Deterministic
            assert_eq!(totals, compute_cart_totals(&cart, &offers, now(), quick).unwrap());
        }
    }

    // -------------------------------------------------------------------------
    // Authoritative path
    // -------------------------------------------------------------------------

    #[test]
    fn test_finalize_without_coupon_applies_tax_only() {
        let cart = vec![product("latte", 4500, 2), product("sandwich", 5000, 1)];
        let totals = finalize_totals(&cart, None, Percent::from_bps(1800), now()).unwrap();
        assert_eq!(totals.subtotal.cents(), 14000);
        assert_eq!(totals.discount, Money::zero());
        assert_eq!(totals.tax.cents(), 2520);
        assert_eq!(totals.final_amount.cents(), 16520);
    }

    #[test]
    fn test_finalize_taxes_discounted_subtotal() {
        let cart = vec![product("latte", 4500, 2), product("sandwich", 5000, 1)];
        let mut coupon = store_wide(pct(1000));
        coupon.coupon_code = Some("TEN".to_string());
        let totals = finalize_totals(&cart, Some(&coupon), Percent::from_bps(1800), now()).unwrap();
        assert_eq!(totals.discount.cents(), 1400);
        assert_eq!(totals.tax.cents(), 2268);
        assert_eq!(totals.final_amount.cents(), 14868);
        assert_eq!(totals.final_amount, totals.subtotal - totals.discount + totals.tax);
    }

    #[test]
    fn test_finalize_matches_preview_for_same_offer() {
        let cart = vec![product("latte", 4533, 3), combo("brunch", 9999, 1)];
        let coupon = scoped(pct(1250), vec![CatalogItemRef::Product("latte".to_string())]);

        let preview = compute_cart_totals(&cart, &[coupon.clone()], now(), false).unwrap();
        let authoritative = finalize_totals(&cart, Some(&coupon), Percent::zero(), now()).unwrap();

        assert_eq!(preview.subtotal, authoritative.subtotal);
        assert_eq!(preview.discount, authoritative.discount);
        assert_eq!(preview.total, authoritative.final_amount);
    }

    #[test]
    fn test_coupon_outside_window_is_invalid() {
        let cart = vec![product("latte", 4500, 1)];
        let mut coupon = store_wide(pct(1000));
        coupon.coupon_code = Some("OLD".to_string());
        coupon.end_date = NaiveDate::from_ymd_opt(2026, 10, 1).unwrap();
        let err = finalize_totals(&cart, Some(&coupon), Percent::zero(), now()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidCoupon(code) if code == "OLD"));
    }

    #[test]
    fn test_coupon_exhausted() {
        let cart = vec![product("latte", 4500, 1)];
        let mut coupon = store_wide(pct(1000));
        coupon.usage_limit = Some(1);
        coupon.usage_count = 1;
        let err = finalize_totals(&cart, Some(&coupon), Percent::zero(), now()).unwrap_err();
        assert!(matches!(err, CoreError::CouponExhausted(_)));
    }

    #[test]
    fn test_coupon_minimum_order() {
        let cart = vec![product("latte", 4500, 1)];
        let mut coupon = store_wide(pct(1000));
        coupon.min_order_amount = Some(Money::from_cents(50000));
        let err = finalize_totals(&cart, Some(&coupon), Percent::zero(), now()).unwrap_err();
        assert!(matches!(err, CoreError::MinimumOrderNotMet { .. }));

        // Exactly the minimum passes
        coupon.min_order_amount = Some(Money::from_cents(4500));
        assert!(finalize_totals(&cart, Some(&coupon), Percent::zero(), now()).is_ok());
    }
}
