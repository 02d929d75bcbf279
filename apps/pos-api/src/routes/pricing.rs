//! Live billing preview.
//!
//! Same catalog pricing as checkout, but the cashier may stack any
//! currently available offers and the quick discount. Nothing is
//! written.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::response::{ok, ApiResult};
use crate::routes::orders::{to_lines, CartItemBody};
use crate::state::AppState;
use thrive_core::pricing::compute_cart_totals;
use thrive_core::{CartLine, CartTotals, Money, Percent};

#[derive(Debug, Deserialize)]
pub struct PreviewBody {
    pub items: Vec<CartItemBody>,
    #[serde(default)]
    pub offer_ids: Vec<String>,
    #[serde(default)]
    pub quick_discount: bool,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    #[serde(flatten)]
    pub totals: CartTotals,
    /// Selected offers that actually counted at this moment.
    pub applied_offer_ids: Vec<String>,
    pub tax_rate: Percent,
    /// Tax on `total`, for display. Checkout recomputes it.
    pub estimated_tax: Money,
}

pub async fn preview(
    State(state): State<AppState>,
    payload: Result<Json<PreviewBody>, JsonRejection>,
) -> ApiResult<PreviewResponse> {
    let Json(body) = payload?;
    let now = state.settings.local_now(Utc::now());

    let lines = to_lines(&body.items)?;
    let priced = state.db.orders().price_lines(&lines).await?;
    let cart: Vec<CartLine> = priced.into_iter().map(|p| p.line).collect();

    let offers = state.db.offers().get_many(&body.offer_ids).await?;
    let totals = compute_cart_totals(&cart, &offers, now, body.quick_discount)?;

    let applied_offer_ids = offers
        .iter()
        .filter(|offer| offer.is_available_at(now))
        .map(|offer| offer.id.clone())
        .collect();

    ok(PreviewResponse {
        totals,
        applied_offer_ids,
        tax_rate: state.settings.tax_rate,
        estimated_tax: totals.total.calculate_tax(state.settings.tax_rate),
    })
}
