//! Offer administration and the checkout candidate list.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::error::ApiError;
use crate::response::{created, ok, ApiResult, Created};
use crate::routes::{default_true, flag};
use crate::state::AppState;
use thrive_core::drafts::OfferDraft;
use thrive_core::validation::parse_time_of_day;
use thrive_core::{CatalogItemRef, CheckoutOffer, Discount, Money, Offer, Percent};

#[derive(Debug, Deserialize)]
pub struct OfferListQuery {
    pub checkout_offers: Option<String>,
}

/// Create/update body.
///
/// ```json
/// {
///   "name": "Happy Hour",
///   "discount": { "type": "percentage", "value": 1500 },
///   "apply_to_all": false,
///   "applicable_items": [{ "item_type": "product", "item_id": "..." }],
///   "start_date": "2026-10-01", "end_date": "2026-10-31",
///   "start_time": "16:00", "end_time": "19:00",
///   "coupon_code": "HAPPY15", "usage_limit": 100
/// }
/// ```
/// Percent values are basis points, amounts are minor units.
///
/// The older offer form is accepted too: `"discount_percent": 12.5` in
/// place of `discount`, and `"product-<id>"` strings in
/// `applicable_items`.
#[derive(Debug, Deserialize)]
pub struct OfferBody {
    pub name: String,
    pub description: Option<String>,
    pub discount: Option<Discount>,
    pub discount_percent: Option<f64>,
    #[serde(default)]
    pub apply_to_all: bool,
    #[serde(default)]
    pub applicable_items: Vec<ScopeEntry>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub coupon_code: Option<String>,
    pub usage_limit: Option<i64>,
    pub min_order_amount: Option<Money>,
    pub max_discount_amount: Option<Money>,
}

/// One `applicable_items` entry in either accepted form.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ScopeEntry {
    Ref(CatalogItemRef),
    Tagged(String),
}

impl ScopeEntry {
    fn into_ref(self) -> Result<CatalogItemRef, ApiError> {
        match self {
            ScopeEntry::Ref(item) => Ok(item),
            ScopeEntry::Tagged(value) => Ok(CatalogItemRef::parse_tagged(&value)?),
        }
    }
}

fn parse_time(field: &str, value: Option<&str>) -> Result<Option<NaiveTime>, ApiError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(Some(parse_time_of_day(field, v)?)),
        _ => Ok(None),
    }
}

impl OfferBody {
    fn into_draft(self) -> Result<OfferDraft, ApiError> {
        let discount = match (self.discount, self.discount_percent) {
            (Some(discount), _) => discount,
            (None, Some(pct)) => Discount::Percentage(Percent::from_percentage(pct)),
            (None, None) => return Err(ApiError::validation("discount is required")),
        };
        let scope = self
            .applicable_items
            .into_iter()
            .map(ScopeEntry::into_ref)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(OfferDraft {
            start_time: parse_time("start_time", self.start_time.as_deref())?,
            end_time: parse_time("end_time", self.end_time.as_deref())?,
            name: self.name,
            description: self.description,
            discount,
            apply_to_all: self.apply_to_all,
            scope,
            start_date: self.start_date,
            end_date: self.end_date,
            is_active: self.is_active,
            coupon_code: self.coupon_code,
            usage_limit: self.usage_limit,
            min_order_amount: self.min_order_amount,
            max_discount_amount: self.max_discount_amount,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ActiveBody {
    pub is_active: bool,
}

/// `GET /api/offers` payload: full offers for administration, or the
/// picker rows when `checkout_offers=1`.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum OfferList {
    All(Vec<Offer>),
    Checkout(Vec<CheckoutOffer>),
}

/// All offers, or with `checkout_offers=1` only those usable right now
/// (the preview's candidate set).
pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<OfferListQuery>, QueryRejection>,
) -> ApiResult<OfferList> {
    let Query(query) = query?;

    if flag(query.checkout_offers.as_deref()) {
        let now = state.settings.local_now(Utc::now());
        let offers = state.db.offers().checkout_offers(now).await?;
        return ok(OfferList::Checkout(
            offers.iter().map(CheckoutOffer::from).collect(),
        ));
    }

    ok(OfferList::All(state.db.offers().list().await?))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Offer> {
    match state.db.offers().get_by_id(&id).await? {
        Some(offer) => ok(offer),
        None => Err(ApiError::not_found(format!("Offer not found: {}", id))),
    }
}

pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<OfferBody>, JsonRejection>,
) -> Created<Offer> {
    let Json(body) = payload?;
    let offer = state.db.offers().create(&body.into_draft()?).await?;
    info!(id = %offer.id, coupon = ?offer.coupon_code, "Offer created");
    created(offer, "Offer created")
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<OfferBody>, JsonRejection>,
) -> ApiResult<Offer> {
    let Json(body) = payload?;
    let offer = state.db.offers().update(&id, &body.into_draft()?).await?;
    ok(offer)
}

pub async fn set_active(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ActiveBody>, JsonRejection>,
) -> ApiResult<Offer> {
    let Json(body) = payload?;
    state.db.offers().set_active(&id, body.is_active).await?;

    match state.db.offers().get_by_id(&id).await? {
        Some(offer) => ok(offer),
        None => Err(ApiError::not_found(format!("Offer not found: {}", id))),
    }
}

/// Hard delete; the offer's scope rows go with it.
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    state.db.offers().delete(&id).await?;
    info!(id = %id, "Offer deleted");
    ok(json!({ "id": id }))
}
