//! Checkout, order history and the kitchen status flow.
//!
//! ```text
//! POST /api/orders
//!   body ──► CheckoutRequest ──► OrderRepository::finalize ──► 201 receipt
//!             (client prices dropped)   (catalog prices, coupon,
//!                                        tax, one transaction)
//!
//! PUT    /api/orders/{id}/status   open orders only, totals untouched
//! DELETE /api/orders/{id}          pending orders only
//! ```

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::error::ApiError;
use crate::response::{created, ok, ApiResult, Created};
use crate::state::AppState;
use thrive_core::{
    CatalogItemRef, Customer, ItemType, Money, Order, OrderItem, OrderStatus, OrderType,
    PaymentMethod, Percent,
};
use thrive_db::{CheckoutLine, CheckoutRequest, OrderDetails, OrderListFilter, OrderSummary};

/// One cart line as the till sends it.
///
/// Exactly one of `product_id` / `combo_id` is set. Any `price` the
/// client includes is ignored (unknown fields are skipped); checkout
/// always prices from the catalog.
#[derive(Debug, Deserialize)]
pub struct CartItemBody {
    pub product_id: Option<String>,
    pub combo_id: Option<String>,
    pub quantity: i64,
}

impl CartItemBody {
    pub fn to_line(&self) -> Result<CheckoutLine, ApiError> {
        let non_blank = |id: &Option<String>| {
            id.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let item = match (non_blank(&self.product_id), non_blank(&self.combo_id)) {
            (Some(id), None) => CatalogItemRef::new(ItemType::Product, id),
            (None, Some(id)) => CatalogItemRef::new(ItemType::Combo, id),
            _ => {
                return Err(ApiError::validation(
                    "Each item needs exactly one of product_id or combo_id",
                ))
            }
        };

        Ok(CheckoutLine::new(item, self.quantity))
    }
}

pub(crate) fn to_lines(items: &[CartItemBody]) -> Result<Vec<CheckoutLine>, ApiError> {
    items.iter().map(CartItemBody::to_line).collect()
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderBody {
    pub items: Vec<CartItemBody>,
    pub payment_method: PaymentMethod,
    pub order_type: Option<OrderType>,
    pub customer_name: Option<String>,
    pub customer_mobile: Option<String>,
    pub notes: Option<String>,
    pub coupon_code: Option<String>,
    /// Omitted for counter sales (completed); `pending` opens a ticket.
    pub status: Option<OrderStatus>,
}

/// What the till prints.
#[derive(Debug, Serialize)]
pub struct OrderReceipt {
    pub order_id: String,
    pub order_number: String,
    pub subtotal: Money,
    pub discount_amount: Money,
    pub tax_amount: Money,
    pub tax_rate: Percent,
    pub final_amount: Money,
    pub coupon_code: Option<String>,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub business_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
    pub customer: Option<Customer>,
}

impl From<OrderDetails> for OrderReceipt {
    fn from(details: OrderDetails) -> Self {
        let order = &details.order;
        OrderReceipt {
            order_id: order.id.clone(),
            order_number: order.order_number.clone(),
            subtotal: order.subtotal(),
            discount_amount: order.discount(),
            tax_amount: order.tax(),
            tax_rate: Percent::from_bps(order.tax_rate_bps),
            final_amount: order.final_amount(),
            coupon_code: order.coupon_code.clone(),
            payment_method: order.payment_method,
            status: order.status,
            business_date: order.business_date,
            created_at: order.created_at,
            items: details.items,
            customer: details.customer,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<OrderStatus>,
    pub order_type: Option<OrderType>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: OrderStatus,
}

const MAX_PAGE: i64 = 200;

impl OrderListQuery {
    fn into_filter(self) -> OrderListFilter {
        let defaults = OrderListFilter::default();
        OrderListFilter {
            start_date: self.start_date,
            end_date: self.end_date,
            status: self.status,
            order_type: self.order_type,
            limit: self.limit.unwrap_or(defaults.limit).clamp(1, MAX_PAGE),
            offset: self.offset.unwrap_or(0).max(0),
        }
    }
}

pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<CreateOrderBody>, JsonRejection>,
) -> Created<OrderReceipt> {
    let Json(body) = payload?;

    let request = CheckoutRequest {
        lines: to_lines(&body.items)?,
        coupon_code: body.coupon_code,
        payment_method: body.payment_method,
        order_type: body.order_type.unwrap_or_default(),
        customer_name: body.customer_name,
        customer_mobile: body.customer_mobile,
        notes: body.notes,
        status: body.status.unwrap_or(OrderStatus::Completed),
    };

    let details = state
        .db
        .orders()
        .finalize(&request, &state.settings, Utc::now())
        .await?;

    info!(
        order_number = %details.order.order_number,
        total = %details.order.final_amount(),
        "Order created"
    );

    created(OrderReceipt::from(details), "Order created")
}

pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<OrderListQuery>, QueryRejection>,
) -> ApiResult<Vec<OrderSummary>> {
    let Query(query) = query?;
    let orders = state.db.orders().list(query.into_filter()).await?;
    ok(orders)
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<OrderDetails> {
    match state.db.orders().get_with_items(&id).await? {
        Some(details) => ok(details),
        None => Err(ApiError::not_found(format!("Order not found: {}", id))),
    }
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<StatusBody>, JsonRejection>,
) -> ApiResult<Order> {
    let Json(body) = payload?;
    let order = state.db.orders().update_status(&id, body.status).await?;
    ok(order)
}

/// Only pending orders; anything further along is cancelled instead.
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let order = state.db.orders().delete_pending(&id).await?;
    ok(json!({ "id": order.id, "order_number": order.order_number }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(product: Option<&str>, combo: Option<&str>) -> CartItemBody {
        CartItemBody {
            product_id: product.map(str::to_string),
            combo_id: combo.map(str::to_string),
            quantity: 1,
        }
    }

    #[test]
    fn test_cart_item_needs_exactly_one_id() {
        assert_eq!(
            item(Some("p1"), None).to_line().unwrap().item,
            CatalogItemRef::new(ItemType::Product, "p1")
        );
        assert_eq!(
            item(None, Some("c1")).to_line().unwrap().item,
            CatalogItemRef::new(ItemType::Combo, "c1")
        );
        assert!(item(Some("p1"), Some("c1")).to_line().is_err());
        assert!(item(None, None).to_line().is_err());
        assert!(item(Some("  "), None).to_line().is_err());
    }

    #[test]
    fn test_client_price_is_ignored() {
        let body: CartItemBody =
            serde_json::from_str(r#"{"product_id":"p1","quantity":2,"price":1}"#).unwrap();
        let line = body.to_line().unwrap();
        assert_eq!(line.quantity, 2);
    }

    #[test]
    fn test_list_query_clamps_paging() {
        let filter = OrderListQuery {
            start_date: None,
            end_date: None,
            status: None,
            order_type: None,
            limit: Some(10_000),
            offset: Some(-5),
        }
        .into_filter();
        assert_eq!(filter.limit, MAX_PAGE);
        assert_eq!(filter.offset, 0);
    }

    #[test]
    fn test_list_query_passes_status_and_type() {
        let query: OrderListQuery =
            serde_json::from_str(r#"{"status":"pending","order_type":"takeaway"}"#).unwrap();
        let filter = query.into_filter();
        assert_eq!(filter.status, Some(OrderStatus::Pending));
        assert_eq!(filter.order_type, Some(OrderType::Takeaway));
        assert_eq!(filter.limit, OrderListFilter::default().limit);
    }
}
