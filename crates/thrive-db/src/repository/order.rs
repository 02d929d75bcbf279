//! # Order Repository
//!
//! Checkout (order finalization) and order reads.
//!
//! ## Finalization
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       finalize(request, settings, now)                  │
//! │                                                                         │
//! │  READ PHASE (no writes, any failure → Rejected, nothing persisted)     │
//! │    1. cart shape (non-empty, quantities)                               │
//! │    2. resolve every line's price from the catalog (client price        │
//! │       never reaches this layer) → CatalogItemUnavailable               │
//! │    3. coupon lookup → InvalidCoupon / CouponExhausted /                │
//! │       MinimumOrderNotMet                                               │
//! │    4. finalize_totals(): discount, tax on (subtotal − discount)        │
//! │                                                                         │
//! │  WRITE PHASE (one transaction)                                         │
//! │    5. claim coupon:  UPDATE offers SET usage_count = usage_count + 1   │
//! │                      WHERE id = ? AND (usage_limit IS NULL             │
//! │                                        OR usage_count < usage_limit)   │
//! │       0 rows → CouponExhausted, rollback                               │
//! │    6. upsert customer by mobile                                        │
//! │    7. insert order; UNIQUE(order_number) clash → new number, retry     │
//! │    8. insert order_items (name + making cost snapshots)                │
//! │    9. COMMIT                                                           │
//! │                                                                         │
//! │  Any storage error → rollback, logged, OrderCreationFailed             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The first statement of the transaction is a write, so SQLite takes
//! the write lock up front and `busy_timeout` queues concurrent tills.
//!
//! ## Order Lifecycle
//! ```text
//! checkout ──► completed                      (counter sale, the default)
//!          └─► pending ──► preparing ──► ready ──► completed
//!                 │            │           │
//!                 └────────────┴───────────┴─────► cancelled
//!
//! completed / cancelled: closed, status never changes again
//! pending:               the only status that may be deleted
//! ```
//! Status is the only mutable column. Totals and items are fixed at
//! checkout. Cancelling or deleting an order hands its coupon
//! redemption back.

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{CheckoutError, DbError, DbResult};
use crate::repository::customer::CustomerRepository;
use crate::repository::offer::OfferRepository;
use crate::repository::settings::CheckoutSettings;
use thrive_core::pricing::finalize_totals;
use thrive_core::validation::validate_mobile;
use thrive_core::{
    CartLine, CatalogItemRef, CoreError, Customer, Money, Order, OrderItem, OrderStatus,
    OrderType, PaymentMethod, ValidationError, MAX_CART_ITEMS, MAX_ITEM_QUANTITY,
};

const ORDER_COLUMNS: &str = "o.id, o.order_number, o.customer_id, o.order_type, o.status, \
     o.payment_method, o.subtotal_cents, o.discount_cents, o.tax_cents, o.final_amount_cents, \
     o.tax_rate_bps, o.applied_offer_id, o.coupon_code, o.notes, o.business_date, o.created_at";

const ORDER_ITEM_COLUMNS: &str = "id, order_id, item_type, item_id, name_snapshot, \
     unit_price_cents, making_cost_cents, quantity, line_total_cents";

const MAX_NOTES_LEN: usize = 500;

// =============================================================================
// Request / Response Types
// =============================================================================

/// One line of a checkout request. Carries no price on purpose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutLine {
    pub item: CatalogItemRef,
    pub quantity: i64,
}

impl CheckoutLine {
    pub fn new(item: CatalogItemRef, quantity: i64) -> Self {
        CheckoutLine { item, quantity }
    }
}

/// Everything the till sends to close a bill.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub lines: Vec<CheckoutLine>,
    pub coupon_code: Option<String>,
    pub payment_method: PaymentMethod,
    pub order_type: OrderType,
    pub customer_name: Option<String>,
    pub customer_mobile: Option<String>,
    pub notes: Option<String>,
    /// `Completed` for counter sales, `Pending` (or later) for kitchen
    /// tickets. Never `Cancelled`.
    pub status: OrderStatus,
}

impl CheckoutRequest {
    /// A completed walk-in order with no coupon or customer.
    pub fn new(lines: Vec<CheckoutLine>, payment_method: PaymentMethod) -> Self {
        CheckoutRequest {
            lines,
            coupon_code: None,
            payment_method,
            order_type: OrderType::default(),
            customer_name: None,
            customer_mobile: None,
            notes: None,
            status: OrderStatus::Completed,
        }
    }
}

/// A catalog-priced cart line plus the snapshots stored on the order item.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub line: CartLine,
    pub name: String,
    pub making_cost: Money,
}

/// An order with its items and customer.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub customer: Option<Customer>,
}

/// A row of the order list.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub order: Order,
    pub customer_name: Option<String>,
    pub customer_mobile: Option<String>,
    pub item_count: i64,
}

/// Paging, business-date, status and order-type bounds for
/// [`OrderRepository::list`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderListFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<OrderStatus>,
    pub order_type: Option<OrderType>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for OrderListFilter {
    fn default() -> Self {
        OrderListFilter {
            start_date: None,
            end_date: None,
            status: None,
            order_type: None,
            limit: 50,
            offset: 0,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CatalogPrice {
    name: String,
    price_cents: i64,
    making_cost_cents: i64,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for orders.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Prices lines from the current catalog.
    ///
    /// Missing and inactive items fail with `CatalogItemUnavailable`.
    /// Shared by checkout and the pricing preview so both see the same
    /// prices.
    pub async fn price_lines(&self, lines: &[CheckoutLine]) -> Result<Vec<PricedLine>, CheckoutError> {
        check_cart_shape(lines)?;

        let mut priced = Vec::with_capacity(lines.len());

        for line in lines {
            let sql = match &line.item {
                CatalogItemRef::Product(_) => {
                    "SELECT name, price_cents, making_cost_cents FROM products \
                     WHERE id = ?1 AND is_active = 1"
                }
                CatalogItemRef::Combo(_) => {
                    "SELECT name, price_cents, making_cost_cents FROM combos \
                     WHERE id = ?1 AND is_active = 1"
                }
            };

            let row = sqlx::query_as::<_, CatalogPrice>(sql)
                .bind(line.item.id())
                .fetch_optional(&self.pool)
                .await?;

            let Some(row) = row else {
                debug!(item = %line.item, "Catalog item unavailable");
                return Err(CoreError::CatalogItemUnavailable(line.item.clone()).into());
            };

            priced.push(PricedLine {
                line: CartLine::new(
                    line.item.clone(),
                    Money::from_cents(row.price_cents),
                    line.quantity,
                ),
                name: row.name,
                making_cost: Money::from_cents(row.making_cost_cents),
            });
        }

        Ok(priced)
    }

    /// Finalizes a bill into a completed order.
    ///
    /// `now` is the UTC instant of the sale; offer windows and the
    /// business date use `settings.utc_offset`.
    pub async fn finalize(
        &self,
        request: &CheckoutRequest,
        settings: &CheckoutSettings,
        now: DateTime<Utc>,
    ) -> Result<OrderDetails, CheckoutError> {
        let business_date = settings.local_now(now).date();
        let prefix = settings.order_prefix.clone();

        self.finalize_with(request, settings, now, move || {
            generate_order_number(&prefix, business_date)
        })
        .await
    }

    async fn finalize_with<F>(
        &self,
        request: &CheckoutRequest,
        settings: &CheckoutSettings,
        now: DateTime<Utc>,
        mut next_order_number: F,
    ) -> Result<OrderDetails, CheckoutError>
    where
        F: FnMut() -> String + Send,
    {
        let local_now = settings.local_now(now);

        // ---------------------------------------------------------------------
        // Read phase
        // ---------------------------------------------------------------------

        if request.status == OrderStatus::Cancelled {
            return Err(CoreError::from(ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: OrderStatus::ALL
                    .iter()
                    .filter(|s| **s != OrderStatus::Cancelled)
                    .map(|s| s.as_str().to_string())
                    .collect(),
            })
            .into());
        }

        let priced = self.price_lines(&request.lines).await?;
        let cart: Vec<CartLine> = priced.iter().map(|p| p.line.clone()).collect();

        let mobile = match request.customer_mobile.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(validate_mobile(raw).map_err(CoreError::from)?),
            _ => None,
        };

        let notes = request
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(|n| n.chars().take(MAX_NOTES_LEN).collect::<String>());

        let coupon = match request.coupon_code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => {
                let offer = OfferRepository::new(self.pool.clone())
                    .find_by_coupon_code(code)
                    .await?;
                match offer {
                    Some(offer) => Some(offer),
                    None => {
                        debug!(code = %code, "Unknown coupon code");
                        return Err(CoreError::InvalidCoupon(code.to_ascii_uppercase()).into());
                    }
                }
            }
            _ => None,
        };

        let totals = finalize_totals(&cart, coupon.as_ref(), settings.tax_rate, local_now)?;

        // ---------------------------------------------------------------------
        // Write phase
        // ---------------------------------------------------------------------

        let mut tx = self.pool.begin().await?;

        if let Some(offer) = &coupon {
            let claimed = sqlx::query(
                r#"
                UPDATE offers SET usage_count = usage_count + 1, updated_at = ?2
                WHERE id = ?1 AND (usage_limit IS NULL OR usage_count < usage_limit)
                "#,
            )
            .bind(&offer.id)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            if claimed.rows_affected() == 0 {
                let code = offer.coupon_code.clone().unwrap_or_else(|| offer.name.clone());
                warn!(offer_id = %offer.id, code = %code, "Coupon used up by a concurrent order");
                return Err(CoreError::CouponExhausted(code).into());
            }
        }

        let customer = match &mobile {
            Some(mobile) => Some(
                CustomerRepository::upsert_by_mobile(&mut tx, request.customer_name.as_deref(), mobile)
                    .await?,
            ),
            None => None,
        };

        let attempts = settings.order_number_attempts.max(1);
        let mut order = Order {
            id: Uuid::new_v4().to_string(),
            order_number: String::new(),
            customer_id: customer.as_ref().map(|c| c.id.clone()),
            order_type: request.order_type,
            status: request.status,
            payment_method: request.payment_method,
            subtotal_cents: totals.subtotal.cents(),
            discount_cents: totals.discount.cents(),
            tax_cents: totals.tax.cents(),
            final_amount_cents: totals.final_amount.cents(),
            tax_rate_bps: settings.tax_rate.bps(),
            applied_offer_id: coupon.as_ref().map(|o| o.id.clone()),
            coupon_code: coupon.as_ref().and_then(|o| o.coupon_code.clone()),
            notes,
            business_date: local_now.date(),
            created_at: now,
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            order.order_number = next_order_number();

            match insert_order(&mut tx, &order).await {
                Ok(()) => break,
                Err(err) if err.is_unique_violation_on("orders.order_number") => {
                    warn!(
                        order_number = %order.order_number,
                        attempt,
                        "Order number already taken"
                    );
                    if attempt >= attempts {
                        return Err(CheckoutError::OrderNumberCollision { attempts });
                    }
                }
                Err(err) => return Err(err.into()),
            }
        }

        let mut items = Vec::with_capacity(priced.len());
        for priced_line in &priced {
            let item = OrderItem {
                id: Uuid::new_v4().to_string(),
                order_id: order.id.clone(),
                item_type: priced_line.line.item.item_type(),
                item_id: priced_line.line.item.id().to_string(),
                name_snapshot: priced_line.name.clone(),
                unit_price_cents: priced_line.line.unit_price.cents(),
                making_cost_cents: priced_line.making_cost.cents(),
                quantity: priced_line.line.quantity,
                line_total_cents: priced_line.line.line_total().cents(),
            };
            insert_item(&mut tx, &item).await?;
            items.push(item);
        }

        tx.commit().await?;

        info!(
            order_number = %order.order_number,
            subtotal = %totals.subtotal,
            discount = %totals.discount,
            tax = %totals.tax,
            final_amount = %totals.final_amount,
            coupon = ?order.coupon_code,
            status = %order.status,
            "Order finalized"
        );

        Ok(OrderDetails {
            order,
            items,
            customer,
        })
    }

    /// Orders newest first, optionally bounded by business date and
    /// narrowed to one status or order type.
    pub async fn list(&self, filter: OrderListFilter) -> DbResult<Vec<OrderSummary>> {
        let sql = format!(
            r#"
            SELECT {ORDER_COLUMNS},
                c.name AS customer_name,
                c.mobile AS customer_mobile,
                (SELECT COALESCE(SUM(quantity), 0) FROM order_items oi WHERE oi.order_id = o.id)
                    AS item_count
            FROM orders o
            LEFT JOIN customers c ON c.id = o.customer_id
            WHERE (?1 IS NULL OR o.business_date >= ?1)
              AND (?2 IS NULL OR o.business_date <= ?2)
              AND (?3 IS NULL OR o.status = ?3)
              AND (?4 IS NULL OR o.order_type = ?4)
            ORDER BY o.created_at DESC
            LIMIT ?5 OFFSET ?6
            "#
        );

        let orders = sqlx::query_as::<_, OrderSummary>(&sql)
            .bind(filter.start_date)
            .bind(filter.end_date)
            .bind(filter.status)
            .bind(filter.order_type)
            .bind(filter.limit.clamp(1, 500))
            .bind(filter.offset.max(0))
            .fetch_all(&self.pool)
            .await?;

        Ok(orders)
    }

    /// An order row without items.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders o WHERE o.id = ?1");
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(order)
    }

    /// An order with its items and customer.
    pub async fn get_with_items(&self, id: &str) -> DbResult<Option<OrderDetails>> {
        let Some(order) = self.get_by_id(id).await? else {
            return Ok(None);
        };

        let item_sql = format!(
            "SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE order_id = ?1 ORDER BY rowid"
        );
        let items = sqlx::query_as::<_, OrderItem>(&item_sql)
            .bind(id)
            .fetch_all(&self.pool)
            .await?;

        let customer = match &order.customer_id {
            Some(customer_id) => {
                CustomerRepository::new(self.pool.clone())
                    .get_by_id(customer_id)
                    .await?
            }
            None => None,
        };

        Ok(Some(OrderDetails {
            order,
            items,
            customer,
        }))
    }

    /// Moves an open order to `status`.
    ///
    /// ## Errors
    /// - `NotFound` for an unknown id
    /// - `Rejected(OrderLocked)` when the order is already completed or
    ///   cancelled
    pub async fn update_status(&self, id: &str, status: OrderStatus) -> DbResult<Order> {
        let mut tx = self.pool.begin().await?;

        let moved = sqlx::query(
            "UPDATE orders SET status = ?2 \
             WHERE id = ?1 AND status NOT IN ('completed', 'cancelled')",
        )
        .bind(id)
        .bind(status)
        .execute(&mut *tx)
        .await?;

        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders o WHERE o.id = ?1");
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("Order", id))?;

        if moved.rows_affected() == 0 {
            debug!(order_number = %order.order_number, status = %order.status, "Order is closed");
            return Err(CoreError::OrderLocked {
                order_number: order.order_number,
                status: order.status,
                action: "update",
            }
            .into());
        }

        if status == OrderStatus::Cancelled {
            release_coupon(&mut tx, order.applied_offer_id.as_deref()).await?;
        }

        tx.commit().await?;

        info!(order_number = %order.order_number, status = %status, "Order status updated");
        Ok(order)
    }

    /// Deletes a pending order and its items.
    ///
    /// ## Errors
    /// - `NotFound` for an unknown id
    /// - `Rejected(OrderLocked)` for any status other than pending
    pub async fn delete_pending(&self, id: &str) -> DbResult<Order> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders o WHERE o.id = ?1");
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("Order", id))?;

        if order.status != OrderStatus::Pending {
            return Err(CoreError::OrderLocked {
                order_number: order.order_number,
                status: order.status,
                action: "delete",
            }
            .into());
        }

        sqlx::query("DELETE FROM order_items WHERE order_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM orders WHERE id = ?1 AND status = 'pending'")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        release_coupon(&mut tx, order.applied_offer_id.as_deref()).await?;

        tx.commit().await?;

        info!(order_number = %order.order_number, "Pending order deleted");
        Ok(order)
    }
}

/// Gives back the redemption a cancelled or deleted order claimed.
async fn release_coupon(conn: &mut SqliteConnection, offer_id: Option<&str>) -> DbResult<()> {
    if let Some(offer_id) = offer_id {
        sqlx::query("UPDATE offers SET usage_count = MAX(usage_count - 1, 0) WHERE id = ?1")
            .bind(offer_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

fn check_cart_shape(lines: &[CheckoutLine]) -> Result<(), CoreError> {
    if lines.is_empty() {
        return Err(CoreError::invalid_cart("Cart is empty"));
    }
    if lines.len() > MAX_CART_ITEMS {
        return Err(CoreError::invalid_cart(format!(
            "Cart has more than {} lines",
            MAX_CART_ITEMS
        )));
    }
    for line in lines {
        if line.quantity < 1 || line.quantity > MAX_ITEM_QUANTITY {
            return Err(CoreError::invalid_cart(format!(
                "Quantity for {} must be between 1 and {}",
                line.item, MAX_ITEM_QUANTITY
            )));
        }
    }
    Ok(())
}

async fn insert_order(conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO orders (
            id, order_number, customer_id, order_type, status, payment_method,
            subtotal_cents, discount_cents, tax_cents, final_amount_cents, tax_rate_bps,
            applied_offer_id, coupon_code, notes, business_date, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
        "#,
    )
    .bind(&order.id)
    .bind(&order.order_number)
    .bind(&order.customer_id)
    .bind(order.order_type)
    .bind(order.status)
    .bind(order.payment_method)
    .bind(order.subtotal_cents)
    .bind(order.discount_cents)
    .bind(order.tax_cents)
    .bind(order.final_amount_cents)
    .bind(order.tax_rate_bps)
    .bind(&order.applied_offer_id)
    .bind(&order.coupon_code)
    .bind(&order.notes)
    .bind(order.business_date)
    .bind(order.created_at)
    .execute(&mut *conn)
    .await
    .map_err(DbError::from)?;

    Ok(())
}

async fn insert_item(conn: &mut SqliteConnection, item: &OrderItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO order_items (
            id, order_id, item_type, item_id, name_snapshot,
            unit_price_cents, making_cost_cents, quantity, line_total_cents
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&item.id)
    .bind(&item.order_id)
    .bind(item.item_type)
    .bind(&item.item_id)
    .bind(&item.name_snapshot)
    .bind(item.unit_price_cents)
    .bind(item.making_cost_cents)
    .bind(item.quantity)
    .bind(item.line_total_cents)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Order number: `prefix + yyMMdd + 4 random digits`.
///
/// ## Example
/// `TC2610190042`
pub fn generate_order_number(prefix: &str, business_date: NaiveDate) -> String {
    let seq: u16 = rand::thread_rng().gen_range(1..=9999);
    format!("{}{}{:04}", prefix, business_date.format("%y%m%d"), seq)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{combo_draft, offer_draft, product_draft, test_db};
    use crate::Database;
    use chrono::TimeZone;
    use thrive_core::pricing::compute_cart_totals;
    use thrive_core::{Offer, Percent, Product};

    /// 08:30 UTC = 14:00 IST on 2026-10-19.
    fn sale_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).unwrap()
    }

    async fn menu(db: &Database) -> (Product, Product) {
        let sandwich = db
            .products()
            .create(&product_draft("Sandwich", 4500, 1500))
            .await
            .unwrap();
        let shake = db
            .products()
            .create(&product_draft("Shake", 5000, 2000))
            .await
            .unwrap();
        (sandwich, shake)
    }

    fn bill(sandwich: &Product, shake: &Product) -> Vec<CheckoutLine> {
        vec![
            CheckoutLine::new(sandwich.item_ref(), 2),
            CheckoutLine::new(shake.item_ref(), 1),
        ]
    }

    async fn coupon(db: &Database, code: &str, limit: Option<i64>) -> Offer {
        let mut draft = offer_draft("Coupon", 1000);
        draft.coupon_code = Some(code.to_string());
        draft.usage_limit = limit;
        db.offers().create(&draft).await.unwrap()
    }

    async fn usage_count(db: &Database, offer_id: &str) -> i64 {
        db.offers().get_by_id(offer_id).await.unwrap().unwrap().usage_count
    }

    async fn order_count(db: &Database) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[test]
    fn test_order_number_format() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let number = generate_order_number("TC", date);
        assert_eq!(number.len(), 2 + 6 + 4);
        assert!(number.starts_with("TC261019"));
        let seq: u16 = number[8..].parse().unwrap();
        assert!((1..=9999).contains(&seq));
    }

    #[tokio::test]
    async fn test_finalize_with_coupon() {
        let db = test_db().await;
        let (sandwich, shake) = menu(&db).await;
        let offer = coupon(&db, "TEN", None).await;

        let mut request = CheckoutRequest::new(bill(&sandwich, &shake), PaymentMethod::Upi);
        request.coupon_code = Some("ten".to_string());

        let details = db
            .orders()
            .finalize(&request, &CheckoutSettings::default(), sale_time())
            .await
            .unwrap();

        let order = &details.order;
        assert_eq!(order.subtotal(), Money::from_cents(14000));
        assert_eq!(order.discount(), Money::from_cents(1400));
        assert_eq!(order.tax(), Money::from_cents(2268));
        assert_eq!(order.final_amount(), Money::from_cents(14868));
        assert_eq!(order.status, OrderStatus::Completed);
        assert_eq!(order.applied_offer_id.as_deref(), Some(offer.id.as_str()));
        assert_eq!(order.coupon_code.as_deref(), Some("TEN"));
        assert_eq!(order.business_date, NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
        assert!(order.order_number.starts_with("TC261019"));

        assert_eq!(details.items.len(), 2);
        assert_eq!(details.items[0].name_snapshot, "Sandwich");
        assert_eq!(details.items[0].line_total_cents, 9000);
        assert_eq!(details.items[0].profit(), Money::from_cents(6000));

        let offer = db.offers().get_by_id(&offer.id).await.unwrap().unwrap();
        assert_eq!(offer.usage_count, 1);

        let fetched = db.orders().get_with_items(&order.id).await.unwrap().unwrap();
        assert_eq!(fetched.items.len(), 2);
        assert_eq!(fetched.order.final_amount_cents, 14868);
    }

    #[tokio::test]
    async fn test_prices_come_from_catalog() {
        let db = test_db().await;
        let (sandwich, shake) = menu(&db).await;

        let mut raised = product_draft("Sandwich", 6000, 1500);
        raised.sku = Some(sandwich.sku.clone());
        db.products().update(&sandwich.id, &raised).await.unwrap();

        let request = CheckoutRequest::new(bill(&sandwich, &shake), PaymentMethod::Cash);
        let details = db
            .orders()
            .finalize(&request, &CheckoutSettings::default(), sale_time())
            .await
            .unwrap();

        assert_eq!(details.order.subtotal_cents, 6000 * 2 + 5000);
    }

    #[tokio::test]
    async fn test_unavailable_item_writes_nothing() {
        let db = test_db().await;
        let (sandwich, shake) = menu(&db).await;
        db.products().soft_delete(&shake.id).await.unwrap();

        let request = CheckoutRequest::new(bill(&sandwich, &shake), PaymentMethod::Cash);
        let err = db
            .orders()
            .finalize(&request, &CheckoutSettings::default(), sale_time())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::Rejected(CoreError::CatalogItemUnavailable(CatalogItemRef::Product(ref id)))
                if *id == shake.id
        ));
        assert_eq!(order_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_invalid_cart_rejected_before_lookup() {
        let db = test_db().await;
        let request = CheckoutRequest::new(vec![], PaymentMethod::Cash);
        let err = db
            .orders()
            .finalize(&request, &CheckoutSettings::default(), sale_time())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Rejected(CoreError::InvalidCart { .. })));

        let request = CheckoutRequest::new(
            vec![CheckoutLine::new(CatalogItemRef::Product("ghost".to_string()), 0)],
            PaymentMethod::Cash,
        );
        let err = db
            .orders()
            .finalize(&request, &CheckoutSettings::default(), sale_time())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Rejected(CoreError::InvalidCart { .. })));
    }

    #[tokio::test]
    async fn test_unknown_and_expired_coupons() {
        let db = test_db().await;
        let (sandwich, shake) = menu(&db).await;

        let mut request = CheckoutRequest::new(bill(&sandwich, &shake), PaymentMethod::Cash);
        request.coupon_code = Some("nope".to_string());
        let err = db
            .orders()
            .finalize(&request, &CheckoutSettings::default(), sale_time())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Rejected(CoreError::InvalidCoupon(ref c)) if c == "NOPE"));

        let mut expired = offer_draft("Old", 1000);
        expired.coupon_code = Some("OLD".to_string());
        expired.start_date = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();
        expired.end_date = NaiveDate::from_ymd_opt(2026, 9, 30).unwrap();
        db.offers().create(&expired).await.unwrap();

        request.coupon_code = Some("OLD".to_string());
        let err = db
            .orders()
            .finalize(&request, &CheckoutSettings::default(), sale_time())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Rejected(CoreError::InvalidCoupon(_))));
        assert_eq!(order_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_minimum_order_not_met() {
        let db = test_db().await;
        let (sandwich, shake) = menu(&db).await;

        let mut draft = offer_draft("Big Spender", 1000);
        draft.coupon_code = Some("BIG".to_string());
        draft.min_order_amount = Some(Money::from_cents(50000));
        let offer = db.offers().create(&draft).await.unwrap();

        let mut request = CheckoutRequest::new(bill(&sandwich, &shake), PaymentMethod::Card);
        request.coupon_code = Some("BIG".to_string());
        let err = db
            .orders()
            .finalize(&request, &CheckoutSettings::default(), sale_time())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::Rejected(CoreError::MinimumOrderNotMet { minimum, subtotal })
                if minimum == Money::from_cents(50000) && subtotal == Money::from_cents(14000)
        ));
        let offer = db.offers().get_by_id(&offer.id).await.unwrap().unwrap();
        assert_eq!(offer.usage_count, 0);
    }

    #[tokio::test]
    async fn test_concurrent_coupon_single_use() {
        let db = test_db().await;
        let (sandwich, shake) = menu(&db).await;
        let offer = coupon(&db, "ONCE", Some(1)).await;

        let mut request = CheckoutRequest::new(bill(&sandwich, &shake), PaymentMethod::Cash);
        request.coupon_code = Some("ONCE".to_string());
        let settings = CheckoutSettings::default();

        let repo_a = db.orders();
        let repo_b = db.orders();
        let (a, b) = tokio::join!(
            repo_a.finalize(&request, &settings, sale_time()),
            repo_b.finalize(&request, &settings, sale_time()),
        );

        let results = [a, b];
        let successes = results.iter().filter(|r| r.is_ok()).count();
        let exhausted = results
            .iter()
            .filter(|r| matches!(r, Err(CheckoutError::Rejected(CoreError::CouponExhausted(_)))))
            .count();

        assert_eq!(successes, 1);
        assert_eq!(exhausted, 1);
        assert_eq!(order_count(&db).await, 1);

        let offer = db.offers().get_by_id(&offer.id).await.unwrap().unwrap();
        assert_eq!(offer.usage_count, 1);
    }

    #[tokio::test]
    async fn test_order_number_collision_rolls_back() {
        let db = test_db().await;
        let (sandwich, shake) = menu(&db).await;
        let offer = coupon(&db, "TEN", None).await;
        let settings = CheckoutSettings::default();

        let first = CheckoutRequest::new(bill(&sandwich, &shake), PaymentMethod::Cash);
        db.orders()
            .finalize_with(&first, &settings, sale_time(), || "TC2610190001".to_string())
            .await
            .unwrap();

        let mut second = CheckoutRequest::new(bill(&sandwich, &shake), PaymentMethod::Cash);
        second.coupon_code = Some("TEN".to_string());
        second.customer_mobile = Some("9876543210".to_string());

        let mut calls = 0;
        let err = db
            .orders()
            .finalize_with(&second, &settings, sale_time(), || {
                calls += 1;
                "TC2610190001".to_string()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::OrderNumberCollision { attempts: 5 }));
        assert_eq!(calls, 5);
        assert_eq!(order_count(&db).await, 1);

        // coupon claim and customer upsert were rolled back with the order
        let offer = db.offers().get_by_id(&offer.id).await.unwrap().unwrap();
        assert_eq!(offer.usage_count, 0);
        assert!(db.customers().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_order_number_retry_succeeds() {
        let db = test_db().await;
        let (sandwich, shake) = menu(&db).await;
        let settings = CheckoutSettings::default();
        let request = CheckoutRequest::new(bill(&sandwich, &shake), PaymentMethod::Cash);

        db.orders()
            .finalize_with(&request, &settings, sale_time(), || "TC2610190001".to_string())
            .await
            .unwrap();

        let mut numbers = vec!["TC2610190002", "TC2610190001"];
        let details = db
            .orders()
            .finalize_with(&request, &settings, sale_time(), || {
                numbers.pop().unwrap_or("TC2610199999").to_string()
            })
            .await
            .unwrap();

        assert_eq!(details.order.order_number, "TC2610190002");
        assert_eq!(order_count(&db).await, 2);
    }

    #[tokio::test]
    async fn test_customer_upserted_with_order() {
        let db = test_db().await;
        let (sandwich, shake) = menu(&db).await;
        let settings = CheckoutSettings::default();

        let mut request = CheckoutRequest::new(bill(&sandwich, &shake), PaymentMethod::Cash);
        request.customer_name = Some("Meera".to_string());
        request.customer_mobile = Some("+91 98765 43210".to_string());

        let first = db.orders().finalize(&request, &settings, sale_time()).await.unwrap();
        request.customer_name = None;
        let second = db.orders().finalize(&request, &settings, sale_time()).await.unwrap();

        let customer = first.customer.unwrap();
        assert_eq!(customer.mobile, "919876543210");
        assert_eq!(second.order.customer_id.as_deref(), Some(customer.id.as_str()));

        let customers = db.customers().list().await.unwrap();
        assert_eq!(customers.len(), 1);
        assert_eq!(customers[0].name.as_deref(), Some("Meera"));
        assert_eq!(customers[0].total_orders, 2);
        assert_eq!(customers[0].total_spent_cents, 2 * first.order.final_amount_cents);

        request.customer_mobile = Some("12ab".to_string());
        let err = db.orders().finalize(&request, &settings, sale_time()).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Rejected(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_preview_matches_finalized_total() {
        let db = test_db().await;
        let (sandwich, shake) = menu(&db).await;
        let combo = db
            .combos()
            .create(&combo_draft("Meal", 8000, vec![sandwich.id.clone(), shake.id.clone()]))
            .await
            .unwrap();

        let mut draft = offer_draft("Meal Deal", 1500);
        draft.apply_to_all = false;
        draft.scope = vec![combo.item_ref()];
        draft.coupon_code = Some("MEAL".to_string());
        draft.max_discount_amount = Some(Money::from_cents(2000));
        let offer = db.offers().create(&draft).await.unwrap();

        let lines = vec![
            CheckoutLine::new(sandwich.item_ref(), 1),
            CheckoutLine::new(combo.item_ref(), 2),
        ];
        let settings = CheckoutSettings {
            tax_rate: Percent::from_bps(500),
            ..CheckoutSettings::default()
        };
        let local_now = settings.local_now(sale_time());

        let cart: Vec<CartLine> = db
            .orders()
            .price_lines(&lines)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.line)
            .collect();
        let preview = compute_cart_totals(&cart, &[offer], local_now, false).unwrap();

        let mut request = CheckoutRequest::new(lines, PaymentMethod::Card);
        request.coupon_code = Some("MEAL".to_string());
        let details = db.orders().finalize(&request, &settings, sale_time()).await.unwrap();

        assert_eq!(preview.subtotal, details.order.subtotal());
        assert_eq!(preview.discount, details.order.discount());
        assert_eq!(
            preview.total,
            details.order.final_amount() - details.order.tax()
        );
    }

    #[tokio::test]
    async fn test_list_filters_by_business_date() {
        let db = test_db().await;
        let (sandwich, shake) = menu(&db).await;
        let settings = CheckoutSettings::default();
        let request = CheckoutRequest::new(bill(&sandwich, &shake), PaymentMethod::Cash);

        db.orders().finalize(&request, &settings, sale_time()).await.unwrap();
        let next_day = Utc.with_ymd_and_hms(2026, 10, 20, 8, 30, 0).unwrap();
        db.orders().finalize(&request, &settings, next_day).await.unwrap();

        let all = db.orders().list(OrderListFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].item_count, 3);

        let only_20th = db
            .orders()
            .list(OrderListFilter {
                start_date: NaiveDate::from_ymd_opt(2026, 10, 20),
                ..OrderListFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(only_20th.len(), 1);
        assert!(only_20th[0].order.order_number.starts_with("TC261020"));
    }

    #[tokio::test]
    async fn test_status_moves_until_closed() {
        let db = test_db().await;
        let (sandwich, shake) = menu(&db).await;
        let settings = CheckoutSettings::default();

        let mut request = CheckoutRequest::new(bill(&sandwich, &shake), PaymentMethod::Cash);
        request.status = OrderStatus::Pending;
        let ticket = db.orders().finalize(&request, &settings, sale_time()).await.unwrap();
        assert_eq!(ticket.order.status, OrderStatus::Pending);

        let order = db
            .orders()
            .update_status(&ticket.order.id, OrderStatus::Preparing)
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Preparing);
        assert_eq!(order.final_amount_cents, ticket.order.final_amount_cents);

        db.orders()
            .update_status(&ticket.order.id, OrderStatus::Completed)
            .await
            .unwrap();
        let err = db
            .orders()
            .update_status(&ticket.order.id, OrderStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Rejected(CoreError::OrderLocked { status: OrderStatus::Completed, .. })
        ));

        let stored = db.orders().get_by_id(&ticket.order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Completed);

        let err = db.orders().update_status("ghost", OrderStatus::Ready).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_counter_sale_is_closed_at_checkout() {
        let db = test_db().await;
        let (sandwich, shake) = menu(&db).await;
        let request = CheckoutRequest::new(bill(&sandwich, &shake), PaymentMethod::Card);
        let sale = db
            .orders()
            .finalize(&request, &CheckoutSettings::default(), sale_time())
            .await
            .unwrap();

        let err = db
            .orders()
            .update_status(&sale.order.id, OrderStatus::Cancelled)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rejected(CoreError::OrderLocked { .. })));

        let mut cancelled = CheckoutRequest::new(bill(&sandwich, &shake), PaymentMethod::Card);
        cancelled.status = OrderStatus::Cancelled;
        let err = db
            .orders()
            .finalize(&cancelled, &CheckoutSettings::default(), sale_time())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Rejected(CoreError::Validation(_))));
        assert_eq!(order_count(&db).await, 1);
    }

    #[tokio::test]
    async fn test_cancel_and_delete_release_coupon() {
        let db = test_db().await;
        let (sandwich, shake) = menu(&db).await;
        let offer = coupon(&db, "TWICE", Some(2)).await;
        let settings = CheckoutSettings::default();

        let mut request = CheckoutRequest::new(bill(&sandwich, &shake), PaymentMethod::Upi);
        request.coupon_code = Some("TWICE".to_string());
        request.status = OrderStatus::Pending;
        let first = db.orders().finalize(&request, &settings, sale_time()).await.unwrap();
        let second = db.orders().finalize(&request, &settings, sale_time()).await.unwrap();

        assert_eq!(usage_count(&db, &offer.id).await, 2);

        db.orders()
            .update_status(&first.order.id, OrderStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(usage_count(&db, &offer.id).await, 1);

        let deleted = db.orders().delete_pending(&second.order.id).await.unwrap();
        assert_eq!(deleted.order_number, second.order.order_number);
        assert_eq!(usage_count(&db, &offer.id).await, 0);
        assert!(db.orders().get_with_items(&second.order.id).await.unwrap().is_none());

        let items: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM order_items WHERE order_id = ?1")
            .bind(&second.order.id)
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(items, 0);
    }

    #[tokio::test]
    async fn test_only_pending_orders_can_be_deleted() {
        let db = test_db().await;
        let (sandwich, shake) = menu(&db).await;
        let settings = CheckoutSettings::default();

        let mut request = CheckoutRequest::new(bill(&sandwich, &shake), PaymentMethod::Cash);
        request.status = OrderStatus::Ready;
        let ready = db.orders().finalize(&request, &settings, sale_time()).await.unwrap();

        let err = db.orders().delete_pending(&ready.order.id).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Rejected(CoreError::OrderLocked { status: OrderStatus::Ready, action: "delete", .. })
        ));
        assert_eq!(order_count(&db).await, 1);

        let err = db.orders().delete_pending("ghost").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_filters_by_status_and_type() {
        let db = test_db().await;
        let (sandwich, shake) = menu(&db).await;
        let settings = CheckoutSettings::default();

        let counter = CheckoutRequest::new(bill(&sandwich, &shake), PaymentMethod::Cash);
        db.orders().finalize(&counter, &settings, sale_time()).await.unwrap();

        let mut delivery = CheckoutRequest::new(bill(&sandwich, &shake), PaymentMethod::Upi);
        delivery.order_type = OrderType::Delivery;
        delivery.status = OrderStatus::Pending;
        let pending = db.orders().finalize(&delivery, &settings, sale_time()).await.unwrap();

        let open = db
            .orders()
            .list(OrderListFilter {
                status: Some(OrderStatus::Pending),
                ..OrderListFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].order.id, pending.order.id);

        let delivered = db
            .orders()
            .list(OrderListFilter {
                order_type: Some(OrderType::Delivery),
                status: Some(OrderStatus::Completed),
                ..OrderListFilter::default()
            })
            .await
            .unwrap();
        assert!(delivered.is_empty());

        let dine_in = db
            .orders()
            .list(OrderListFilter {
                order_type: Some(OrderType::DineIn),
                ..OrderListFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(dine_in.len(), 1);
        assert_eq!(dine_in[0].order.status, OrderStatus::Completed);
    }
}
