//! # Report Repository
//!
//! Typed rows behind the CSV exports. Rendering (currency symbol,
//! quoting, headers) happens at the HTTP layer.
//!
//! ```text
//! sales      → one row per order item in a business-date range
//! products   → lifetime totals per product
//! combos     → lifetime totals per combo, with its product names
//! customers  → lifetime totals per customer
//! ```
//!
//! Profit always uses the making cost snapshotted on the order item,
//! so editing a product's cost does not rewrite past margins.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::DateRange;
use thrive_core::{ItemType, PaymentMethod};

// =============================================================================
// Rows
// =============================================================================

/// One sold line with its order's totals repeated. Amounts are minor units.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SalesReportRow {
    pub order_number: String,
    pub business_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub customer_name: Option<String>,
    pub customer_mobile: Option<String>,
    pub item_type: ItemType,
    pub item_name: String,
    pub quantity: i64,
    pub unit_price: i64,
    pub item_total: i64,
    pub item_profit: i64,
    pub order_subtotal: i64,
    pub order_discount: i64,
    pub order_tax: i64,
    pub order_total: i64,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductReportRow {
    pub id: String,
    pub name: String,
    pub sku: String,
    pub price: i64,
    pub making_cost: i64,
    pub is_active: bool,
    pub total_sold: i64,
    pub total_revenue: i64,
    pub total_profit: i64,
    pub created_at: DateTime<Utc>,
}

impl ProductReportRow {
    pub fn profit_per_unit(&self) -> i64 {
        self.price - self.making_cost
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ComboReportRow {
    pub id: String,
    pub name: String,
    /// Component names joined with `", "`, in combo order.
    pub products: Option<String>,
    pub price: i64,
    pub making_cost: i64,
    pub is_active: bool,
    pub total_sold: i64,
    pub total_revenue: i64,
    pub total_profit: i64,
    pub created_at: DateTime<Utc>,
}

impl ComboReportRow {
    pub fn profit_per_unit(&self) -> i64 {
        self.price - self.making_cost
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CustomerReportRow {
    pub id: String,
    pub name: Option<String>,
    pub mobile: String,
    pub total_orders: i64,
    pub total_spent: i64,
    pub last_order_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl CustomerReportRow {
    /// Integer average, 0 without orders.
    pub fn avg_order_value(&self) -> i64 {
        if self.total_orders > 0 {
            self.total_spent / self.total_orders
        } else {
            0
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for export reports.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    /// Creates a new ReportRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Sold lines in `range`, newest order first.
    pub async fn sales(&self, range: DateRange) -> DbResult<Vec<SalesReportRow>> {
        let rows = sqlx::query_as::<_, SalesReportRow>(
            r#"
            SELECT
                o.order_number,
                o.business_date,
                o.created_at,
                c.name AS customer_name,
                c.mobile AS customer_mobile,
                oi.item_type,
                oi.name_snapshot AS item_name,
                oi.quantity,
                oi.unit_price_cents AS unit_price,
                oi.line_total_cents AS item_total,
                (oi.unit_price_cents - oi.making_cost_cents) * oi.quantity AS item_profit,
                o.subtotal_cents AS order_subtotal,
                o.discount_cents AS order_discount,
                o.tax_cents AS order_tax,
                o.final_amount_cents AS order_total,
                o.payment_method
            FROM orders o
            JOIN order_items oi ON oi.order_id = o.id
            LEFT JOIN customers c ON c.id = o.customer_id
            WHERE o.business_date BETWEEN ?1 AND ?2
            ORDER BY o.created_at DESC, oi.rowid ASC
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.pool)
        .await?;

        debug!(start = %range.start, end = %range.end, rows = rows.len(), "Sales report");
        Ok(rows)
    }

    pub async fn products(&self) -> DbResult<Vec<ProductReportRow>> {
        let rows = sqlx::query_as::<_, ProductReportRow>(
            r#"
            SELECT
                p.id,
                p.name,
                p.sku,
                p.price_cents AS price,
                p.making_cost_cents AS making_cost,
                p.is_active,
                COALESCE(SUM(oi.quantity), 0) AS total_sold,
                COALESCE(SUM(oi.line_total_cents), 0) AS total_revenue,
                COALESCE(SUM((oi.unit_price_cents - oi.making_cost_cents) * oi.quantity), 0)
                    AS total_profit,
                p.created_at
            FROM products p
            LEFT JOIN order_items oi ON oi.item_id = p.id AND oi.item_type = 'product'
            GROUP BY p.id
            ORDER BY p.name COLLATE NOCASE
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Sales and component names come from separate subqueries so the
    /// two joins can't multiply each other's rows.
    pub async fn combos(&self) -> DbResult<Vec<ComboReportRow>> {
        let rows = sqlx::query_as::<_, ComboReportRow>(
            r#"
            SELECT
                c.id,
                c.name,
                (
                    SELECT GROUP_CONCAT(name, ', ') FROM (
                        SELECT p.name FROM combo_items ci
                        JOIN products p ON p.id = ci.product_id
                        WHERE ci.combo_id = c.id
                        ORDER BY ci.position
                    )
                ) AS products,
                c.price_cents AS price,
                c.making_cost_cents AS making_cost,
                c.is_active,
                COALESCE(s.total_sold, 0) AS total_sold,
                COALESCE(s.total_revenue, 0) AS total_revenue,
                COALESCE(s.total_profit, 0) AS total_profit,
                c.created_at
            FROM combos c
            LEFT JOIN (
                SELECT item_id,
                       SUM(quantity) AS total_sold,
                       SUM(line_total_cents) AS total_revenue,
                       SUM((unit_price_cents - making_cost_cents) * quantity) AS total_profit
                FROM order_items
                WHERE item_type = 'combo'
                GROUP BY item_id
            ) s ON s.item_id = c.id
            ORDER BY c.name COLLATE NOCASE
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Biggest spenders first.
    pub async fn customers(&self) -> DbResult<Vec<CustomerReportRow>> {
        let rows = sqlx::query_as::<_, CustomerReportRow>(
            r#"
            SELECT
                c.id,
                c.name,
                c.mobile,
                COUNT(o.id) AS total_orders,
                COALESCE(SUM(o.final_amount_cents), 0) AS total_spent,
                MAX(o.created_at) AS last_order_at,
                c.created_at
            FROM customers c
            LEFT JOIN orders o ON o.customer_id = c.id
            GROUP BY c.id
            ORDER BY total_spent DESC, c.name COLLATE NOCASE
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::order::{CheckoutLine, CheckoutRequest};
    use crate::repository::settings::CheckoutSettings;
    use crate::repository::test_support::{combo_draft, product_draft, test_db};
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_reports_after_sales() {
        let db = test_db().await;
        let settings = CheckoutSettings::default();

        let latte = db.products().create(&product_draft("Latte", 10000, 3000)).await.unwrap();
        let toast = db.products().create(&product_draft("Toast", 6000, 2000)).await.unwrap();
        let combo = db
            .combos()
            .create(&combo_draft("Breakfast", 14000, vec![latte.id.clone(), toast.id.clone()]))
            .await
            .unwrap();

        let mut request = CheckoutRequest::new(
            vec![
                CheckoutLine::new(latte.item_ref(), 2),
                CheckoutLine::new(combo.item_ref(), 1),
            ],
            PaymentMethod::Card,
        );
        request.customer_name = Some("Nisha".to_string());
        request.customer_mobile = Some("9988776655".to_string());

        let sale = Utc.with_ymd_and_hms(2026, 10, 19, 6, 0, 0).unwrap();
        db.orders().finalize(&request, &settings, sale).await.unwrap();

        let day = DateRange::day(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
        let sales = db.reports().sales(day).await.unwrap();
        assert_eq!(sales.len(), 2);
        assert_eq!(sales[0].item_name, "Latte");
        assert_eq!(sales[0].item_total, 20000);
        assert_eq!(sales[0].item_profit, 14000);
        assert_eq!(sales[1].item_type, ItemType::Combo);
        assert_eq!(sales[1].item_profit, 14000 - 5000);
        assert_eq!(sales[0].order_subtotal, 34000);
        assert_eq!(sales[0].customer_mobile.as_deref(), Some("9988776655"));

        let other_day = DateRange::day(NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
        assert!(db.reports().sales(other_day).await.unwrap().is_empty());

        let products = db.reports().products().await.unwrap();
        let latte_row = products.iter().find(|p| p.id == latte.id).unwrap();
        assert_eq!(latte_row.total_sold, 2);
        assert_eq!(latte_row.profit_per_unit(), 7000);
        let toast_row = products.iter().find(|p| p.id == toast.id).unwrap();
        assert_eq!(toast_row.total_sold, 0);

        let combos = db.reports().combos().await.unwrap();
        assert_eq!(combos.len(), 1);
        assert_eq!(combos[0].products.as_deref(), Some("Latte, Toast"));
        assert_eq!(combos[0].total_sold, 1);
        assert_eq!(combos[0].total_revenue, 14000);

        let customers = db.reports().customers().await.unwrap();
        assert_eq!(customers.len(), 1);
        assert_eq!(customers[0].total_orders, 1);
        assert_eq!(customers[0].avg_order_value(), customers[0].total_spent);
    }
}
