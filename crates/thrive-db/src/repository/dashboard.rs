//! # Dashboard Repository
//!
//! Read-only aggregates for the owner's dashboard.
//!
//! ## Layout
//! ```text
//! ┌──────────────┬──────────────┬──────────────┬──────────────┐
//! │ revenue      │ orders       │ avg order    │ items sold   │  ← stats
//! ├──────────────┴──────────────┴──────────────┴──────────────┤
//! │ sales chart   hourly (today) │ daily (7days/30days/year)  │
//! ├──────────────────────────────┬────────────────────────────┤
//! │ recent orders (10)           │ top products by qty (10)   │
//! ├──────────────────────────────┴────────────────────────────┤
//! │ low stock: stock_quantity <= min_stock_level (10)         │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! Cancelled orders count nowhere except the recent-orders panel.
//! Everything is bucketed by `business_date`. Hours are derived from
//! `created_at` in café-local time, because SQLite has no notion of the
//! configured offset.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Timelike, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::product::ProductRepository;
use crate::repository::DateRange;
use thrive_core::{PaymentMethod, Product};

const PANEL_LIMIT: i64 = 10;

// =============================================================================
// Filter
// =============================================================================

/// Period selector of the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum DashboardFilter {
    #[default]
    #[serde(rename = "today")]
    Today,
    #[serde(rename = "7days")]
    Last7Days,
    #[serde(rename = "30days")]
    Last30Days,
    #[serde(rename = "year")]
    Year,
}

impl DashboardFilter {
    /// Parses the `filter` query value; anything unknown means today.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("7days") => DashboardFilter::Last7Days,
            Some("30days") => DashboardFilter::Last30Days,
            Some("year") => DashboardFilter::Year,
            _ => DashboardFilter::Today,
        }
    }

    /// Business dates covered, ending on `today`.
    pub fn range(&self, today: NaiveDate) -> DateRange {
        match self {
            DashboardFilter::Today => DateRange::day(today),
            DashboardFilter::Last7Days => DateRange::new(today - Duration::days(7), today),
            DashboardFilter::Last30Days => DateRange::new(today - Duration::days(30), today),
            DashboardFilter::Year => {
                let jan_first = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
                DateRange::new(jan_first, today)
            }
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// Headline numbers. Amounts are minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DashboardStats {
    pub total_revenue: i64,
    pub total_orders: i64,
    pub avg_order_value: i64,
    pub products_sold: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RecentOrder {
    pub id: String,
    pub order_number: String,
    pub customer_name: Option<String>,
    pub final_amount: i64,
    pub payment_method: PaymentMethod,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct TopProduct {
    pub id: String,
    pub name: String,
    pub quantity_sold: i64,
    pub revenue: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LowStockItem {
    pub id: String,
    pub name: String,
    pub sku: String,
    pub stock_quantity: i64,
    pub min_stock_level: i64,
}

impl From<Product> for LowStockItem {
    fn from(product: Product) -> Self {
        LowStockItem {
            id: product.id,
            name: product.name,
            sku: product.sku,
            stock_quantity: product.stock_quantity,
            min_stock_level: product.min_stock_level,
        }
    }
}

/// One bar of the sales chart. `period` is `HH:00` or `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct SalesPoint {
    pub period: String,
    pub order_count: i64,
    pub revenue: i64,
}

/// The whole dashboard in one payload.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub filter: DashboardFilter,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub stats: DashboardStats,
    pub recent_orders: Vec<RecentOrder>,
    pub top_products: Vec<TopProduct>,
    pub low_stock: Vec<LowStockItem>,
    pub sales_chart: Vec<SalesPoint>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for dashboard aggregates.
#[derive(Debug, Clone)]
pub struct DashboardRepository {
    pool: SqlitePool,
}

impl DashboardRepository {
    /// Creates a new DashboardRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DashboardRepository { pool }
    }

    /// Builds every dashboard panel for `filter`, relative to the local
    /// date `today`.
    pub async fn load(
        &self,
        filter: DashboardFilter,
        today: NaiveDate,
        utc_offset: FixedOffset,
    ) -> DbResult<Dashboard> {
        let range = filter.range(today);
        debug!(?filter, start = %range.start, end = %range.end, "Loading dashboard");

        Ok(Dashboard {
            filter,
            start_date: range.start,
            end_date: range.end,
            stats: self.stats(range).await?,
            recent_orders: self.recent_orders(range, PANEL_LIMIT).await?,
            top_products: self.top_products(range, PANEL_LIMIT).await?,
            low_stock: self.low_stock(PANEL_LIMIT).await?,
            sales_chart: self.sales_chart(range, utc_offset).await?,
        })
    }

    pub async fn stats(&self, range: DateRange) -> DbResult<DashboardStats> {
        let (total_orders, total_revenue): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COALESCE(SUM(final_amount_cents), 0)
            FROM orders
            WHERE business_date BETWEEN ?1 AND ?2 AND status <> 'cancelled'
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_one(&self.pool)
        .await?;

        let products_sold: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(oi.quantity), 0)
            FROM order_items oi
            JOIN orders o ON o.id = oi.order_id
            WHERE o.business_date BETWEEN ?1 AND ?2 AND o.status <> 'cancelled'
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_one(&self.pool)
        .await?;

        let avg_order_value = if total_orders > 0 {
            total_revenue / total_orders
        } else {
            0
        };

        Ok(DashboardStats {
            total_revenue,
            total_orders,
            avg_order_value,
            products_sold,
        })
    }

    pub async fn recent_orders(&self, range: DateRange, limit: i64) -> DbResult<Vec<RecentOrder>> {
        let orders = sqlx::query_as::<_, RecentOrder>(
            r#"
            SELECT o.id, o.order_number, c.name AS customer_name,
                   o.final_amount_cents AS final_amount, o.payment_method, o.created_at
            FROM orders o
            LEFT JOIN customers c ON c.id = o.customer_id
            WHERE o.business_date BETWEEN ?1 AND ?2
            ORDER BY o.created_at DESC
            LIMIT ?3
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// Best sellers by quantity. Combos are not broken down.
    pub async fn top_products(&self, range: DateRange, limit: i64) -> DbResult<Vec<TopProduct>> {
        let products = sqlx::query_as::<_, TopProduct>(
            r#"
            SELECT oi.item_id AS id,
                   COALESCE(p.name, MAX(oi.name_snapshot)) AS name,
                   SUM(oi.quantity) AS quantity_sold,
                   SUM(oi.line_total_cents) AS revenue
            FROM order_items oi
            JOIN orders o ON o.id = oi.order_id
            LEFT JOIN products p ON p.id = oi.item_id
            WHERE oi.item_type = 'product'
              AND o.business_date BETWEEN ?1 AND ?2
              AND o.status <> 'cancelled'
            GROUP BY oi.item_id
            ORDER BY quantity_sold DESC, revenue DESC
            LIMIT ?3
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Active products at or below their reorder level, scarcest first.
    pub async fn low_stock(&self, limit: i64) -> DbResult<Vec<LowStockItem>> {
        let mut scarce: Vec<Product> = ProductRepository::new(self.pool.clone())
            .list(true)
            .await?
            .into_iter()
            .filter(Product::is_low_stock)
            .collect();

        // list() is already by name, so a stable sort keeps names in order
        scarce.sort_by_key(|product| product.stock_quantity);

        Ok(scarce
            .into_iter()
            .take(usize::try_from(limit).unwrap_or(0))
            .map(LowStockItem::from)
            .collect())
    }

    /// Hourly buckets for a single day, daily buckets otherwise. Empty
    /// periods are omitted.
    pub async fn sales_chart(
        &self,
        range: DateRange,
        utc_offset: FixedOffset,
    ) -> DbResult<Vec<SalesPoint>> {
        if !range.is_single_day() {
            let points = sqlx::query_as::<_, SalesPoint>(
                r#"
                SELECT business_date AS period,
                       COUNT(*) AS order_count,
                       SUM(final_amount_cents) AS revenue
                FROM orders
                WHERE business_date BETWEEN ?1 AND ?2 AND status <> 'cancelled'
                GROUP BY business_date
                ORDER BY business_date
                "#,
            )
            .bind(range.start)
            .bind(range.end)
            .fetch_all(&self.pool)
            .await?;
            return Ok(points);
        }

        let rows: Vec<(DateTime<Utc>, i64)> = sqlx::query_as(
            "SELECT created_at, final_amount_cents FROM orders \
             WHERE business_date = ?1 AND status <> 'cancelled'",
        )
        .bind(range.start)
        .fetch_all(&self.pool)
        .await?;

        let mut by_hour: BTreeMap<u32, (i64, i64)> = BTreeMap::new();
        for (created_at, amount) in rows {
            let hour = created_at.with_timezone(&utc_offset).hour();
            let bucket = by_hour.entry(hour).or_default();
            bucket.0 += 1;
            bucket.1 += amount;
        }

        Ok(by_hour
            .into_iter()
            .map(|(hour, (order_count, revenue))| SalesPoint {
                period: format!("{:02}:00", hour),
                order_count,
                revenue,
            })
            .collect())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
