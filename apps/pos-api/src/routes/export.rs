//! # CSV Export
//!
//! ```text
//! GET /api/export?report_type=sales&filter=7days
//!          │
//!          ├── sales      → sales_report_{start}_to_{end}.csv  (date-filtered)
//!          ├── products   → products_report_{today}.csv        (lifetime)
//!          ├── combos     → combos_report_{today}.csv          (lifetime)
//!          └── customers  → customers_report_{today}.csv       (lifetime)
//! ```
//!
//! Amounts are rendered with the configured currency symbol, times in
//! café-local time.

use std::fmt;
use std::str::FromStr;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Days, FixedOffset, NaiveDate, Utc};
use serde::Deserialize;
use tracing::info;

use crate::csv::CsvWriter;
use crate::error::ApiError;
use crate::state::AppState;
use thrive_core::Money;
use thrive_db::repository::report::{
    ComboReportRow, CustomerReportRow, ProductReportRow, SalesReportRow,
};
use thrive_db::DateRange;

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub report_type: Option<String>,
    pub filter: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportType {
    Sales,
    Products,
    Combos,
    Customers,
}

impl FromStr for ReportType {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "sales" => Ok(ReportType::Sales),
            "products" => Ok(ReportType::Products),
            "combos" => Ok(ReportType::Combos),
            "customers" => Ok(ReportType::Customers),
            _ => Err(ApiError::validation("Invalid report type")),
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReportType::Sales => "sales",
            ReportType::Products => "products",
            ReportType::Combos => "combos",
            ReportType::Customers => "customers",
        })
    }
}

/// Date range for the sales report. Unknown filters mean today.
pub fn export_range(
    filter: Option<&str>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<DateRange, ApiError> {
    let days_back = |n: u64| today.checked_sub_days(Days::new(n)).unwrap_or(today);

    match filter.unwrap_or("today") {
        "7days" => Ok(DateRange::new(days_back(7), today)),
        "28days" => Ok(DateRange::new(days_back(28), today)),
        "custom" => match (start_date, end_date) {
            (Some(start), Some(end)) if start <= end => Ok(DateRange::new(start, end)),
            (Some(_), Some(_)) => Err(ApiError::validation(
                "start_date must be on or before end_date",
            )),
            _ => Err(ApiError::validation(
                "Custom range needs start_date and end_date",
            )),
        },
        _ => Ok(DateRange::day(today)),
    }
}

pub async fn export(
    State(state): State<AppState>,
    query: Result<Query<ExportQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let report: ReportType = query.report_type.as_deref().unwrap_or_default().parse()?;

    let settings = &state.settings;
    let today = settings.local_now(Utc::now()).date();
    let fmt = Formatter {
        symbol: &settings.currency_symbol,
        offset: settings.utc_offset,
    };
    let reports = state.db.reports();

    let (filename, csv) = match report {
        ReportType::Sales => {
            let range = export_range(
                query.filter.as_deref(),
                query.start_date,
                query.end_date,
                today,
            )?;
            let rows = reports.sales(range).await?;
            (
                format!("sales_report_{}_to_{}.csv", range.start, range.end),
                sales_csv(&rows, &fmt),
            )
        }
        ReportType::Products => (
            format!("products_report_{}.csv", today),
            products_csv(&reports.products().await?, &fmt),
        ),
        ReportType::Combos => (
            format!("combos_report_{}.csv", today),
            combos_csv(&reports.combos().await?, &fmt),
        ),
        ReportType::Customers => (
            format!("customers_report_{}.csv", today),
            customers_csv(&reports.customers().await?, &fmt),
        ),
    };

    info!(report = %report, rows = csv.len(), filename = %filename, "Report exported");
    Ok(csv_response(&filename, csv.finish()))
}

fn csv_response(filename: &str, body: String) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response()
}

// =============================================================================
// Rendering
// =============================================================================

struct Formatter<'a> {
    symbol: &'a str,
    offset: FixedOffset,
}

impl Formatter<'_> {
    fn money(&self, cents: i64) -> String {
        Money::from_cents(cents).format_with(self.symbol)
    }

    fn local(&self, at: DateTime<Utc>, pattern: &str) -> String {
        at.with_timezone(&self.offset).format(pattern).to_string()
    }
}

fn status(is_active: bool) -> String {
    if is_active { "Active" } else { "Inactive" }.to_string()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn sales_csv(rows: &[SalesReportRow], fmt: &Formatter<'_>) -> CsvWriter {
    let mut csv = CsvWriter::with_headers(&[
        "Order Number",
        "Date",
        "Time",
        "Customer Name",
        "Customer Mobile",
        "Item Type",
        "Item Name",
        "Quantity",
        "Price Per Item",
        "Item Total",
        "Item Profit",
        "Order Subtotal",
        "Order Discount",
        "Order Tax",
        "Order Total",
        "Payment Method",
    ]);

    for row in rows {
        csv.row([
            row.order_number.clone(),
            row.business_date.to_string(),
            fmt.local(row.created_at, "%H:%M:%S"),
            row.customer_name.clone().unwrap_or_else(|| "Walk-in".to_string()),
            row.customer_mobile.clone().unwrap_or_default(),
            capitalize(row.item_type.as_str()),
            row.item_name.clone(),
            row.quantity.to_string(),
            fmt.money(row.unit_price),
            fmt.money(row.item_total),
            fmt.money(row.item_profit),
            fmt.money(row.order_subtotal),
            fmt.money(row.order_discount),
            fmt.money(row.order_tax),
            fmt.money(row.order_total),
            row.payment_method.to_string(),
        ]);
    }

    csv
}

fn products_csv(rows: &[ProductReportRow], fmt: &Formatter<'_>) -> CsvWriter {
    let mut csv = CsvWriter::with_headers(&[
        "ID",
        "SKU",
        "Name",
        "Selling Price",
        "Making Cost",
        "Profit Per Unit",
        "Status",
        "Total Sold",
        "Total Revenue",
        "Total Profit",
        "Created At",
    ]);

    for row in rows {
        csv.row([
            row.id.clone(),
            row.sku.clone(),
            row.name.clone(),
            fmt.money(row.price),
            fmt.money(row.making_cost),
            fmt.money(row.profit_per_unit()),
            status(row.is_active),
            row.total_sold.to_string(),
            fmt.money(row.total_revenue),
            fmt.money(row.total_profit),
            fmt.local(row.created_at, "%Y-%m-%d %H:%M"),
        ]);
    }

    csv
}

fn combos_csv(rows: &[ComboReportRow], fmt: &Formatter<'_>) -> CsvWriter {
    let mut csv = CsvWriter::with_headers(&[
        "ID",
        "Name",
        "Products",
        "Selling Price",
        "Making Cost",
        "Profit Per Unit",
        "Status",
        "Total Sold",
        "Total Revenue",
        "Total Profit",
        "Created At",
    ]);

    for row in rows {
        csv.row([
            row.id.clone(),
            row.name.clone(),
            row.products.clone().unwrap_or_default(),
            fmt.money(row.price),
            fmt.money(row.making_cost),
            fmt.money(row.profit_per_unit()),
            status(row.is_active),
            row.total_sold.to_string(),
            fmt.money(row.total_revenue),
            fmt.money(row.total_profit),
            fmt.local(row.created_at, "%Y-%m-%d %H:%M"),
        ]);
    }

    csv
}

fn customers_csv(rows: &[CustomerReportRow], fmt: &Formatter<'_>) -> CsvWriter {
    let mut csv = CsvWriter::with_headers(&[
        "ID",
        "Name",
        "Mobile",
        "Total Orders",
        "Total Spent",
        "Average Order Value",
        "Last Order Date",
        "Customer Since",
    ]);

    for row in rows {
        csv.row([
            row.id.clone(),
            row.name.clone().unwrap_or_default(),
            row.mobile.clone(),
            row.total_orders.to_string(),
            fmt.money(row.total_spent),
            fmt.money(row.avg_order_value()),
            row.last_order_at
                .map(|at| fmt.local(at, "%Y-%m-%d %H:%M"))
                .unwrap_or_default(),
            fmt.local(row.created_at, "%Y-%m-%d"),
        ]);
    }

    csv
}
