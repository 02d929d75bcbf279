//! # Repository Module
//!
//! Database repository implementations for Thrive POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  axum handler                                                          │
//! │       │                                                                 │
//! │       │  state.db.orders().finalize(&request, &settings, now)          │
//! │       ▼                                                                 │
//! │  OrderRepository                                                       │
//! │  ├── finalize(&self, request, settings, now)   ← one transaction       │
//! │  ├── list(&self, filter)                                               │
//! │  └── get_with_items(&self, id)                                         │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Each repository owns a cloned SqlitePool; pricing rules stay in       │
//! │  thrive-core and are called from here, never re-implemented in SQL.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Product CRUD
//! - [`ComboRepository`](combo::ComboRepository) - Combos and their making cost
//! - [`OfferRepository`](offer::OfferRepository) - Offers, coupons, checkout offers
//! - [`CustomerRepository`](customer::CustomerRepository) - Customers by mobile
//! - [`OrderRepository`](order::OrderRepository) - Checkout and order reads
//! - [`SettingsRepository`](settings::SettingsRepository) - `system_settings`
//! - [`SearchRepository`](search::SearchRepository) - Menu search
//! - [`DashboardRepository`](dashboard::DashboardRepository) - Dashboard stats
//! - [`ReportRepository`](report::ReportRepository) - Export rows

pub mod combo;
pub mod customer;
pub mod dashboard;
pub mod offer;
pub mod order;
pub mod product;
pub mod report;
pub mod search;
pub mod settings;

use chrono::NaiveDate;

/// Inclusive range of business dates used by dashboard and export queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange { start, end }
    }

    /// A single day.
    pub fn day(date: NaiveDate) -> Self {
        DateRange { start: date, end: date }
    }

    pub fn is_single_day(&self) -> bool {
        self.start == self.end
    }
}

// =============================================================================
// Test Fixtures
// =============================================================================
