//! # thrive-db: Database Layer for Thrive POS
//!
//! SQLite persistence for the café POS, built on sqlx. Owns the
//! checkout transaction; the pricing rules it applies live in
//! `thrive-core`.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Thrive POS Data Flow                             │
//! │                                                                         │
//! │  axum handler (POST /api/orders)                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     thrive-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ ProductRepo   │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ OfferRepo     │    │ 001_initial_ │  │   │
//! │  │   │ busy_timeout  │    │ OrderRepo ────┼──► │   schema.sql │  │   │
//! │  │   │ WAL           │    │ Dashboard...  │    │              │  │   │
//! │  │   └───────────────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │                                │ thrive_core::pricing          │   │
//! │  └────────────────────────────────┼────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (thrive.db)                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database and checkout error types
//! - [`repository`] - Repository implementations (product, order, etc.)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use thrive_db::{CheckoutSettings, Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("thrive.db")).await?;
//! let settings = db
//!     .settings()
//!     .load_checkout_settings(CheckoutSettings::default())
//!     .await?;
//!
//! let details = db.orders().finalize(&request, &settings, Utc::now()).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{CheckoutError, DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::DateRange;

// Repository re-exports for convenience
pub use repository::combo::ComboRepository;
pub use repository::customer::{CustomerRepository, CustomerSummary};
pub use repository::dashboard::{Dashboard, DashboardFilter, DashboardRepository};
pub use repository::offer::OfferRepository;
pub use repository::order::{
    CheckoutLine, CheckoutRequest, OrderDetails, OrderListFilter, OrderRepository, OrderSummary,
    PricedLine,
};
pub use repository::product::ProductRepository;
pub use repository::report::ReportRepository;
pub use repository::search::{SearchHit, SearchRepository, SEARCH_LIMIT};
pub use repository::settings::{CheckoutSettings, SettingsRepository};
