//! # thrive-core: Pure Business Logic for Thrive POS
//!
//! Everything a café till needs to price a bill, with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Thrive POS Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Billing UI (browser)                         │   │
//! │  │    Menu grid ──► Bill ──► Offers/Quick 10% ──► Checkout         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ HTTP/JSON                              │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    pos-api (axum)                               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ thrive-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  pricing  │  │ validation│  │   │
//! │  │   │  Offer    │  │   Money   │  │ CartLine  │  │   rules   │  │   │
//! │  │   │  Combo    │  │  Percent  │  │ Totals    │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    thrive-db (Database Layer)                   │   │
//! │  │          SQLite repositories, checkout transaction              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Combo, Offer, Order, ...)
//! - [`drafts`] - Unsaved catalog/offer payloads with validation
//! - [`money`] - Integer minor-unit money
//! - [`pricing`] - Cart totals, offer discounts, checkout totals
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation

// =============================================================================
// Module Declarations
// =============================================================================

pub mod drafts;
pub mod error;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use pricing::{CartLine, CartTotals, OrderTotals};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Largest selling price or offer amount accepted (10,000,000.00).
///
/// With `MAX_CART_ITEMS` and `MAX_ITEM_QUANTITY` this bounds every cart
/// sum far below `i64::MAX`.
pub const MAX_PRICE: Money = Money::from_cents(1_000_000_000);

/// Maximum lines in a single bill.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity on a single line.
///
/// ## Business Reason
/// Catches fat-fingered quantities (1000 instead of 10) at the till.
pub const MAX_ITEM_QUANTITY: i64 = 999;
