//! # Customer Repository
//!
//! Customers are identified by mobile number. The till only ever
//! *upserts* them as part of checkout; there is no separate sign-up.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use thrive_core::validation::validate_mobile;
use thrive_core::{Customer, Money};

/// A customer with lifetime order stats, for the customers screen.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CustomerSummary {
    pub id: String,
    pub name: Option<String>,
    pub mobile: String,
    pub total_orders: i64,
    pub total_spent_cents: i64,
    pub last_order_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl CustomerSummary {
    pub fn total_spent(&self) -> Money {
        Money::from_cents(self.total_spent_cents)
    }
}

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Customers with order counts and spend, most recent buyers first.
    pub async fn list(&self) -> DbResult<Vec<CustomerSummary>> {
        let customers = sqlx::query_as::<_, CustomerSummary>(
            r#"
            SELECT
                c.id,
                c.name,
                c.mobile,
                COUNT(o.id) AS total_orders,
                COALESCE(SUM(o.final_amount_cents), 0) AS total_spent_cents,
                MAX(o.created_at) AS last_order_at,
                c.created_at
            FROM customers c
            LEFT JOIN orders o ON o.customer_id = c.id
            GROUP BY c.id
            ORDER BY last_order_at DESC, c.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            "SELECT id, name, mobile, created_at, updated_at FROM customers WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    pub async fn get_by_mobile(&self, mobile: &str) -> DbResult<Option<Customer>> {
        let mobile = validate_mobile(mobile).map_err(thrive_core::CoreError::from)?;

        let customer = sqlx::query_as::<_, Customer>(
            "SELECT id, name, mobile, created_at, updated_at FROM customers WHERE mobile = ?1",
        )
        .bind(&mobile)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Inserts or refreshes a customer keyed by mobile, on the caller's
    /// connection (normally the checkout transaction).
    ///
    /// ## Behaviour
    /// ```text
    /// mobile unknown            → insert (name may be NULL)
    /// mobile known, name given  → name replaced
    /// mobile known, no name     → name kept
    /// ```
    /// A single `INSERT .. ON CONFLICT(mobile) DO UPDATE .. RETURNING`
    /// statement, so two tills registering the same mobile at once both
    /// end up with the same row.
    ///
    /// `mobile` must already be normalized by
    /// [`validate_mobile`](thrive_core::validation::validate_mobile).
    pub async fn upsert_by_mobile(
        conn: &mut SqliteConnection,
        name: Option<&str>,
        mobile: &str,
    ) -> DbResult<Customer> {
        let name = name.map(str::trim).filter(|n| !n.is_empty());
        let now = Utc::now();

        let customer = sqlx::query_as::<_, Customer>(
            r#"
            INSERT INTO customers (id, name, mobile, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            ON CONFLICT (mobile) DO UPDATE SET
                name = COALESCE(excluded.name, customers.name),
                updated_at = excluded.updated_at
            RETURNING id, name, mobile, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(name)
        .bind(mobile)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

        debug!(id = %customer.id, "Customer upserted");
        Ok(customer)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
