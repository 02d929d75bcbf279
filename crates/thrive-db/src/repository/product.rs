//! # Product Repository
//!
//! Database operations for menu products.
//!
//! ## Key Operations
//! - CRUD with validated [`ProductDraft`]s
//! - SKU generation for products entered without one
//! - Soft delete (order history keeps pointing at the row)
//!
//! ## SKU Generation
//! ```text
//! "Cold Coffee" ──► sku_stem() ──► "CCCOLD" ──► + rand(100..=999) ──► "CCCOLD417"
//!                                                      │
//!                               UNIQUE clash? ─────────┘ retry (bounded)
//! ```

use chrono::Utc;
use rand::Rng;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use thrive_core::drafts::{sku_stem, ProductDraft};
use thrive_core::Product;

const PRODUCT_COLUMNS: &str = "id, sku, name, description, category, price_cents, \
     making_cost_cents, stock_quantity, min_stock_level, image_url, is_active, \
     created_at, updated_at";

/// Generated SKUs collide only on the 3-digit suffix; a few retries is plenty.
const SKU_ATTEMPTS: u32 = 5;

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
///
/// let menu = repo.list(true).await?;
/// let product = repo.get_by_id("uuid-here").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists products ordered by name.
    ///
    /// ## Arguments
    /// * `active_only` - Hide soft-deleted products (the billing menu)
    pub async fn list(&self, active_only: bool) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE (?1 = 0 OR is_active = 1) \
             ORDER BY name COLLATE NOCASE"
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(active_only)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), active_only, "Listed products");
        Ok(products)
    }

    /// Gets a product by its ID, active or not.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Inserts a product.
    ///
    /// ## Rules
    /// - `draft` is validated here, so callers may pass raw input
    /// - Missing SKU is generated; an explicit duplicate SKU is a
    ///   `UniqueViolation` on `sku`
    pub async fn create(&self, draft: &ProductDraft) -> DbResult<Product> {
        let mut draft = draft.clone();
        draft.validate()?;

        let mut attempt = 0;
        loop {
            attempt += 1;

            let sku = draft
                .sku
                .clone()
                .unwrap_or_else(|| generate_sku(&draft.name));
            let now = Utc::now();

            let product = Product {
                id: generate_product_id(),
                sku: sku.clone(),
                name: draft.name.clone(),
                description: draft.description.clone(),
                category: draft.category.clone(),
                price_cents: draft.price.cents(),
                making_cost_cents: draft.making_cost.cents(),
                stock_quantity: draft.stock_quantity,
                min_stock_level: draft.min_stock_level,
                image_url: draft.image_url.clone(),
                is_active: draft.is_active,
                created_at: now,
                updated_at: now,
            };

            match self.insert(&product).await {
                Ok(()) => {
                    debug!(id = %product.id, sku = %product.sku, "Created product");
                    return Ok(product);
                }
                Err(err) if err.is_unique_violation_on("products.sku") => {
                    if draft.sku.is_some() || attempt >= SKU_ATTEMPTS {
                        return Err(DbError::duplicate("sku", sku));
                    }
                    debug!(sku = %sku, attempt, "Generated SKU taken, retrying");
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn insert(&self, product: &Product) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, name, description, category,
                price_cents, making_cost_cents, stock_quantity, min_stock_level,
                image_url, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.category)
        .bind(product.price_cents)
        .bind(product.making_cost_cents)
        .bind(product.stock_quantity)
        .bind(product.min_stock_level)
        .bind(&product.image_url)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Replaces a product's editable fields.
    ///
    /// A draft without SKU keeps the current one. Combos containing the
    /// product get their cached making cost recomputed in the same
    /// transaction.
    pub async fn update(&self, id: &str, draft: &ProductDraft) -> DbResult<Product> {
        let mut draft = draft.clone();
        draft.validate()?;

        debug!(id = %id, "Updating product");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE products SET
                sku = COALESCE(?2, sku),
                name = ?3,
                description = ?4,
                category = ?5,
                price_cents = ?6,
                making_cost_cents = ?7,
                stock_quantity = ?8,
                min_stock_level = ?9,
                image_url = ?10,
                is_active = ?11,
                updated_at = ?12
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&draft.sku)
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(&draft.category)
        .bind(draft.price.cents())
        .bind(draft.making_cost.cents())
        .bind(draft.stock_quantity)
        .bind(draft.min_stock_level)
        .bind(&draft.image_url)
        .bind(draft.is_active)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            err if err.is_unique_violation_on("products.sku") => {
                DbError::duplicate("sku", draft.sku.clone().unwrap_or_default())
            }
            err => err,
        })?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        let refreshed = sqlx::query(
            r#"
            UPDATE combos SET
                making_cost_cents = (
                    SELECT COALESCE(SUM(p.making_cost_cents), 0)
                    FROM combo_items ci
                    JOIN products p ON p.id = ci.product_id
                    WHERE ci.combo_id = combos.id
                ),
                updated_at = ?2
            WHERE id IN (SELECT combo_id FROM combo_items WHERE product_id = ?1)
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        if refreshed.rows_affected() > 0 {
            debug!(id = %id, combos = refreshed.rows_affected(), "Recomputed combo making costs");
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Soft-deletes a product by setting is_active = false.
    ///
    /// Order items and combos still reference the row, so it is never
    /// physically removed.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let result = sqlx::query("UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts active products (for the health route).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

/// `CC` + first four letters of the name + a random `100..=999`.
pub fn generate_sku(name: &str) -> String {
    let suffix: u16 = rand::thread_rng().gen_range(100..=999);
    format!("{}{}", sku_stem(name), suffix)
}

// =============================================================================
// Unit Tests
// =============================================================================
