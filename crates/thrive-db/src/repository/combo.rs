//! # Combo Repository
//!
//! Combos are fixed-price bundles of products. Their making cost is the
//! sum of the component products' making costs, computed and cached in
//! the same transaction that writes `combo_items`.
//!
//! ```text
//! combos                       combo_items (ordered)         products
//! ┌──────────────┐            ┌─────────┬─────┬────────┐    ┌────────┬──────┐
//! │ Breakfast    │───────────►│ combo   │ pos │ product│───►│ Latte  │15.00 │
//! │ price 200.00 │            │ combo   │  1  │ Latte  │    │ Toast  │20.00 │
//! │ making 35.00 │ = Σ cost   │ combo   │  2  │ Toast  │    └────────┴──────┘
//! └──────────────┘            └─────────┴─────┴────────┘
//! ```

use std::collections::HashMap;

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use thrive_core::drafts::ComboDraft;
use thrive_core::{Combo, Money};

const COMBO_COLUMNS: &str =
    "id, name, description, price_cents, making_cost_cents, is_active, created_at, updated_at";

/// Repository for combo database operations.
#[derive(Debug, Clone)]
pub struct ComboRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct ComboItemRow {
    combo_id: String,
    product_id: String,
}

impl ComboRepository {
    /// Creates a new ComboRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ComboRepository { pool }
    }

    /// Lists combos with their product ids, ordered by name.
    pub async fn list(&self, active_only: bool) -> DbResult<Vec<Combo>> {
        let sql = format!(
            "SELECT {COMBO_COLUMNS} FROM combos \
             WHERE (?1 = 0 OR is_active = 1) \
             ORDER BY name COLLATE NOCASE"
        );

        let mut combos = sqlx::query_as::<_, Combo>(&sql)
            .bind(active_only)
            .fetch_all(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, ComboItemRow>(
            "SELECT combo_id, product_id FROM combo_items ORDER BY combo_id, position",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut by_combo: HashMap<String, Vec<String>> = HashMap::new();
        for row in rows {
            by_combo.entry(row.combo_id).or_default().push(row.product_id);
        }

        for combo in &mut combos {
            combo.product_ids = by_combo.remove(&combo.id).unwrap_or_default();
        }

        debug!(count = combos.len(), active_only, "Listed combos");
        Ok(combos)
    }

    /// Gets a combo with its product ids.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Combo>> {
        let sql = format!("SELECT {COMBO_COLUMNS} FROM combos WHERE id = ?1");

        let combo = sqlx::query_as::<_, Combo>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(mut combo) = combo else {
            return Ok(None);
        };

        combo.product_ids = sqlx::query_scalar(
            "SELECT product_id FROM combo_items WHERE combo_id = ?1 ORDER BY position",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(combo))
    }

    /// Creates a combo.
    ///
    /// ## What This Does (one transaction)
    /// 1. Validates the draft
    /// 2. Sums the making cost of every listed product (unknown id → NotFound)
    /// 3. Inserts the combo and its ordered `combo_items`
    pub async fn create(&self, draft: &ComboDraft) -> DbResult<Combo> {
        let mut draft = draft.clone();
        draft.validate()?;

        let mut tx = self.pool.begin().await?;

        let making_cost = component_making_cost(&mut tx, &draft.product_ids).await?;
        let now = Utc::now();

        let combo = Combo {
            id: Uuid::new_v4().to_string(),
            name: draft.name,
            description: draft.description,
            price_cents: draft.price.cents(),
            making_cost_cents: making_cost.cents(),
            is_active: draft.is_active,
            product_ids: draft.product_ids,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO combos (
                id, name, description, price_cents, making_cost_cents,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&combo.id)
        .bind(&combo.name)
        .bind(&combo.description)
        .bind(combo.price_cents)
        .bind(combo.making_cost_cents)
        .bind(combo.is_active)
        .bind(combo.created_at)
        .bind(combo.updated_at)
        .execute(&mut *tx)
        .await?;

        write_items(&mut tx, &combo.id, &combo.product_ids).await?;

        tx.commit().await?;

        debug!(
            id = %combo.id,
            products = combo.product_ids.len(),
            making_cost = %combo.making_cost(),
            "Created combo"
        );
        Ok(combo)
    }

    /// Replaces a combo's fields and product list, recomputing the making
    /// cost in the same transaction.
    pub async fn update(&self, id: &str, draft: &ComboDraft) -> DbResult<Combo> {
        let mut draft = draft.clone();
        draft.validate()?;

        let mut tx = self.pool.begin().await?;

        let making_cost = component_making_cost(&mut tx, &draft.product_ids).await?;

        let result = sqlx::query(
            r#"
            UPDATE combos SET
                name = ?2,
                description = ?3,
                price_cents = ?4,
                making_cost_cents = ?5,
                is_active = ?6,
                updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(draft.price.cents())
        .bind(making_cost.cents())
        .bind(draft.is_active)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Combo", id));
        }

        sqlx::query("DELETE FROM combo_items WHERE combo_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        write_items(&mut tx, id, &draft.product_ids).await?;

        tx.commit().await?;

        debug!(id = %id, making_cost = %making_cost, "Updated combo");

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Combo", id))
    }

    /// Soft-deletes a combo.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting combo");

        let result = sqlx::query("UPDATE combos SET is_active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Combo", id));
        }

        Ok(())
    }
}

/// Σ making cost of the listed products; duplicates count once per listing.
async fn component_making_cost(
    conn: &mut SqliteConnection,
    product_ids: &[String],
) -> DbResult<Money> {
    let mut costs = Vec::with_capacity(product_ids.len());

    for product_id in product_ids {
        let cost: Option<i64> =
            sqlx::query_scalar("SELECT making_cost_cents FROM products WHERE id = ?1")
                .bind(product_id)
                .fetch_optional(&mut *conn)
                .await?;

        match cost {
            Some(cents) => costs.push(Money::from_cents(cents)),
            None => return Err(DbError::not_found("Product", product_id)),
        }
    }

    Ok(Combo::aggregate_making_cost(costs))
}

async fn write_items(
    conn: &mut SqliteConnection,
    combo_id: &str,
    product_ids: &[String],
) -> DbResult<()> {
    for (position, product_id) in product_ids.iter().enumerate() {
        sqlx::query("INSERT INTO combo_items (combo_id, position, product_id) VALUES (?1, ?2, ?3)")
            .bind(combo_id)
            .bind(position as i64 + 1)
            .bind(product_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
