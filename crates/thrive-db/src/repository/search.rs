//! # Search Repository
//!
//! Menu search for the billing screen's search box.
//!
//! ```text
//! "lat"  ──►  products ∪ combos (active, name LIKE %lat%)
//!               │
//!               ▼  ORDER BY prefix match first, then name
//!             [ Latte, Latte Combo, Chocolate Latte, ... ]  (≤ 15)
//! ```

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use thrive_core::validation::validate_search_query;
use thrive_core::{CoreError, ItemType};

/// Default and maximum number of hits.
pub const SEARCH_LIMIT: i64 = 15;

/// One search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct SearchHit {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    /// Selling price in minor units.
    pub price: i64,
}

/// Repository for catalog search.
#[derive(Debug, Clone)]
pub struct SearchRepository {
    pool: SqlitePool,
}

impl SearchRepository {
    /// Creates a new SearchRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SearchRepository { pool }
    }

    /// Case-insensitive substring search over active products and combos.
    ///
    /// Queries shorter than two characters return nothing rather than
    /// the whole menu; queries over 100 characters are rejected.
    pub async fn search(&self, query: &str, limit: i64) -> DbResult<Vec<SearchHit>> {
        let Some(query) = validate_search_query(query).map_err(CoreError::from)? else {
            return Ok(Vec::new());
        };

        let escaped = escape_like(&query.to_lowercase());
        let contains = format!("%{escaped}%");
        let prefix = format!("{escaped}%");

        let hits = sqlx::query_as::<_, SearchHit>(
            r#"
            SELECT id, name, item_type, price FROM (
                SELECT id, name, 'product' AS item_type, price_cents AS price
                FROM products
                WHERE is_active = 1 AND LOWER(name) LIKE ?1 ESCAPE '\'
                UNION ALL
                SELECT id, name, 'combo' AS item_type, price_cents AS price
                FROM combos
                WHERE is_active = 1 AND LOWER(name) LIKE ?1 ESCAPE '\'
            )
            ORDER BY CASE WHEN LOWER(name) LIKE ?2 ESCAPE '\' THEN 0 ELSE 1 END,
                     name COLLATE NOCASE
            LIMIT ?3
            "#,
        )
        .bind(&contains)
        .bind(&prefix)
        .bind(limit.clamp(1, SEARCH_LIMIT))
        .fetch_all(&self.pool)
        .await?;

        debug!(query = %query, hits = hits.len(), "Catalog search");
        Ok(hits)
    }
}

/// Escapes LIKE wildcards so `50%` matches literally.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{combo_draft, product_draft, test_db};

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("latte"), "latte");
    }

    #[tokio::test]
    async fn test_prefix_matches_rank_first() {
        let db = test_db().await;
        let latte = db.products().create(&product_draft("Latte", 15000, 1500)).await.unwrap();
        db.products()
            .create(&product_draft("Iced Latte", 17000, 1800))
            .await
            .unwrap();
        db.products().create(&product_draft("Espresso", 9000, 900)).await.unwrap();
        db.combos()
            .create(&combo_draft("Latte Breakfast", 25000, vec![latte.id.clone()]))
            .await
            .unwrap();

        let hits = db.search().search("LAT", SEARCH_LIMIT).await.unwrap();
        let names: Vec<&str> = hits.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, vec!["Latte", "Latte Breakfast", "Iced Latte"]);
        assert_eq!(hits[1].item_type, ItemType::Combo);
        assert_eq!(hits[0].price, 15000);
    }

    #[tokio::test]
    async fn test_short_query_and_inactive_items() {
        let db = test_db().await;
        let mocha = db.products().create(&product_draft("Mocha", 16000, 1600)).await.unwrap();

        assert!(db.search().search(" m ", SEARCH_LIMIT).await.unwrap().is_empty());
        assert_eq!(db.search().search("mo", SEARCH_LIMIT).await.unwrap().len(), 1);

        db.products().soft_delete(&mocha.id).await.unwrap();
        assert!(db.search().search("mocha", SEARCH_LIMIT).await.unwrap().is_empty());
    }
}
