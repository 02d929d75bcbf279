//! # Offer Repository
//!
//! Offers, their item scope, coupon lookup and the checkout offer list.
//!
//! ## Storage
//! ```text
//! offers                                   offer_items (scope)
//! ┌────────────────────────────────────┐   ┌──────────┬───────────┬─────────┐
//! │ offer_type    percentage|fixed_... │   │ offer_id │ item_type │ item_id │
//! │ discount_value bps | cents         │──►│  ...     │ product   │ latte   │
//! │ apply_to_all  1 → scope ignored    │   │  ...     │ combo     │ brkfst  │
//! │ coupon_code   UNIQUE, uppercase    │   └──────────┴───────────┴─────────┘
//! │ usage_count   ++ only at checkout  │
//! └────────────────────────────────────┘
//! ```
//!
//! ## Availability
//! SQL narrows by `is_active` and the date range; the final time-of-day
//! check is [`Offer::is_available_at`], the same predicate the pricing
//! engine uses, so the checkout list and the preview never disagree.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use thrive_core::drafts::OfferDraft;
use thrive_core::{CatalogItemRef, Discount, ItemType, Money, Offer, OfferType};

const OFFER_COLUMNS: &str = "id, name, description, offer_type, discount_value, apply_to_all, \
     start_date, end_date, start_time, end_time, is_active, coupon_code, usage_limit, \
     usage_count, min_order_cents, max_discount_cents, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct OfferRow {
    id: String,
    name: String,
    description: Option<String>,
    offer_type: OfferType,
    discount_value: i64,
    apply_to_all: bool,
    start_date: NaiveDate,
    end_date: NaiveDate,
    start_time: Option<NaiveTime>,
    end_time: Option<NaiveTime>,
    is_active: bool,
    coupon_code: Option<String>,
    usage_limit: Option<i64>,
    usage_count: i64,
    min_order_cents: Option<i64>,
    max_discount_cents: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OfferRow {
    fn into_offer(self, scope: Vec<CatalogItemRef>) -> Offer {
        Offer {
            id: self.id,
            name: self.name,
            description: self.description,
            discount: Discount::from_stored(self.offer_type, self.discount_value),
            apply_to_all: self.apply_to_all,
            scope,
            start_date: self.start_date,
            end_date: self.end_date,
            start_time: self.start_time,
            end_time: self.end_time,
            is_active: self.is_active,
            coupon_code: self.coupon_code,
            usage_limit: self.usage_limit,
            usage_count: self.usage_count,
            min_order_amount: self.min_order_cents.map(Money::from_cents),
            max_discount_amount: self.max_discount_cents.map(Money::from_cents),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OfferItemRow {
    offer_id: String,
    item_type: ItemType,
    item_id: String,
}

/// Repository for offer database operations.
#[derive(Debug, Clone)]
pub struct OfferRepository {
    pool: SqlitePool,
}

impl OfferRepository {
    /// Creates a new OfferRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OfferRepository { pool }
    }

    /// All offers, newest first.
    pub async fn list(&self) -> DbResult<Vec<Offer>> {
        let sql = format!("SELECT {OFFER_COLUMNS} FROM offers ORDER BY created_at DESC");
        let rows = sqlx::query_as::<_, OfferRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        self.attach_scopes(rows).await
    }

    /// Gets an offer with its scope.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Offer>> {
        let sql = format!("SELECT {OFFER_COLUMNS} FROM offers WHERE id = ?1");
        let row = sqlx::query_as::<_, OfferRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(self.attach_scopes(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Offers by id, in no particular order. Unknown ids are skipped.
    ///
    /// Used by the pricing preview: the cashier's selection is re-read so
    /// a stale UI cannot smuggle in a deactivated offer.
    pub async fn get_many(&self, ids: &[String]) -> DbResult<Vec<Offer>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("SELECT {OFFER_COLUMNS} FROM offers WHERE id IN ({placeholders})");

        let mut query = sqlx::query_as::<_, OfferRow>(&sql);
        for id in ids {
            query = query.bind(id);
        }
        let rows = query.fetch_all(&self.pool).await?;

        self.attach_scopes(rows).await
    }

    /// Looks up an offer by coupon code (case-insensitive), whatever its
    /// state. Availability and usage are judged by the pricing engine.
    pub async fn find_by_coupon_code(&self, code: &str) -> DbResult<Option<Offer>> {
        let code = code.trim().to_ascii_uppercase();
        if code.is_empty() {
            return Ok(None);
        }

        let sql = format!("SELECT {OFFER_COLUMNS} FROM offers WHERE coupon_code = ?1");
        let row = sqlx::query_as::<_, OfferRow>(&sql)
            .bind(&code)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(self.attach_scopes(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Offers available at local time `now`.
    ///
    /// This is the candidate set the billing screen offers the cashier.
    /// Percentage offers come first, largest rate first, then fixed-amount
    /// offers, largest amount first. The two kinds store different units
    /// in `discount_value`, so they are never compared with each other.
    pub async fn checkout_offers(&self, now: NaiveDateTime) -> DbResult<Vec<Offer>> {
        let sql = format!(
            "SELECT {OFFER_COLUMNS} FROM offers \
             WHERE is_active = 1 AND start_date <= ?1 AND end_date >= ?1 \
             ORDER BY CASE offer_type WHEN 'percentage' THEN 0 ELSE 1 END, \
                      discount_value DESC, name"
        );
        let rows = sqlx::query_as::<_, OfferRow>(&sql)
            .bind(now.date())
            .fetch_all(&self.pool)
            .await?;

        let offers: Vec<Offer> = self
            .attach_scopes(rows)
            .await?
            .into_iter()
            .filter(|offer| offer.is_available_at(now))
            .collect();

        debug!(count = offers.len(), now = %now, "Checkout offers");
        Ok(offers)
    }

    /// Creates an offer and its scope in one transaction.
    ///
    /// ## Errors
    /// - Validation failures from [`OfferDraft::validate`]
    /// - `NotFound` when a scoped product/combo doesn't exist
    /// - `UniqueViolation` on `coupon_code`
    pub async fn create(&self, draft: &OfferDraft) -> DbResult<Offer> {
        let mut draft = draft.clone();
        draft.validate()?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        ensure_scope_exists(&mut tx, &draft.scope).await?;

        sqlx::query(
            r#"
            INSERT INTO offers (
                id, name, description, offer_type, discount_value, apply_to_all,
                start_date, end_date, start_time, end_time, is_active,
                coupon_code, usage_limit, usage_count, min_order_cents, max_discount_cents,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, 0, ?14, ?15, ?16, ?16)
            "#,
        )
        .bind(&id)
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(draft.discount.offer_type())
        .bind(draft.discount.stored_value())
        .bind(draft.apply_to_all)
        .bind(draft.start_date)
        .bind(draft.end_date)
        .bind(draft.start_time)
        .bind(draft.end_time)
        .bind(draft.is_active)
        .bind(&draft.coupon_code)
        .bind(draft.usage_limit)
        .bind(draft.min_order_amount.map(|m| m.cents()))
        .bind(draft.max_discount_amount.map(|m| m.cents()))
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| coupon_conflict(e, &draft))?;

        write_scope(&mut tx, &id, &draft.scope).await?;

        tx.commit().await?;

        debug!(id = %id, name = %draft.name, coupon = ?draft.coupon_code, "Created offer");

        self.get_by_id(&id)
            .await?
            .ok_or_else(|| DbError::not_found("Offer", id))
    }

    /// Replaces an offer's fields and scope. Usage count is preserved.
    pub async fn update(&self, id: &str, draft: &OfferDraft) -> DbResult<Offer> {
        let mut draft = draft.clone();
        draft.validate()?;

        let mut tx = self.pool.begin().await?;

        ensure_scope_exists(&mut tx, &draft.scope).await?;

        let result = sqlx::query(
            r#"
            UPDATE offers SET
                name = ?2,
                description = ?3,
                offer_type = ?4,
                discount_value = ?5,
                apply_to_all = ?6,
                start_date = ?7,
                end_date = ?8,
                start_time = ?9,
                end_time = ?10,
                is_active = ?11,
                coupon_code = ?12,
                usage_limit = ?13,
                min_order_cents = ?14,
                max_discount_cents = ?15,
                updated_at = ?16
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(draft.discount.offer_type())
        .bind(draft.discount.stored_value())
        .bind(draft.apply_to_all)
        .bind(draft.start_date)
        .bind(draft.end_date)
        .bind(draft.start_time)
        .bind(draft.end_time)
        .bind(draft.is_active)
        .bind(&draft.coupon_code)
        .bind(draft.usage_limit)
        .bind(draft.min_order_amount.map(|m| m.cents()))
        .bind(draft.max_discount_amount.map(|m| m.cents()))
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(|e| coupon_conflict(e, &draft))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Offer", id));
        }

        sqlx::query("DELETE FROM offer_items WHERE offer_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        write_scope(&mut tx, id, &draft.scope).await?;

        tx.commit().await?;

        debug!(id = %id, "Updated offer");

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Offer", id))
    }

    /// Turns an offer on or off without touching anything else.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE offers SET is_active = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Offer", id));
        }

        debug!(id = %id, active, "Offer toggled");
        Ok(())
    }

    /// Hard-deletes an offer. Scope rows cascade; past orders keep their
    /// totals and lose only the offer link.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM offers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Offer", id));
        }

        debug!(id = %id, "Deleted offer");
        Ok(())
    }

    async fn attach_scopes(&self, rows: Vec<OfferRow>) -> DbResult<Vec<Offer>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let scoped_ids: Vec<&str> = rows
            .iter()
            .filter(|row| !row.apply_to_all)
            .map(|row| row.id.as_str())
            .collect();

        let mut scopes: HashMap<String, Vec<CatalogItemRef>> = HashMap::new();

        if !scoped_ids.is_empty() {
            let placeholders = vec!["?"; scoped_ids.len()].join(", ");
            let sql = format!(
                "SELECT offer_id, item_type, item_id FROM offer_items \
                 WHERE offer_id IN ({placeholders}) ORDER BY item_type, item_id"
            );

            let mut query = sqlx::query_as::<_, OfferItemRow>(&sql);
            for id in &scoped_ids {
                query = query.bind(*id);
            }

            for item in query.fetch_all(&self.pool).await? {
                scopes
                    .entry(item.offer_id)
                    .or_default()
                    .push(CatalogItemRef::new(item.item_type, item.item_id));
            }
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let scope = scopes.remove(&row.id).unwrap_or_default();
                row.into_offer(scope)
            })
            .collect())
    }
}

fn coupon_conflict(err: sqlx::Error, draft: &OfferDraft) -> DbError {
    match DbError::from(err) {
        err if err.is_unique_violation_on("offers.coupon_code") => {
            DbError::duplicate("coupon_code", draft.coupon_code.clone().unwrap_or_default())
        }
        err => err,
    }
}

async fn ensure_scope_exists(conn: &mut SqliteConnection, scope: &[CatalogItemRef]) -> DbResult<()> {
    for item in scope {
        let sql = match item {
            CatalogItemRef::Product(_) => "SELECT COUNT(*) FROM products WHERE id = ?1",
            CatalogItemRef::Combo(_) => "SELECT COUNT(*) FROM combos WHERE id = ?1",
        };
        let found: i64 = sqlx::query_scalar(sql)
            .bind(item.id())
            .fetch_one(&mut *conn)
            .await?;

        if found == 0 {
            let entity = match item.item_type() {
                ItemType::Product => "Product",
                ItemType::Combo => "Combo",
            };
            return Err(DbError::not_found(entity, item.id()));
        }
    }
    Ok(())
}

async fn write_scope(conn: &mut SqliteConnection, offer_id: &str, scope: &[CatalogItemRef]) -> DbResult<()> {
    for item in scope {
        sqlx::query("INSERT INTO offer_items (offer_id, item_type, item_id) VALUES (?1, ?2, ?3)")
            .bind(offer_id)
            .bind(item.item_type())
            .bind(item.id())
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
