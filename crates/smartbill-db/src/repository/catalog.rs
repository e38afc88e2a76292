//! # Catalog Repository
//!
//! Menu categories and the items inside them.
//!
//! ```text
//! Beverages ──┬── Filter Coffee   ₹19.00
//!             └── Masala Chai     ₹15.00
//! Tiffin ─────┬── Masala Dosa     ₹45.50
//!             └── Idli (2 pc)     ₹30.00
//! ```
//!
//! Deleting a category deletes its items (`ON DELETE CASCADE`). Bills keep
//! their own frozen copy of each line, so menu edits never touch history.

use chrono::{SubsecRound, Utc};
use smartbill_core::validation::{validate_item_name, validate_unit_price};
use smartbill_core::{CatalogCategory, CatalogItem, Money};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use super::{decode_timestamp, encode_timestamp};
use crate::error::{DbError, DbResult};

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: String,
    account_id: String,
    name: String,
    created_at: String,
}

impl TryFrom<CategoryRow> for CatalogCategory {
    type Error = DbError;

    fn try_from(row: CategoryRow) -> DbResult<Self> {
        Ok(CatalogCategory {
            id: row.id,
            account_id: row.account_id,
            name: row.name,
            created_at: decode_timestamp(&row.created_at)?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    id: String,
    account_id: String,
    category_id: String,
    name: String,
    price_paise: i64,
    created_at: String,
}

impl TryFrom<ItemRow> for CatalogItem {
    type Error = DbError;

    fn try_from(row: ItemRow) -> DbResult<Self> {
        Ok(CatalogItem {
            id: row.id,
            account_id: row.account_id,
            category_id: row.category_id,
            name: row.name,
            price: Money::from_paise(row.price_paise),
            created_at: decode_timestamp(&row.created_at)?,
        })
    }
}

/// Repository for the menu.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// Creates a category.
    ///
    /// ## Errors
    /// - `UniqueViolation` if the account already has a category of that name
    /// - `ForeignKeyViolation` if the account is not provisioned
    pub async fn create_category(&self, account_id: &str, name: &str) -> DbResult<CatalogCategory> {
        validate_item_name(name)?;

        let category = CatalogCategory {
            id: Uuid::new_v4().to_string(),
            account_id: account_id.to_string(),
            name: name.trim().to_string(),
            created_at: Utc::now().trunc_subsecs(6),
        };

        debug!(account_id, name = %category.name, "Creating category");

        sqlx::query(
            r#"
            INSERT INTO catalog_categories (id, account_id, name, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&category.id)
        .bind(&category.account_id)
        .bind(&category.name)
        .bind(encode_timestamp(&category.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("category", &category.name),
            other => other,
        })?;

        Ok(category)
    }

    /// All categories for the account, by name.
    pub async fn list_categories(&self, account_id: &str) -> DbResult<Vec<CatalogCategory>> {
        let rows: Vec<CategoryRow> = sqlx::query_as(
            r#"
            SELECT id, account_id, name, created_at
            FROM catalog_categories
            WHERE account_id = ?1
            ORDER BY name COLLATE NOCASE
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CatalogCategory::try_from).collect()
    }

    /// Deletes a category and every item in it.
    pub async fn delete_category(&self, account_id: &str, category_id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM catalog_categories WHERE account_id = ?1 AND id = ?2")
            .bind(account_id)
            .bind(category_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Category", category_id));
        }

        debug!(account_id, category_id, "Category deleted");
        Ok(())
    }

    // =========================================================================
    // Items
    // =========================================================================

    /// Adds an item to a category.
    pub async fn create_item(
        &self,
        account_id: &str,
        category_id: &str,
        name: &str,
        price: Money,
    ) -> DbResult<CatalogItem> {
        validate_item_name(name)?;
        validate_unit_price(price)?;

        // The category must belong to the same account.
        let owned: Option<String> = sqlx::query_scalar(
            "SELECT id FROM catalog_categories WHERE account_id = ?1 AND id = ?2",
        )
        .bind(account_id)
        .bind(category_id)
        .fetch_optional(&self.pool)
        .await?;
        if owned.is_none() {
            return Err(DbError::not_found("Category", category_id));
        }

        let item = CatalogItem {
            id: Uuid::new_v4().to_string(),
            account_id: account_id.to_string(),
            category_id: category_id.to_string(),
            name: name.trim().to_string(),
            price,
            created_at: Utc::now().trunc_subsecs(6),
        };

        debug!(account_id, category_id, name = %item.name, price = %item.price, "Creating item");

        sqlx::query(
            r#"
            INSERT INTO catalog_items (id, account_id, category_id, name, price_paise, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&item.id)
        .bind(&item.account_id)
        .bind(&item.category_id)
        .bind(&item.name)
        .bind(item.price.paise())
        .bind(encode_timestamp(&item.created_at))
        .execute(&self.pool)
        .await?;

        Ok(item)
    }

    /// Items in one category, by name.
    pub async fn list_items(&self, account_id: &str, category_id: &str) -> DbResult<Vec<CatalogItem>> {
        let rows: Vec<ItemRow> = sqlx::query_as(
            r#"
            SELECT id, account_id, category_id, name, price_paise, created_at
            FROM catalog_items
            WHERE account_id = ?1 AND category_id = ?2
            ORDER BY name COLLATE NOCASE
            "#,
        )
        .bind(account_id)
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CatalogItem::try_from).collect()
    }

    /// Removes one item from the menu.
    pub async fn delete_item(&self, account_id: &str, item_id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM catalog_items WHERE account_id = ?1 AND id = ?2")
            .bind(account_id)
            .bind(item_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Item", item_id));
        }

        Ok(())
    }

    /// Total number of menu items for the account.
    pub async fn count_items(&self, account_id: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM catalog_items WHERE account_id = ?1")
                .bind(account_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
