//! # Shop Repository
//!
//! Account provisioning and shop profile lookups.
//!
//! Provisioning writes the shop row and the account's zeroed sequence
//! counters in one transaction, so every provisioned account starts at
//! `{ total_bills: 0, daily_token: 0, last_bill_date: none }`.

use chrono::{SubsecRound, Utc};
use smartbill_core::validation::{
    normalize_phone, validate_account_id, validate_owner_name, validate_shop_name,
};
use smartbill_core::{ShopMeta, ShopProfile};
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::{decode_timestamp, encode_timestamp};
use crate::error::{DbError, DbResult};

#[derive(Debug, sqlx::FromRow)]
struct ShopRow {
    account_id: String,
    shop_name: String,
    owner_name: String,
    phone: String,
    created_at: String,
}

impl TryFrom<ShopRow> for ShopProfile {
    type Error = DbError;

    fn try_from(row: ShopRow) -> DbResult<Self> {
        Ok(ShopProfile {
            account_id: row.account_id,
            shop_name: row.shop_name,
            owner_name: row.owner_name,
            phone: row.phone,
            created_at: decode_timestamp(&row.created_at)?,
        })
    }
}

/// Repository for shop profiles.
#[derive(Debug, Clone)]
pub struct ShopRepository {
    pool: SqlitePool,
}

impl ShopRepository {
    /// Creates a new ShopRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ShopRepository { pool }
    }

    /// Creates the shop profile for a new account.
    ///
    /// ## Errors
    /// - `Validation` for a bad name or a phone with fewer than 10 digits
    /// - `UniqueViolation` if the account is already provisioned
    pub async fn provision(
        &self,
        account_id: &str,
        shop_name: &str,
        owner_name: &str,
        phone: &str,
    ) -> DbResult<ShopProfile> {
        validate_account_id(account_id)?;
        validate_shop_name(shop_name)?;
        validate_owner_name(owner_name)?;
        let phone = normalize_phone(phone)?;

        let profile = ShopProfile {
            account_id: account_id.to_string(),
            shop_name: shop_name.trim().to_string(),
            owner_name: owner_name.trim().to_string(),
            phone,
            created_at: Utc::now().trunc_subsecs(6),
        };

        debug!(account_id = %profile.account_id, "Provisioning shop");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO shops (account_id, shop_name, owner_name, phone, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&profile.account_id)
        .bind(&profile.shop_name)
        .bind(&profile.owner_name)
        .bind(&profile.phone)
        .bind(encode_timestamp(&profile.created_at))
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("account", account_id),
            other => other,
        })?;

        sqlx::query(
            r#"
            INSERT INTO sequence_counters (account_id, total_bills, daily_token, last_bill_date)
            VALUES (?1, 0, 0, NULL)
            ON CONFLICT (account_id) DO NOTHING
            "#,
        )
        .bind(&profile.account_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(account_id = %profile.account_id, shop_name = %profile.shop_name, "Shop provisioned");
        Ok(profile)
    }

    /// Gets a shop profile, if the account exists.
    pub async fn find(&self, account_id: &str) -> DbResult<Option<ShopProfile>> {
        let row: Option<ShopRow> = sqlx::query_as(
            r#"
            SELECT account_id, shop_name, owner_name, phone, created_at
            FROM shops
            WHERE account_id = ?1
            "#,
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ShopProfile::try_from).transpose()
    }

    /// Gets a shop profile.
    ///
    /// ## Errors
    /// `NotFound` for an unknown account.
    pub async fn get(&self, account_id: &str) -> DbResult<ShopProfile> {
        self.find(account_id)
            .await?
            .ok_or_else(|| DbError::not_found("Shop", account_id))
    }

    /// The metadata stamped onto the account's bills.
    pub async fn meta(&self, account_id: &str) -> DbResult<ShopMeta> {
        let profile = self.get(account_id).await?;
        Ok(ShopMeta::from(&profile))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::memory_db;
    use smartbill_core::{SequenceCounters, ValidationError};

    #[tokio::test]
    async fn test_provision_and_get() {
        let db = memory_db().await;
        let created = db
            .shops()
            .provision("acct-1", " Sri Krishna Tiffins ", "Ravi Kumar", "+91 98765-43210")
            .await
            .unwrap();

        assert_eq!(created.shop_name, "Sri Krishna Tiffins");
        assert_eq!(created.phone, "919876543210");

        let loaded = db.shops().get("acct-1").await.unwrap();
        assert_eq!(loaded.account_id, "acct-1");
        assert_eq!(loaded.owner_name, "Ravi Kumar");

        let meta = db.shops().meta("acct-1").await.unwrap();
        assert_eq!(meta.shop_name, "Sri Krishna Tiffins");
    }

    #[tokio::test]
    async fn test_provision_initialises_counters() {
        let db = memory_db().await;
        db.shops()
            .provision("acct-1", "Tiffins", "Ravi", "9876543210")
            .await
            .unwrap();

        let counters = db.counters().snapshot("acct-1").await.unwrap();
        assert_eq!(counters, SequenceCounters::default());

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sequence_counters")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn test_provision_twice_is_duplicate() {
        let db = memory_db().await;
        let shops = db.shops();
        shops.provision("acct-1", "Tiffins", "Ravi", "9876543210").await.unwrap();

        let err = shops
            .provision("acct-1", "Tiffins", "Ravi", "9876543210")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_provision_rejects_short_phone() {
        let db = memory_db().await;
        let err = db
            .shops()
            .provision("acct-1", "Tiffins", "Ravi", "12345")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Validation(ValidationError::TooShort { .. })
        ));
        assert!(db.shops().find("acct-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_account_not_found() {
        let db = memory_db().await;
        let err = db.shops().get("ghost").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
