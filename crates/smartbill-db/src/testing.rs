//! Shared fixtures for this crate's unit tests.

use chrono::NaiveDate;
use smartbill_core::{CartItem, CommitRequest, Money, PaymentMode, ShopMeta};
use std::time::Duration;
use tempfile::TempDir;

use crate::pool::{Database, DbConfig};

pub(crate) const SHOP_NAME: &str = "Sri Krishna Tiffins";

pub(crate) fn day(raw: &str) -> NaiveDate {
    raw.parse().unwrap()
}

pub(crate) async fn memory_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

/// A file-backed WAL database with several pooled connections.
///
/// The database, `-wal` and `-shm` files live in a temp directory removed
/// when the returned [`TempDb`] drops.
pub(crate) async fn file_db(max_connections: u32) -> TempDb {
    let dir = TempDir::new().unwrap();
    let db = Database::new(
        DbConfig::new(dir.path().join("smartbill.db"))
            .max_connections(max_connections)
            .busy_timeout(Duration::from_secs(10)),
    )
    .await
    .unwrap();
    TempDb { db, _dir: dir }
}

pub(crate) struct TempDb {
    pub db: Database,
    _dir: TempDir,
}

pub(crate) async fn provision(db: &Database, account_id: &str) {
    db.shops()
        .provision(account_id, SHOP_NAME, "Ravi Kumar", "98765 43210")
        .await
        .unwrap();
}

pub(crate) fn shop(account_id: &str) -> ShopMeta {
    ShopMeta {
        account_id: account_id.to_string(),
        shop_name: SHOP_NAME.to_string(),
    }
}

pub(crate) fn lines() -> Vec<CartItem> {
    vec![
        CartItem {
            id: "dosa".to_string(),
            name: "Masala Dosa".to_string(),
            unit_price: Money::from_paise(4550),
            quantity: 2,
        },
        CartItem {
            id: "coffee".to_string(),
            name: "Filter Coffee".to_string(),
            unit_price: Money::from_paise(1900),
            quantity: 1,
        },
    ]
}

pub(crate) fn request(account_id: &str, today: &str) -> CommitRequest {
    CommitRequest::new(lines(), PaymentMode::Cash, shop(account_id), day(today)).unwrap()
}
