//! # smartbill-db: Database Layer for SmartBilling
//!
//! SQLite storage for shops, menus, and bills, plus the sequence allocator
//! that turns a cart into a numbered bill.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       SmartBilling Data Flow                            │
//! │                                                                         │
//! │  Counter device (cart built with smartbill-core)                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   smartbill-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌────────────────┐   ┌───────────────┐   ┌───────────────┐   │   │
//! │  │   │ SequenceAlloc. │   │ Repositories  │   │  Migrations   │   │   │
//! │  │   │ (allocator.rs) │   │               │   │  (embedded)   │   │   │
//! │  │   │  retry loop    │   │ ShopRepo      │   │ 001_initial   │   │   │
//! │  │   │      │         │   │ BillRepo      │   │               │   │   │
//! │  │   │      ▼         │   │ CounterRepo   │   └───────────────┘   │   │
//! │  │   │ SqliteBillStore│   │ CatalogRepo   │                       │   │
//! │  │   │  (store.rs)    │   │               │                       │   │
//! │  │   └───────┬────────┘   └──────┬────────┘                       │   │
//! │  │           └──────── Database (pool.rs) ───────┘                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL) ── smartbill.db                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Shops, bills, counters, and the menu
//! - [`store`] - The atomic commit transaction
//! - [`allocator`] - Retry loop around the store
//! - [`config`] - TOML + environment configuration
//!
//! ## Usage
//!
//! ```rust,ignore
//! use smartbill_db::{BillingConfig, Database};
//!
//! let config = BillingConfig::load(None)?;
//! let db = Database::new(config.database.to_db_config()).await?;
//!
//! let shop = db.shops().meta("acct-1").await?;
//! let bill = db
//!     .allocator(config.retry_policy())
//!     .commit_cart(cart.snapshot(), PaymentMode::Cash, shop, today)
//!     .await?;
//! ```

use tracing_subscriber::EnvFilter;

// =============================================================================
// Module Declarations
// =============================================================================

pub mod allocator;
pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod store;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use allocator::{RetryPolicy, SequenceAllocator};
pub use config::{BillingConfig, ConfigError};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use store::{BillStore, CommitOutcome, SqliteBillStore};

// Repository re-exports for convenience
pub use repository::bill::BillRepository;
pub use repository::catalog::CatalogRepository;
pub use repository::counters::CounterRepository;
pub use repository::shop::ShopRepository;

/// Initializes the tracing subscriber for structured logging.
///
/// `RUST_LOG` takes precedence over `default_filter`. Safe to call more than
/// once; only the first call installs a subscriber.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{default_filter},sqlx=warn")));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
