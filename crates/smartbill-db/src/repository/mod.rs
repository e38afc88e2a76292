//! # Repository Module
//!
//! Database repository implementations for SmartBilling.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Caller                                                                │
//! │       │                                                                 │
//! │       │  db.bills().list_recent("acct-1", 20)                          │
//! │       ▼                                                                 │
//! │  BillRepository                                                        │
//! │  ├── list_recent(&self, account, limit)                                │
//! │  ├── get(&self, account, id)                                           │
//! │  └── day_summary(&self, account, day)                                  │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Writes to bills and sequence_counters happen ONLY in the commit       │
//! │  transaction (crate::store). Repositories never write them.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`shop::ShopRepository`] - Account provisioning and shop profiles
//! - [`bill::BillRepository`] - Read-only bill history
//! - [`counters::CounterRepository`] - Advisory counter snapshots
//! - [`catalog::CatalogRepository`] - Menu categories and items

pub mod bill;
pub mod catalog;
pub mod counters;
pub mod shop;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

use crate::error::{DbError, DbResult};

/// Calendar-day column format.
pub(crate) const DAY_FORMAT: &str = "%Y-%m-%d";

/// Timestamps are stored as RFC 3339 UTC with microsecond precision so
/// they sort lexically.
pub(crate) fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn decode_timestamp(raw: &str) -> DbResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| DbError::Serialization(format!("invalid timestamp '{raw}': {e}")))
}

pub(crate) fn encode_day(day: NaiveDate) -> String {
    day.format(DAY_FORMAT).to_string()
}

pub(crate) fn decode_day(raw: &str) -> DbResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, DAY_FORMAT)
        .map_err(|e| DbError::Serialization(format!("invalid day '{raw}': {e}")))
}
