//! # Counter Repository
//!
//! Advisory reads of an account's sequence counters.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CounterRepository (this file)        SqliteBillStore (crate::store)    │
//! │  ─────────────────────────────        ──────────────────────────────    │
//! │  plain SELECT on the pool             read inside the write txn         │
//! │  feeds PreviewEstimator               feeds CommitRequest::settle       │
//! │  never writes                         the only writer of the row        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use smartbill_core::{BillPreview, PreviewEstimator, SequenceCounters};
use sqlx::SqlitePool;
use tracing::debug;

use super::decode_day;
use crate::error::{DbError, DbResult};

/// Raw `sequence_counters` row.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct CountersRow {
    pub total_bills: i64,
    pub daily_token: i64,
    pub last_bill_date: Option<String>,
}

impl TryFrom<CountersRow> for SequenceCounters {
    type Error = DbError;

    fn try_from(row: CountersRow) -> DbResult<Self> {
        if row.total_bills < 0 || row.daily_token < 0 {
            return Err(DbError::Serialization(format!(
                "negative sequence counters ({}, {})",
                row.total_bills, row.daily_token
            )));
        }

        Ok(SequenceCounters {
            total_bills: row.total_bills,
            daily_token: row.daily_token,
            last_bill_date: row.last_bill_date.as_deref().map(decode_day).transpose()?,
        })
    }
}

/// Repository for advisory counter reads.
#[derive(Debug, Clone)]
pub struct CounterRepository {
    pool: SqlitePool,
}

impl CounterRepository {
    /// Creates a new CounterRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CounterRepository { pool }
    }

    /// Reads the counters outside any transaction.
    ///
    /// An account with no counters row reads as `{0, 0, none}`. The result
    /// may be stale as soon as it returns.
    pub async fn snapshot(&self, account_id: &str) -> DbResult<SequenceCounters> {
        let row: Option<CountersRow> = sqlx::query_as(
            r#"
            SELECT total_bills, daily_token, last_bill_date
            FROM sequence_counters
            WHERE account_id = ?1
            "#,
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(SequenceCounters::try_from)
            .transpose()
            .map(Option::unwrap_or_default)
    }

    /// Next bill and token numbers for the review screen.
    pub async fn preview(&self, account_id: &str, today: NaiveDate) -> DbResult<BillPreview> {
        let counters = self.snapshot(account_id).await?;
        let preview = PreviewEstimator::estimate(&counters, today);

        debug!(
            account_id,
            next_bill_no = preview.next_bill_no,
            next_token_no = preview.next_token_no,
            "Preview estimated"
        );
        Ok(preview)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{day, memory_db, provision};

    #[tokio::test]
    async fn test_snapshot_of_unknown_account_is_zero() {
        let db = memory_db().await;
        let counters = db.counters().snapshot("nobody").await.unwrap();
        assert_eq!(counters, SequenceCounters::default());

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sequence_counters")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(rows, 0);
    }

    #[tokio::test]
    async fn test_preview_reads_committed_counters() {
        let db = memory_db().await;
        provision(&db, "acct-1").await;

        sqlx::query(
            "UPDATE sequence_counters SET total_bills = 7, daily_token = 3, last_bill_date = '2024-05-01' WHERE account_id = 'acct-1'",
        )
        .execute(db.pool())
        .await
        .unwrap();

        let same_day = db.counters().preview("acct-1", day("2024-05-01")).await.unwrap();
        assert_eq!((same_day.next_bill_no, same_day.next_token_no), (8, 4));

        let next_day = db.counters().preview("acct-1", day("2024-05-02")).await.unwrap();
        assert_eq!((next_day.next_bill_no, next_day.next_token_no), (8, 1));

        // Previewing never reserves anything.
        let counters = db.counters().snapshot("acct-1").await.unwrap();
        assert_eq!(counters.total_bills, 7);
    }

    #[test]
    fn test_negative_row_rejected() {
        let row = CountersRow {
            total_bills: -1,
            daily_token: 0,
            last_bill_date: None,
        };
        assert!(SequenceCounters::try_from(row).is_err());
    }
}
