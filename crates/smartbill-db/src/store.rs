//! # Bill Store
//!
//! The transactional contract behind a bill commit, and its SQLite
//! implementation.
//!
//! ## One Commit Attempt
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │   │                                                                     │
//! │   ├─ 1. INSERT counters row ON CONFLICT DO NOTHING                      │
//! │   │      └── first statement is a write: takes the database write lock │
//! │   │          now, so concurrent commits queue on busy_timeout instead  │
//! │   │          of racing on a stale read                                 │
//! │   ├─ 2. shop exists?                 no ──► NotFound (rollback)         │
//! │   ├─ 3. submission id seen before?   yes ─► return that bill (rollback) │
//! │   ├─ 4. SELECT counters              ◄── authoritative read            │
//! │   ├─ 5. request.settle(counters)     ◄── pure, smartbill-core           │
//! │   ├─ 6. INSERT bill                                                     │
//! │   ├─ 7. UPDATE counters                                                 │
//! │   │                                                                     │
//! │  COMMIT ── both rows land, or neither does                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any error before COMMIT drops the transaction, which rolls it back. An
//! attempt has no side effects outside the transaction, so the allocator can
//! run it again after a conflict.

use std::future::Future;

use chrono::{SubsecRound, Utc};
use smartbill_core::{Bill, CommitRequest, SequenceCounters};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::bill::find_by_submission;
use crate::repository::counters::CountersRow;
use crate::repository::{encode_day, encode_timestamp};

/// What a successful attempt produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// A new bill was written and the counters advanced.
    Created(Bill),
    /// The submission id was already committed; nothing was written.
    Replayed(Bill),
}

impl CommitOutcome {
    pub fn bill(&self) -> &Bill {
        match self {
            CommitOutcome::Created(bill) | CommitOutcome::Replayed(bill) => bill,
        }
    }

    pub fn into_bill(self) -> Bill {
        match self {
            CommitOutcome::Created(bill) | CommitOutcome::Replayed(bill) => bill,
        }
    }

    pub fn is_replay(&self) -> bool {
        matches!(self, CommitOutcome::Replayed(_))
    }
}

/// A store that can commit a bill and its counter update atomically.
///
/// ## Contract
/// - One call is one transaction attempt: either the bill and the new
///   counters are both durable, or nothing changed.
/// - The counters used to number the bill are read inside that same
///   transaction.
/// - Losing to a concurrent writer is reported as an error for which
///   [`DbError::is_conflict`] is true; the caller decides whether to retry.
/// - An attempt never logs and never touches state outside the store.
pub trait BillStore: Send + Sync {
    fn try_commit(
        &self,
        request: &CommitRequest,
    ) -> impl Future<Output = DbResult<CommitOutcome>> + Send;
}

/// [`BillStore`] over the SQLite pool.
#[derive(Debug, Clone)]
pub struct SqliteBillStore {
    pool: SqlitePool,
}

impl SqliteBillStore {
    pub fn new(pool: SqlitePool) -> Self {
        SqliteBillStore { pool }
    }

    async fn commit_once(&self, request: &CommitRequest) -> DbResult<CommitOutcome> {
        let account_id = request.account_id();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO sequence_counters (account_id, total_bills, daily_token, last_bill_date)
            VALUES (?1, 0, 0, NULL)
            ON CONFLICT (account_id) DO NOTHING
            "#,
        )
        .bind(account_id)
        .execute(&mut *tx)
        .await?;

        let shop: Option<String> =
            sqlx::query_scalar("SELECT account_id FROM shops WHERE account_id = ?1")
                .bind(account_id)
                .fetch_optional(&mut *tx)
                .await?;
        if shop.is_none() {
            return Err(DbError::not_found("Shop", account_id));
        }

        if let Some(submission_id) = request.submission_id() {
            if let Some(existing) = find_by_submission(&mut *tx, account_id, submission_id).await? {
                tx.rollback().await?;
                return Ok(CommitOutcome::Replayed(existing));
            }
        }

        let counters: SequenceCounters = sqlx::query_as::<_, CountersRow>(
            r#"
            SELECT total_bills, daily_token, last_bill_date
            FROM sequence_counters
            WHERE account_id = ?1
            "#,
        )
        .bind(account_id)
        .fetch_one(&mut *tx)
        .await?
        .try_into()?;

        // Stored timestamps carry microseconds; truncate so the returned
        // bill equals the one read back later.
        let settlement = request.settle(
            &counters,
            Uuid::new_v4().to_string(),
            Utc::now().trunc_subsecs(6),
        );
        let bill = settlement.bill;

        sqlx::query(
            r#"
            INSERT INTO bills (
                id, account_id, bill_no, token_no, items,
                sub_total_paise, grand_total_paise, round_off_paise, total_qty,
                payment_mode, shop_name, bill_date, created_at, submission_id
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8, ?9,
                ?10, ?11, ?12, ?13, ?14
            )
            "#,
        )
        .bind(&bill.id)
        .bind(&bill.account_id)
        .bind(bill.bill_no)
        .bind(bill.token_no)
        .bind(serde_json::to_string(&bill.items)?)
        .bind(bill.sub_total.paise())
        .bind(bill.grand_total.paise())
        .bind(bill.round_off.paise())
        .bind(bill.total_qty)
        .bind(bill.payment_mode)
        .bind(&bill.shop_name)
        .bind(encode_day(bill.bill_date))
        .bind(encode_timestamp(&bill.timestamp))
        .bind(&bill.submission_id)
        .execute(&mut *tx)
        .await?;

        let next = settlement.counters;
        sqlx::query(
            r#"
            UPDATE sequence_counters
            SET total_bills = ?2, daily_token = ?3, last_bill_date = ?4
            WHERE account_id = ?1
            "#,
        )
        .bind(account_id)
        .bind(next.total_bills)
        .bind(next.daily_token)
        .bind(next.last_bill_date.map(encode_day))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(CommitOutcome::Created(bill))
    }
}

impl BillStore for SqliteBillStore {
    fn try_commit(
        &self,
        request: &CommitRequest,
    ) -> impl Future<Output = DbResult<CommitOutcome>> + Send {
        self.commit_once(request)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
