//! # Bill Repository
//!
//! Read-only access to committed bills.
//!
//! ## Bill Storage
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        bills table                                      │
//! │                                                                         │
//! │  id | account_id | bill_no | token_no | items (JSON) | ... | created_at │
//! │  ───┼────────────┼─────────┼──────────┼──────────────┼─────┼─────────── │
//! │  u1 | acct-1     |    7    |    3     | [{"id":..}]  | ... | 2024-05-01 │
//! │  u2 | acct-1     |    8    |    4     | [{"id":..}]  | ... | 2024-05-01 │
//! │                                                                         │
//! │  UNIQUE (account_id, bill_no)                                          │
//! │  INDEX  (account_id, bill_date)          tokens may repeat across days │
//! │  UPDATE / DELETE rejected by trigger                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rows are written only by [`crate::store::SqliteBillStore`].

use chrono::NaiveDate;
use smartbill_core::{Bill, CartItem, DaySummary, Money, PaymentMode};
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use super::{decode_day, decode_timestamp, encode_day};
use crate::error::{DbError, DbResult};

/// Column list matching [`BillRow`].
pub(crate) const BILL_COLUMNS: &str = "id, account_id, bill_no, token_no, items, \
     sub_total_paise, grand_total_paise, round_off_paise, total_qty, payment_mode, \
     shop_name, bill_date, created_at, submission_id";

/// Upper bound for `list_recent`.
pub const MAX_PAGE_SIZE: u32 = 500;

/// Raw `bills` row.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct BillRow {
    id: String,
    account_id: String,
    bill_no: i64,
    token_no: i64,
    items: String,
    sub_total_paise: i64,
    grand_total_paise: i64,
    round_off_paise: i64,
    total_qty: i64,
    payment_mode: PaymentMode,
    shop_name: String,
    bill_date: String,
    created_at: String,
    submission_id: Option<String>,
}

impl TryFrom<BillRow> for Bill {
    type Error = DbError;

    fn try_from(row: BillRow) -> DbResult<Self> {
        let items: Vec<CartItem> = serde_json::from_str(&row.items)?;

        Ok(Bill {
            id: row.id,
            account_id: row.account_id,
            bill_no: row.bill_no,
            token_no: row.token_no,
            items,
            sub_total: Money::from_paise(row.sub_total_paise),
            grand_total: Money::from_paise(row.grand_total_paise),
            round_off: Money::from_paise(row.round_off_paise),
            total_qty: row.total_qty,
            payment_mode: row.payment_mode,
            shop_name: row.shop_name,
            bill_date: decode_day(&row.bill_date)?,
            timestamp: decode_timestamp(&row.created_at)?,
            submission_id: row.submission_id,
        })
    }
}

/// Looks up a bill by its client submission id on any executor (pool or
/// open transaction).
pub(crate) async fn find_by_submission<'e, E>(
    executor: E,
    account_id: &str,
    submission_id: &str,
) -> DbResult<Option<Bill>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {BILL_COLUMNS} FROM bills WHERE account_id = ?1 AND submission_id = ?2"
    );
    let row: Option<BillRow> = sqlx::query_as(&sql)
        .bind(account_id)
        .bind(submission_id)
        .fetch_optional(executor)
        .await?;

    row.map(Bill::try_from).transpose()
}

#[derive(Debug, sqlx::FromRow)]
struct DaySummaryRow {
    bill_count: i64,
    total_qty: i64,
    grand_total: i64,
    cash_total: i64,
    online_total: i64,
}

/// Repository for reading committed bills.
#[derive(Debug, Clone)]
pub struct BillRepository {
    pool: SqlitePool,
}

impl BillRepository {
    /// Creates a new BillRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BillRepository { pool }
    }

    /// Most recent bills first (highest bill number first).
    ///
    /// `limit` is clamped to `1..=MAX_PAGE_SIZE`.
    pub async fn list_recent(&self, account_id: &str, limit: u32) -> DbResult<Vec<Bill>> {
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        debug!(account_id, limit, "Listing recent bills");

        let sql = format!(
            "SELECT {BILL_COLUMNS} FROM bills WHERE account_id = ?1 ORDER BY bill_no DESC LIMIT ?2"
        );
        let rows: Vec<BillRow> = sqlx::query_as(&sql)
            .bind(account_id)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Bill::try_from).collect()
    }

    /// Gets a bill by id.
    ///
    /// ## Errors
    /// `NotFound` if the bill doesn't exist for this account.
    pub async fn get(&self, account_id: &str, id: &str) -> DbResult<Bill> {
        let sql = format!("SELECT {BILL_COLUMNS} FROM bills WHERE account_id = ?1 AND id = ?2");
        let row: Option<BillRow> = sqlx::query_as(&sql)
            .bind(account_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.ok_or_else(|| DbError::not_found("Bill", id))?.try_into()
    }

    /// Gets a bill by its lifetime number.
    pub async fn get_by_number(&self, account_id: &str, bill_no: i64) -> DbResult<Bill> {
        let sql =
            format!("SELECT {BILL_COLUMNS} FROM bills WHERE account_id = ?1 AND bill_no = ?2");
        let row: Option<BillRow> = sqlx::query_as(&sql)
            .bind(account_id)
            .bind(bill_no)
            .fetch_optional(&self.pool)
            .await?;

        row.ok_or_else(|| DbError::not_found("Bill", format!("#{bill_no}")))?
            .try_into()
    }

    /// Gets the bill written for a client submission id, if any.
    pub async fn find_by_submission(
        &self,
        account_id: &str,
        submission_id: &str,
    ) -> DbResult<Option<Bill>> {
        find_by_submission(&self.pool, account_id, submission_id).await
    }

    /// Number of bills ever committed for the account.
    pub async fn count(&self, account_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bills WHERE account_id = ?1")
            .bind(account_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Totals for one calendar day, split by payment mode.
    pub async fn day_summary(&self, account_id: &str, day: NaiveDate) -> DbResult<DaySummary> {
        let row: DaySummaryRow = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) AS bill_count,
                COALESCE(SUM(total_qty), 0) AS total_qty,
                COALESCE(SUM(grand_total_paise), 0) AS grand_total,
                COALESCE(SUM(CASE WHEN payment_mode = 'cash' THEN grand_total_paise ELSE 0 END), 0) AS cash_total,
                COALESCE(SUM(CASE WHEN payment_mode = 'online' THEN grand_total_paise ELSE 0 END), 0) AS online_total
            FROM bills
            WHERE account_id = ?1 AND bill_date = ?2
            "#,
        )
        .bind(account_id)
        .bind(encode_day(day))
        .fetch_one(&self.pool)
        .await?;

        Ok(DaySummary {
            day,
            bill_count: row.bill_count,
            total_qty: row.total_qty,
            grand_total: Money::from_paise(row.grand_total),
            cash_total: Money::from_paise(row.cash_total),
            online_total: Money::from_paise(row.online_total),
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::RetryPolicy;
    use crate::testing::{day, lines, memory_db, provision, request, shop};
    use smartbill_core::CommitRequest;

    #[tokio::test]
    async fn test_history_reads() {
        let db = memory_db().await;
        provision(&db, "acct-1").await;
        let allocator = db.allocator(RetryPolicy::default());

        let first = allocator.commit_bill(&request("acct-1", "2024-05-01")).await.unwrap();
        let second = allocator.commit_bill(&request("acct-1", "2024-05-01")).await.unwrap();

        let bills = db.bills();
        assert_eq!(bills.count("acct-1").await.unwrap(), 2);

        let recent = bills.list_recent("acct-1", 10).await.unwrap();
        assert_eq!(recent.iter().map(|b| b.bill_no).collect::<Vec<_>>(), vec![2, 1]);
        assert_eq!(recent[1], first);

        assert_eq!(bills.get("acct-1", &second.id).await.unwrap(), second);
        assert_eq!(bills.get_by_number("acct-1", 1).await.unwrap(), first);

        assert!(matches!(
            bills.get("acct-1", "missing").await,
            Err(DbError::NotFound { .. })
        ));
        assert!(matches!(
            bills.get_by_number("other", 1).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_day_summary_splits_payment_modes() {
        let db = memory_db().await;
        provision(&db, "acct-1").await;
        let allocator = db.allocator(RetryPolicy::default());

        allocator.commit_bill(&request("acct-1", "2024-05-01")).await.unwrap();
        let online = CommitRequest::new(lines(), PaymentMode::Online, shop("acct-1"), day("2024-05-01"))
            .unwrap();
        allocator.commit_bill(&online).await.unwrap();
        allocator.commit_bill(&request("acct-1", "2024-05-02")).await.unwrap();

        let summary = db.bills().day_summary("acct-1", day("2024-05-01")).await.unwrap();
        assert_eq!(summary.bill_count, 2);
        assert_eq!(summary.total_qty, 6);
        assert_eq!(summary.grand_total.paise(), 22000);
        assert_eq!(summary.cash_total.paise(), 11000);
        assert_eq!(summary.online_total.paise(), 11000);

        let empty = db.bills().day_summary("acct-1", day("2024-04-30")).await.unwrap();
        assert_eq!(empty.bill_count, 0);
        assert!(empty.grand_total.is_zero());
    }

    #[tokio::test]
    async fn test_bills_are_immutable() {
        let db = memory_db().await;
        provision(&db, "acct-1").await;
        let bill = db
            .allocator(RetryPolicy::default())
            .commit_bill(&request("acct-1", "2024-05-01"))
            .await
            .unwrap();

        let update = sqlx::query("UPDATE bills SET grand_total_paise = 0 WHERE id = ?1")
            .bind(&bill.id)
            .execute(db.pool())
            .await;
        assert!(update.is_err());

        let delete = sqlx::query("DELETE FROM bills WHERE id = ?1")
            .bind(&bill.id)
            .execute(db.pool())
            .await;
        assert!(delete.is_err());

        assert_eq!(db.bills().get("acct-1", &bill.id).await.unwrap(), bill);
    }
}
