//! # Sequence Allocator
//!
//! Drives a bill commit to completion: validates, runs store attempts, and
//! retries on write contention up to a bound.
//!
//! ## Commit Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  commit_cart(lines, mode, shop, today)                                  │
//! │       │                                                                 │
//! │       ├── CommitRequest::new ── invalid? ──► Validation (store untouched)│
//! │       ▼                                                                 │
//! │  commit_bill(request)                                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌──────────────────────┐                                               │
//! │  │ store.try_commit()   │── Ok ────────────────────────► Bill           │
//! │  └──────────┬───────────┘                                               │
//! │             │ conflict                                                  │
//! │             ▼                                                           │
//! │     attempt < max? ── yes ──► sleep(backoff) ──► try_commit again       │
//! │             │                 (fresh transaction, fresh counters)       │
//! │             no                                                          │
//! │             ▼                                                           │
//! │     CommitConflict { attempts }                                         │
//! │                                                                         │
//! │  other store errors ──► StorageUnavailable / NotFound (no retry)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The allocator spawns nothing. Dropping the future mid-attempt drops the
//! open transaction, which rolls back.

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use chrono::NaiveDate;
use smartbill_core::{
    Bill, BillingError, BillingResult, CartItem, CommitRequest, PaymentMode, ShopMeta,
};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::store::{BillStore, CommitOutcome};

// =============================================================================
// Retry Policy
// =============================================================================

/// How many times to attempt a commit, and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. At least 1.
    pub max_attempts: u32,
    /// Wait after the first conflict; roughly doubles after each further
    /// one, with jitter so competing devices spread out.
    pub initial_backoff: Duration,
    /// Ceiling for the wait.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(20),
            max_backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Creates the exponential backoff for one commit.
    ///
    /// The attempt count bounds the loop, so the backoff itself never
    /// gives up.
    pub fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.initial_backoff,
            initial_interval: self.initial_backoff,
            max_interval: self.max_backoff,
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

// =============================================================================
// Sequence Allocator
// =============================================================================

/// Assigns final bill and token numbers by committing through a
/// [`BillStore`].
#[derive(Debug, Clone)]
pub struct SequenceAllocator<S> {
    store: S,
    policy: RetryPolicy,
}

impl<S: BillStore> SequenceAllocator<S> {
    pub fn new(store: S, policy: RetryPolicy) -> Self {
        SequenceAllocator { store, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Validates a cart snapshot and commits it.
    ///
    /// ## Errors
    /// `Validation` for an empty cart or bad input, before any transaction
    /// starts. Otherwise as [`SequenceAllocator::commit_bill`].
    pub async fn commit_cart(
        &self,
        cart_snapshot: Vec<CartItem>,
        payment_mode: PaymentMode,
        shop: ShopMeta,
        today: NaiveDate,
    ) -> BillingResult<Bill> {
        let request = CommitRequest::new(cart_snapshot, payment_mode, shop, today)?;
        self.commit_bill(&request).await
    }

    /// Commits a validated request, retrying on conflict.
    ///
    /// ## Returns
    /// The committed bill. For a request whose submission id was already
    /// committed, the existing bill.
    ///
    /// ## Errors
    /// - `NotFound` if the account has no shop profile
    /// - `CommitConflict` after `max_attempts` conflicting attempts
    /// - `StorageUnavailable` for any other store failure
    pub async fn commit_bill(&self, request: &CommitRequest) -> BillingResult<Bill> {
        let max_attempts = self.policy.max_attempts.max(1);
        let account_id = request.account_id();
        let mut attempt: u32 = 0;
        let mut backoff = self.policy.create_backoff();

        loop {
            attempt += 1;

            match self.store.try_commit(request).await {
                Ok(CommitOutcome::Created(bill)) => {
                    info!(
                        account_id,
                        bill_no = bill.bill_no,
                        token_no = bill.token_no,
                        grand_total = %bill.grand_total,
                        attempt,
                        "Bill committed"
                    );
                    return Ok(bill);
                }
                Ok(CommitOutcome::Replayed(bill)) => {
                    info!(
                        account_id,
                        bill_no = bill.bill_no,
                        submission_id = bill.submission_id.as_deref().unwrap_or_default(),
                        "Submission already committed, returning existing bill"
                    );
                    return Ok(bill);
                }
                Err(err) if err.is_conflict() => {
                    if attempt >= max_attempts {
                        warn!(account_id, attempts = attempt, error = %err, "Commit kept conflicting, giving up");
                        return Err(BillingError::CommitConflict { attempts: attempt });
                    }

                    let delay = backoff.next_backoff().unwrap_or(self.policy.max_backoff);
                    debug!(account_id, attempt, ?delay, error = %err, "Commit conflicted, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    warn!(account_id, attempt, error = %err, "Commit failed");
                    return Err(err.into());
                }
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DbError, DbResult};
    use crate::testing::{day, file_db, lines, memory_db, provision, request, shop};
    use smartbill_core::{SequenceCounters, ValidationError};
    use std::collections::BTreeSet;
    use std::future::Future;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    /// Store double: conflicts `conflicts` times, then settles against its
    /// own counters.
    struct ScriptedStore {
        conflicts: u32,
        calls: AtomicU32,
        counters: Mutex<SequenceCounters>,
        fail_with: Option<fn() -> DbError>,
    }

    impl ScriptedStore {
        fn conflicting(conflicts: u32) -> Self {
            ScriptedStore {
                conflicts,
                calls: AtomicU32::new(0),
                counters: Mutex::new(SequenceCounters::default()),
                fail_with: None,
            }
        }

        fn failing(fail_with: fn() -> DbError) -> Self {
            ScriptedStore {
                fail_with: Some(fail_with),
                ..ScriptedStore::conflicting(0)
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl BillStore for ScriptedStore {
        fn try_commit(
            &self,
            request: &CommitRequest,
        ) -> impl Future<Output = DbResult<CommitOutcome>> + Send {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            let result = if let Some(fail) = self.fail_with {
                Err(fail())
            } else if call <= self.conflicts {
                // A competing writer lands a bill before this attempt commits.
                let mut counters = self.counters.lock().unwrap();
                counters.total_bills += 1;
                Err(DbError::Busy("database is locked".to_string()))
            } else {
                let mut counters = self.counters.lock().unwrap();
                let settlement = request.settle(&counters, format!("bill-{call}"), chrono::Utc::now());
                *counters = settlement.counters;
                Ok(CommitOutcome::Created(settlement.bill))
            };
            async move { result }
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
        }
    }

    #[test]
    fn test_backoff_grows_to_ceiling_and_never_ends() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_backoff: Duration::from_millis(20),
            max_backoff: Duration::from_millis(100),
        };
        let mut backoff = policy.create_backoff();

        // Default jitter is +/-50% around the current interval.
        let first = backoff.next_backoff().unwrap();
        assert!(first >= Duration::from_millis(9) && first <= Duration::from_millis(31));

        for _ in 0..40 {
            let delay = backoff.next_backoff().unwrap();
            assert!(delay <= Duration::from_millis(151));
        }
    }

    #[tokio::test]
    async fn test_conflict_retried_from_fresh_read() {
        let allocator = SequenceAllocator::new(ScriptedStore::conflicting(2), fast_policy(5));

        let bill = allocator.commit_bill(&request("acct-1", "2024-05-01")).await.unwrap();

        assert_eq!(allocator.store.calls(), 3);
        // Two competing bills landed first, so this one is number 3.
        assert_eq!(bill.bill_no, 3);
    }

    #[tokio::test]
    async fn test_conflict_bound_surfaces_commit_conflict() {
        let allocator = SequenceAllocator::new(ScriptedStore::conflicting(u32::MAX), fast_policy(4));

        let err = allocator
            .commit_bill(&request("acct-1", "2024-05-01"))
            .await
            .unwrap_err();

        assert_eq!(err, BillingError::CommitConflict { attempts: 4 });
        assert!(err.is_retryable());
        assert_eq!(allocator.store.calls(), 4);
    }

    #[tokio::test]
    async fn test_non_conflict_errors_not_retried() {
        let unavailable = SequenceAllocator::new(
            ScriptedStore::failing(|| DbError::ConnectionFailed("disk I/O error".into())),
            fast_policy(5),
        );
        let err = unavailable
            .commit_bill(&request("acct-1", "2024-05-01"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "STORAGE_UNAVAILABLE");
        assert_eq!(unavailable.store.calls(), 1);

        let missing = SequenceAllocator::new(
            ScriptedStore::failing(|| DbError::not_found("Shop", "acct-1")),
            fast_policy(5),
        );
        let err = missing
            .commit_bill(&request("acct-1", "2024-05-01"))
            .await
            .unwrap_err();
        assert_eq!(err, BillingError::not_found("Shop", "acct-1"));
        assert_eq!(missing.store.calls(), 1);
    }

    #[tokio::test]
    async fn test_validation_never_reaches_store() {
        let allocator = SequenceAllocator::new(ScriptedStore::conflicting(0), fast_policy(5));

        let err = allocator
            .commit_cart(vec![], PaymentMode::Cash, shop("acct-1"), day("2024-05-01"))
            .await
            .unwrap_err();
        assert_eq!(err, BillingError::Validation(ValidationError::EmptyCart));

        let mut bad = lines();
        bad[0].quantity = 0;
        let err = allocator
            .commit_cart(bad, PaymentMode::Cash, shop("acct-1"), day("2024-05-01"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");

        assert_eq!(allocator.store.calls(), 0);
    }

    #[tokio::test]
    async fn test_sequential_commits_and_day_rollover() {
        let db = memory_db().await;
        provision(&db, "acct-1").await;
        let allocator = db.allocator(RetryPolicy::default());

        let numbers = |bill: Bill| (bill.bill_no, bill.token_no);

        let b1 = allocator.commit_bill(&request("acct-1", "2024-05-01")).await.unwrap();
        let b2 = allocator.commit_bill(&request("acct-1", "2024-05-01")).await.unwrap();
        let b3 = allocator.commit_bill(&request("acct-1", "2024-05-02")).await.unwrap();
        let b4 = allocator.commit_bill(&request("acct-1", "2024-05-02")).await.unwrap();

        assert_eq!(numbers(b1), (1, 1));
        assert_eq!(numbers(b2), (2, 2));
        assert_eq!(numbers(b3), (3, 1));
        assert_eq!(numbers(b4), (4, 2));
    }

    #[tokio::test]
    async fn test_day_moving_backwards_restarts_token() {
        let db = memory_db().await;
        provision(&db, "acct-1").await;
        let allocator = db.allocator(fast_policy(3));

        let b1 = allocator.commit_bill(&request("acct-1", "2024-05-01")).await.unwrap();
        let b2 = allocator.commit_bill(&request("acct-1", "2024-05-02")).await.unwrap();
        // A device whose clock is still on the previous day.
        let b3 = allocator.commit_bill(&request("acct-1", "2024-05-01")).await.unwrap();

        assert_eq!((b1.bill_no, b1.token_no), (1, 1));
        assert_eq!((b2.bill_no, b2.token_no), (2, 1));
        assert_eq!((b3.bill_no, b3.token_no), (3, 1));

        let summary = db.bills().day_summary("acct-1", day("2024-05-01")).await.unwrap();
        assert_eq!(summary.bill_count, 2);
    }

    /// Counts calls to a real store.
    struct CountingStore<S> {
        inner: S,
        calls: AtomicU32,
    }

    impl<S: BillStore> BillStore for CountingStore<S> {
        fn try_commit(
            &self,
            request: &CommitRequest,
        ) -> impl Future<Output = DbResult<CommitOutcome>> + Send {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.try_commit(request)
        }
    }

    #[tokio::test]
    async fn test_duplicate_bill_number_is_not_retried() {
        let db = memory_db().await;
        provision(&db, "acct-1").await;
        db.allocator(fast_policy(5))
            .commit_bill(&request("acct-1", "2024-05-01"))
            .await
            .unwrap();

        // Counters rewound behind the stored bills.
        sqlx::query("UPDATE sequence_counters SET total_bills = 0 WHERE account_id = 'acct-1'")
            .execute(db.pool())
            .await
            .unwrap();

        let allocator = SequenceAllocator::new(
            CountingStore {
                inner: db.bill_store(),
                calls: AtomicU32::new(0),
            },
            fast_policy(5),
        );
        let err = allocator
            .commit_bill(&request("acct-1", "2024-05-01"))
            .await
            .unwrap_err();

        assert_eq!(err.code(), "STORAGE_UNAVAILABLE");
        assert_eq!(allocator.store.calls.load(Ordering::SeqCst), 1);
        assert_eq!(db.bills().count("acct-1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_accounts_are_independent() {
        let db = memory_db().await;
        provision(&db, "acct-1").await;
        provision(&db, "acct-2").await;
        let allocator = db.allocator(RetryPolicy::default());

        allocator.commit_bill(&request("acct-1", "2024-05-01")).await.unwrap();
        allocator.commit_bill(&request("acct-1", "2024-05-01")).await.unwrap();
        let other = allocator.commit_bill(&request("acct-2", "2024-05-01")).await.unwrap();

        assert_eq!((other.bill_no, other.token_no), (1, 1));
    }

    #[tokio::test]
    async fn test_commit_for_unknown_account_is_not_found() {
        let db = memory_db().await;
        let err = db
            .allocator(RetryPolicy::default())
            .commit_bill(&request("ghost", "2024-05-01"))
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::NotFound { .. }));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_idempotent_resubmission() {
        let db = memory_db().await;
        provision(&db, "acct-1").await;
        let allocator = db.allocator(RetryPolicy::default());

        let req = request("acct-1", "2024-05-01")
            .with_submission_id(uuid::Uuid::new_v4().to_string())
            .unwrap();

        let first = allocator.commit_bill(&req).await.unwrap();
        let again = allocator.commit_bill(&req).await.unwrap();
        assert_eq!(first, again);

        let next = allocator.commit_bill(&request("acct-1", "2024-05-01")).await.unwrap();
        assert_eq!(next.bill_no, 2);
    }

    #[tokio::test]
    async fn test_preview_then_commit_diverge_under_contention() {
        let db = memory_db().await;
        provision(&db, "acct-1").await;
        let allocator = db.allocator(RetryPolicy::default());

        let device_a = db.counters().preview("acct-1", day("2024-05-01")).await.unwrap();
        let device_b = db.counters().preview("acct-1", day("2024-05-01")).await.unwrap();
        assert_eq!(device_a, device_b);
        assert_eq!(device_a.next_bill_no, 1);

        let a = allocator.commit_bill(&request("acct-1", "2024-05-01")).await.unwrap();
        let b = allocator.commit_bill(&request("acct-1", "2024-05-01")).await.unwrap();
        assert_eq!((a.bill_no, b.bill_no), (1, 2));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_commits_are_gapless() {
        const N: usize = 20;

        let temp = file_db(4).await;
        provision(&temp.db, "acct-1").await;
        let allocator = Arc::new(temp.db.allocator(RetryPolicy {
            max_attempts: 20,
            ..RetryPolicy::default()
        }));

        let handles: Vec<_> = (0..N)
            .map(|_| {
                let allocator = Arc::clone(&allocator);
                tokio::spawn(async move {
                    allocator.commit_bill(&request("acct-1", "2024-05-01")).await
                })
            })
            .collect();

        let mut bill_numbers = BTreeSet::new();
        let mut tokens = BTreeSet::new();
        for handle in handles {
            let bill = handle.await.unwrap().unwrap();
            bill_numbers.insert(bill.bill_no);
            tokens.insert(bill.token_no);
        }

        let expected: BTreeSet<i64> = (1..=N as i64).collect();
        assert_eq!(bill_numbers, expected);
        assert_eq!(tokens, expected);

        let counters = temp.db.counters().snapshot("acct-1").await.unwrap();
        assert_eq!(counters.total_bills, N as i64);
        assert_eq!(counters.daily_token, N as i64);
        assert_eq!(temp.db.bills().count("acct-1").await.unwrap(), N as i64);
    }
}
