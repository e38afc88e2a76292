//! # Preview Estimator
//!
//! Advisory projection of the next bill and token numbers, shown on the
//! review screen before the cashier confirms.
//!
//! ## Advisory, Not Authoritative
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   PREVIEW PATH (this module)          COMMIT PATH (sequencing)          │
//! │   ──────────────────────────          ────────────────────────          │
//! │   counters read OUTSIDE a txn         counters read INSIDE the txn      │
//! │   result: BillPreview                 result: Bill                      │
//! │   nothing reserved                    numbers are final                 │
//! │   may be stale by the time            written together with the         │
//! │   the user taps Confirm               counter update                    │
//! │                                                                         │
//! │   Device A previews #8 ──┐                                              │
//! │   Device B previews #8 ──┼──► both commit ──► #8 and #9                 │
//! │                          │    (the store decides, not the preview)      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! UI contract: refetch the estimate whenever the review view regains
//! focus, and never write it back anywhere.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::SequenceCounters;

/// Provisional numbers for display only.
///
/// Nothing on the commit path accepts a `BillPreview`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BillPreview {
    pub next_bill_no: i64,
    pub next_token_no: i64,
    #[ts(as = "String")]
    pub as_of: NaiveDate,
}

/// Stateless estimator over a counters snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreviewEstimator;

impl PreviewEstimator {
    /// Projects the next numbers from a snapshot read.
    ///
    /// ## Example
    /// ```rust
    /// use chrono::NaiveDate;
    /// use smartbill_core::preview::PreviewEstimator;
    /// use smartbill_core::SequenceCounters;
    ///
    /// let may_1 = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    /// let counters = SequenceCounters { total_bills: 7, daily_token: 3, last_bill_date: Some(may_1) };
    ///
    /// let preview = PreviewEstimator::estimate(&counters, may_1);
    /// assert_eq!((preview.next_bill_no, preview.next_token_no), (8, 4));
    /// ```
    pub fn estimate(counters: &SequenceCounters, today: NaiveDate) -> BillPreview {
        BillPreview {
            next_bill_no: counters.bill_no_after(),
            next_token_no: counters.token_no_after(today),
            as_of: today,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: &str) -> NaiveDate {
        d.parse().unwrap()
    }

    #[test]
    fn test_fresh_account_previews_one_one() {
        let preview = PreviewEstimator::estimate(&SequenceCounters::default(), day("2024-05-01"));
        assert_eq!(preview.next_bill_no, 1);
        assert_eq!(preview.next_token_no, 1);
    }

    #[test]
    fn test_same_day_and_next_day() {
        let counters = SequenceCounters {
            total_bills: 7,
            daily_token: 3,
            last_bill_date: Some(day("2024-05-01")),
        };

        let same_day = PreviewEstimator::estimate(&counters, day("2024-05-01"));
        assert_eq!((same_day.next_bill_no, same_day.next_token_no), (8, 4));

        let next_day = PreviewEstimator::estimate(&counters, day("2024-05-02"));
        assert_eq!((next_day.next_bill_no, next_day.next_token_no), (8, 1));
        assert_eq!(next_day.as_of, day("2024-05-02"));
    }
}
