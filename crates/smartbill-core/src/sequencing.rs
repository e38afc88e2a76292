//! # Sequencing
//!
//! The pure body of a bill commit: given the counters read inside the
//! store's transaction, decide the next numbers and build the bill.
//!
//! ## Commit Body
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    ONE ATOMIC TRANSACTION (store side)                  │
//! │                                                                         │
//! │  1. counters = read SequenceCounters          ◄── fresh, in-txn read    │
//! │                                                                         │
//! │  2. settle(counters)  ◄── THIS MODULE (pure, no side effects)           │
//! │     ├── bill_no  = counters.total_bills + 1                             │
//! │     ├── token_no = counters.last_bill_date == today                     │
//! │     │                 ? counters.daily_token + 1 : 1                    │
//! │     ├── totals   = Σ lines, round to whole rupee                        │
//! │     └── Settlement { bill, counters' }                                  │
//! │                                                                         │
//! │  3. write bill + write counters'                                        │
//! │                                                                         │
//! │  4. COMMIT ── conflict? ──► store discards 1-3, runs them again         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Because step 2 is a pure function of its inputs, re-running it after a
//! conflict is always safe.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use ts_rs::TS;

use crate::cart::CartTotals;
use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{Bill, CartItem, PaymentMode, SequenceCounters, ShopMeta};
use crate::validation::{
    validate_account_id, validate_item_id, validate_item_name, validate_quantity,
    validate_shop_name, validate_unit_price, validate_uuid, ValidationResult,
};
use crate::MAX_CART_ITEMS;

// =============================================================================
// Bill Totals
// =============================================================================

/// Money totals printed on a bill.
///
/// `grand_total = round(sub_total)` to the whole rupee and
/// `round_off = grand_total − sub_total`, so `|round_off| < ₹1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BillTotals {
    pub sub_total: Money,
    pub grand_total: Money,
    pub round_off: Money,
    pub total_qty: i64,
}

impl BillTotals {
    /// Computes the totals for a set of lines.
    ///
    /// ## Example
    /// ```rust
    /// use smartbill_core::money::Money;
    /// use smartbill_core::sequencing::BillTotals;
    /// use smartbill_core::CartItem;
    ///
    /// let lines = vec![
    ///     CartItem { id: "a".into(), name: "Dosa".into(), unit_price: Money::from_paise(4550), quantity: 2 },
    ///     CartItem { id: "b".into(), name: "Coffee".into(), unit_price: Money::from_paise(1900), quantity: 1 },
    /// ];
    /// let totals = BillTotals::from_lines(&lines);
    /// assert_eq!(totals.sub_total.paise(), 11000);
    /// assert_eq!(totals.grand_total.paise(), 11000);
    /// assert_eq!(totals.round_off.paise(), 0);
    /// assert_eq!(totals.total_qty, 3);
    /// ```
    pub fn from_lines(lines: &[CartItem]) -> Self {
        let CartTotals {
            sub_total,
            total_qty,
            ..
        } = CartTotals::of(lines);
        let grand_total = sub_total.round_to_whole();

        BillTotals {
            sub_total,
            grand_total,
            round_off: grand_total - sub_total,
            total_qty,
        }
    }
}

// =============================================================================
// Commit Request
// =============================================================================

/// A validated request to turn a cart snapshot into a bill.
///
/// Constructing one runs every precondition check, so a `CommitRequest`
/// that exists is one the store may act on. Invalid input never reaches
/// the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRequest {
    lines: Vec<CartItem>,
    payment_mode: PaymentMode,
    shop: ShopMeta,
    today: NaiveDate,
    submission_id: Option<String>,
}

impl CommitRequest {
    /// Validates the inputs of a commit.
    ///
    /// ## Errors
    /// - `EmptyCart` if the snapshot has no lines
    /// - field errors for a bad line, a duplicate id, or bad shop metadata
    pub fn new(
        cart_snapshot: Vec<CartItem>,
        payment_mode: PaymentMode,
        shop: ShopMeta,
        today: NaiveDate,
    ) -> ValidationResult<Self> {
        if cart_snapshot.is_empty() {
            return Err(ValidationError::EmptyCart);
        }

        if cart_snapshot.len() > MAX_CART_ITEMS {
            return Err(ValidationError::OutOfRange {
                field: "cart items".to_string(),
                min: 1,
                max: MAX_CART_ITEMS as i64,
            });
        }

        let mut seen = HashSet::with_capacity(cart_snapshot.len());
        for line in &cart_snapshot {
            validate_item_id(&line.id)?;
            validate_item_name(&line.name)?;
            validate_quantity(line.quantity)?;
            validate_unit_price(line.unit_price)?;

            if !seen.insert(line.id.as_str()) {
                return Err(ValidationError::InvalidFormat {
                    field: "cart".to_string(),
                    reason: format!("item '{}' appears more than once", line.id),
                });
            }
        }

        validate_account_id(&shop.account_id)?;
        validate_shop_name(&shop.shop_name)?;

        Ok(CommitRequest {
            lines: cart_snapshot,
            payment_mode,
            shop,
            today,
            submission_id: None,
        })
    }

    /// Same as [`CommitRequest::new`] with the payment mode given as text.
    pub fn parse(
        cart_snapshot: Vec<CartItem>,
        payment_mode: &str,
        shop: ShopMeta,
        today: NaiveDate,
    ) -> ValidationResult<Self> {
        let payment_mode = payment_mode.parse()?;
        CommitRequest::new(cart_snapshot, payment_mode, shop, today)
    }

    /// Attaches a client idempotency key (a UUID).
    pub fn with_submission_id(mut self, submission_id: impl Into<String>) -> ValidationResult<Self> {
        let submission_id = submission_id.into();
        validate_uuid(&submission_id)?;
        self.submission_id = Some(submission_id);
        Ok(self)
    }

    pub fn lines(&self) -> &[CartItem] {
        &self.lines
    }

    pub fn payment_mode(&self) -> PaymentMode {
        self.payment_mode
    }

    pub fn shop(&self) -> &ShopMeta {
        &self.shop
    }

    pub fn account_id(&self) -> &str {
        &self.shop.account_id
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn submission_id(&self) -> Option<&str> {
        self.submission_id.as_deref()
    }

    /// Totals for the request's lines.
    pub fn totals(&self) -> BillTotals {
        BillTotals::from_lines(&self.lines)
    }

    /// Computes the bill and the counters that replace `counters`.
    ///
    /// `counters` must come from the same transaction that will write the
    /// result. `bill_id` and `timestamp` are supplied by the store for
    /// each attempt.
    pub fn settle(
        &self,
        counters: &SequenceCounters,
        bill_id: String,
        timestamp: DateTime<Utc>,
    ) -> Settlement {
        let bill_no = counters.bill_no_after();
        let token_no = counters.token_no_after(self.today);
        let totals = self.totals();

        let bill = Bill {
            id: bill_id,
            account_id: self.shop.account_id.clone(),
            bill_no,
            token_no,
            items: self.lines.clone(),
            sub_total: totals.sub_total,
            grand_total: totals.grand_total,
            round_off: totals.round_off,
            total_qty: totals.total_qty,
            payment_mode: self.payment_mode,
            shop_name: self.shop.shop_name.clone(),
            bill_date: self.today,
            timestamp,
            submission_id: self.submission_id.clone(),
        };

        Settlement {
            bill,
            counters: SequenceCounters {
                total_bills: bill_no,
                daily_token: token_no,
                last_bill_date: Some(self.today),
            },
        }
    }
}

/// The two records one commit writes, together or not at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub bill: Bill,
    pub counters: SequenceCounters,
}

// =============================================================================
// Unit Tests
// =============================================================================
