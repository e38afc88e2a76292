//! # Bill Session
//!
//! Lifecycle of the one bill a cashier is currently ringing up.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │            edit cart                                                    │
//! │   ┌──────────────────────┐                                              │
//! │   ▼                      │                                              │
//! │ ┌───────┐  preview  ┌────┴───────┐  begin_commit  ┌────────────┐        │
//! │ │ Draft │──────────►│ Previewing │───────────────►│ Committing │        │
//! │ └───┬───┘           └────────────┘                └─────┬──────┘        │
//! │     │   begin_commit                                    │               │
//! │     └──────────────────────────────────────────────────►│               │
//! │     ▲                                          complete │ abort(err)    │
//! │     │ edit / preview / begin_commit                     │               │
//! │ ┌───┴─────────┐                                         │               │
//! │ │ Aborted(err)│◄────────────────────────────────────────┤               │
//! │ └─────────────┘                             ┌───────────▼─┐             │
//! │                                             │  Committed  │ (terminal)  │
//! │                                             └─────────────┘             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The session holds a submission id from the first `begin_commit` until the
//! cart changes, so re-submitting the same cart after a lost response maps to
//! the bill that was already written.

use std::fmt;

use chrono::NaiveDate;

use crate::cart::{Cart, CartTotals};
use crate::error::{BillingError, CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::preview::BillPreview;
use crate::sequencing::CommitRequest;
use crate::types::{Bill, CatalogItem, PaymentMode, ShopMeta};

/// Where the bill-in-progress is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Cart is being edited.
    Draft,
    /// Review screen is showing advisory numbers.
    Previewing(BillPreview),
    /// A commit is in flight; the cart is locked.
    Committing,
    /// The bill was written. Terminal.
    Committed(Box<Bill>),
    /// The last commit failed; the cart is intact for a retry.
    Aborted(BillingError),
}

impl SessionState {
    fn name(&self) -> &'static str {
        match self {
            SessionState::Draft => "draft",
            SessionState::Previewing(_) => "previewing",
            SessionState::Committing => "committing",
            SessionState::Committed(_) => "committed",
            SessionState::Aborted(_) => "aborted",
        }
    }

    fn is_open(&self) -> bool {
        matches!(
            self,
            SessionState::Draft | SessionState::Previewing(_) | SessionState::Aborted(_)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One cashier's bill-in-progress: the cart plus its commit state.
#[derive(Debug, Clone)]
pub struct BillSession {
    cart: Cart,
    state: SessionState,
    submission_id: Option<String>,
}

impl Default for BillSession {
    fn default() -> Self {
        BillSession::new()
    }
}

impl BillSession {
    pub fn new() -> Self {
        BillSession {
            cart: Cart::new(),
            state: SessionState::Draft,
            submission_id: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn totals(&self) -> CartTotals {
        self.cart.totals()
    }

    /// Idempotency key of the pending submission, if one was started.
    pub fn submission_id(&self) -> Option<&str> {
        self.submission_id.as_deref()
    }

    /// The committed bill, once the session is terminal.
    pub fn bill(&self) -> Option<&Bill> {
        match &self.state {
            SessionState::Committed(bill) => Some(bill),
            _ => None,
        }
    }

    fn require_open(&self, operation: &'static str) -> CoreResult<()> {
        if self.state.is_open() {
            Ok(())
        } else {
            Err(CoreError::InvalidSessionState {
                operation,
                state: self.state.to_string(),
            })
        }
    }

    fn edited(&mut self) {
        self.state = SessionState::Draft;
        self.submission_id = None;
    }

    // =========================================================================
    // Cart Editing
    // =========================================================================

    pub fn add_item(&mut self, id: &str, name: &str, unit_price: Money, delta: i64) -> CoreResult<()> {
        self.require_open("edit cart")?;
        self.cart.add_item(id, name, unit_price, delta)?;
        self.edited();
        Ok(())
    }

    pub fn add_catalog_item(&mut self, item: &CatalogItem, delta: i64) -> CoreResult<()> {
        self.add_item(&item.id, &item.name, item.price, delta)
    }

    pub fn remove_item(&mut self, id: &str, delta: i64) -> CoreResult<i64> {
        self.require_open("edit cart")?;
        let remaining = self.cart.remove_item(id, delta)?;
        self.edited();
        Ok(remaining)
    }

    /// Empties the cart and starts over.
    pub fn discard(&mut self) -> CoreResult<()> {
        self.require_open("discard")?;
        self.cart.clear();
        self.edited();
        Ok(())
    }

    // =========================================================================
    // Review & Commit
    // =========================================================================

    /// Shows advisory numbers on the review screen.
    pub fn preview(&mut self, preview: BillPreview) -> CoreResult<()> {
        self.require_open("preview")?;
        if self.cart.is_empty() {
            return Err(ValidationError::EmptyCart.into());
        }
        self.state = SessionState::Previewing(preview);
        Ok(())
    }

    /// Locks the cart and builds the request for the allocator.
    ///
    /// ## Errors
    /// - `InvalidSessionState` if a commit is already in flight or done
    /// - `Validation` if the cart or shop metadata is invalid; the session
    ///   stays where it was
    pub fn begin_commit(
        &mut self,
        payment_mode: PaymentMode,
        shop: ShopMeta,
        today: NaiveDate,
    ) -> CoreResult<CommitRequest> {
        self.require_open("commit")?;

        let submission_id = self
            .submission_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let request = CommitRequest::new(self.cart.snapshot(), payment_mode, shop, today)?
            .with_submission_id(submission_id.clone())?;

        self.submission_id = Some(submission_id);
        self.state = SessionState::Committing;
        Ok(request)
    }

    /// Records a successful commit and clears the cart.
    pub fn complete(&mut self, bill: Bill) -> CoreResult<()> {
        if self.state != SessionState::Committing {
            return Err(CoreError::InvalidSessionState {
                operation: "complete",
                state: self.state.to_string(),
            });
        }

        self.cart.clear();
        self.submission_id = None;
        self.state = SessionState::Committed(Box::new(bill));
        Ok(())
    }

    /// Records a failed commit. The cart and submission id are kept.
    pub fn abort(&mut self, error: BillingError) -> CoreResult<()> {
        if self.state != SessionState::Committing {
            return Err(CoreError::InvalidSessionState {
                operation: "abort",
                state: self.state.to_string(),
            });
        }

        self.state = SessionState::Aborted(error);
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
