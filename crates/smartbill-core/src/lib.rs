//! # smartbill-core: Pure Billing Logic for SmartBilling
//!
//! Everything that decides what a bill looks like, with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     SmartBilling Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Mobile UI (collaborator)                     │   │
//! │  │    Menu ──► Cart ──► Review (preview) ──► Confirm ──► Receipt  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ smartbill-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌────────────┐ ┌──────────────┐   │   │
//! │  │   │   cart   │ │ preview  │ │ sequencing │ │   session    │   │   │
//! │  │   │  Cart    │ │ Estimator│ │ CommitReq  │ │ BillSession  │   │   │
//! │  │   │  Totals  │ │          │ │ settle()   │ │ Draft→...    │   │   │
//! │  │   └──────────┘ └──────────┘ └────────────┘ └──────────────┘   │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              smartbill-db (store + SequenceAllocator)           │   │
//! │  │        SQLite transaction, retries, repositories, config        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Bill, CartItem, SequenceCounters, ...)
//! - [`money`] - Money in paise with whole-rupee rounding
//! - [`cart`] - The in-memory cart and its totals
//! - [`preview`] - Advisory next-number projection
//! - [`sequencing`] - Validated commit requests and the pure commit body
//! - [`session`] - The bill-in-progress state machine
//! - [`validation`] - Input rules
//! - [`error`] - Error types
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::{NaiveDate, Utc};
//! use smartbill_core::{Cart, CommitRequest, Money, PaymentMode, SequenceCounters, ShopMeta};
//!
//! let mut cart = Cart::new();
//! cart.add_item("dosa", "Masala Dosa", Money::from_paise(4550), 2).unwrap();
//! cart.add_item("coffee", "Filter Coffee", Money::from_paise(1900), 1).unwrap();
//!
//! let today = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
//! let shop = ShopMeta { account_id: "acct-1".into(), shop_name: "Sri Krishna Tiffins".into() };
//! let request = CommitRequest::new(cart.snapshot(), PaymentMode::Cash, shop, today).unwrap();
//!
//! let counters = SequenceCounters { total_bills: 7, daily_token: 3, last_bill_date: Some(today) };
//! let settlement = request.settle(&counters, "bill-id".into(), Utc::now());
//!
//! assert_eq!((settlement.bill.bill_no, settlement.bill.token_no), (8, 4));
//! assert_eq!(settlement.bill.grand_total.to_string(), "₹110.00");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod money;
pub mod preview;
pub mod sequencing;
pub mod session;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartTotals};
pub use error::{BillingError, BillingResult, CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use preview::{BillPreview, PreviewEstimator};
pub use sequencing::{BillTotals, CommitRequest, Settlement};
pub use session::{BillSession, SessionState};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines on one bill.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line.
///
/// Catches typos like 1000 for 10 at the counter.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Highest accepted unit price, in paise (₹10,00,000).
pub const MAX_UNIT_PRICE_PAISE: i64 = 100_000_000;
