//! # Domain Types
//!
//! Core domain types used throughout SmartBilling.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌──────────────────┐      │
//! │  │    CartItem     │   │      Bill       │   │ SequenceCounters │      │
//! │  │  ─────────────  │   │  ─────────────  │   │  ──────────────  │      │
//! │  │  id             │   │  bill_no        │   │  total_bills     │      │
//! │  │  name           │   │  token_no       │   │  daily_token     │      │
//! │  │  unit_price     │   │  items (frozen) │   │  last_bill_date  │      │
//! │  │  quantity ≥ 1   │   │  grand_total    │   │  (one / account) │      │
//! │  └─────────────────┘   └─────────────────┘   └──────────────────┘      │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   ShopProfile   │   │   PaymentMode   │   │  CatalogItem    │       │
//! │  │  account_id     │   │  Cash           │   │  category_id    │       │
//! │  │  shop_name      │   │  Online         │   │  name, price    │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Persisted Shape
//! Field names serialize in camelCase (`billNo`, `tokenNo`, `grandTotal`,
//! `totalBills`, `lastBillDate`, ...) so the UI reads the same record shape
//! it always has.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Payment Mode
// =============================================================================

/// How the customer paid. No payment rails are involved; this is a label.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum PaymentMode {
    /// Physical cash.
    Cash,
    /// UPI / QR / any other online transfer.
    Online,
}

impl PaymentMode {
    /// All recognised payment modes.
    pub const ALL: [PaymentMode; 2] = [PaymentMode::Cash, PaymentMode::Online];

    /// Label as printed on the receipt.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMode::Cash => "Cash",
            PaymentMode::Online => "Online",
        }
    }
}

impl Default for PaymentMode {
    fn default() -> Self {
        PaymentMode::Cash
    }
}

impl fmt::Display for PaymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" => Ok(PaymentMode::Cash),
            "online" => Ok(PaymentMode::Online),
            _ => Err(ValidationError::NotAllowed {
                field: "payment mode".to_string(),
                allowed: PaymentMode::ALL.iter().map(|m| m.to_string()).collect(),
            }),
        }
    }
}

// =============================================================================
// Cart Item
// =============================================================================

/// A line in the cart, and the frozen snapshot of that line on a bill.
///
/// ## Invariants
/// - `quantity >= 1` (a line that drops to zero is removed, never stored)
/// - `unit_price >= 0`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Catalog item id; unique within a cart.
    pub id: String,

    /// Display name at time of adding (frozen).
    pub name: String,

    /// Unit price at time of adding (frozen).
    pub unit_price: Money,

    /// Quantity in cart.
    pub quantity: i64,
}

impl CartItem {
    /// Line total (unit price × quantity).
    ///
    /// Cart bounds keep this far from overflow; see `MAX_UNIT_PRICE_PAISE`.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }
}

// =============================================================================
// Sequence Counters
// =============================================================================

/// Per-account numbering state.
///
/// Shared and mutable, but only ever written by the commit transaction.
/// A fresh account reads as `{0, 0, None}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SequenceCounters {
    /// Lifetime number of committed bills (== last assigned bill number).
    pub total_bills: i64,

    /// Token assigned to the last bill of `last_bill_date`.
    pub daily_token: i64,

    /// Calendar day of the last committed bill.
    #[ts(as = "Option<String>")]
    pub last_bill_date: Option<NaiveDate>,
}

impl SequenceCounters {
    /// The bill number that follows these counters.
    #[inline]
    pub fn bill_no_after(&self) -> i64 {
        self.total_bills + 1
    }

    /// The token number that follows these counters on `today`.
    ///
    /// The day comparison uses the counters the caller read, so the commit
    /// path must pass counters read inside its own transaction.
    #[inline]
    pub fn token_no_after(&self, today: NaiveDate) -> i64 {
        if self.last_bill_date == Some(today) {
            self.daily_token + 1
        } else {
            1
        }
    }
}

// =============================================================================
// Shop
// =============================================================================

/// The account's shop profile, created at signup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ShopProfile {
    pub account_id: String,
    pub shop_name: String,
    pub owner_name: String,
    /// Digits only.
    pub phone: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Shop metadata stamped onto every bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ShopMeta {
    pub account_id: String,
    pub shop_name: String,
}

impl From<&ShopProfile> for ShopMeta {
    fn from(profile: &ShopProfile) -> Self {
        ShopMeta {
            account_id: profile.account_id.clone(),
            shop_name: profile.shop_name.clone(),
        }
    }
}

// =============================================================================
// Bill
// =============================================================================

/// A committed, immutable bill.
///
/// Created exactly once per successful commit; never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    /// Unique id (UUID v4) generated inside the commit transaction.
    pub id: String,
    pub account_id: String,
    /// Lifetime sequence number, gapless per account.
    pub bill_no: i64,
    /// Calendar-day sequence number, restarts at 1 each day.
    pub token_no: i64,
    /// Cart snapshot at commit time.
    pub items: Vec<CartItem>,
    pub sub_total: Money,
    pub grand_total: Money,
    pub round_off: Money,
    pub total_qty: i64,
    pub payment_mode: PaymentMode,
    pub shop_name: String,
    /// The calendar day the token belongs to.
    #[ts(as = "String")]
    pub bill_date: NaiveDate,
    #[ts(as = "String")]
    pub timestamp: DateTime<Utc>,
    /// Client idempotency key, if the caller supplied one.
    pub submission_id: Option<String>,
}

/// Per-day roll-up of committed bills.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DaySummary {
    #[ts(as = "String")]
    pub day: NaiveDate,
    pub bill_count: i64,
    pub total_qty: i64,
    pub grand_total: Money,
    pub cash_total: Money,
    pub online_total: Money,
}

// =============================================================================
// Catalog
// =============================================================================

/// A menu category (e.g. "Beverages").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CatalogCategory {
    pub id: String,
    pub account_id: String,
    pub name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A sellable menu item within a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: String,
    pub account_id: String,
    pub category_id: String,
    pub name: String,
    pub price: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// One unit of a menu item, frozen at its current name and price.
impl From<&CatalogItem> for CartItem {
    fn from(item: &CatalogItem) -> Self {
        CartItem {
            id: item.id.clone(),
            name: item.name.clone(),
            unit_price: item.price,
            quantity: 1,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
