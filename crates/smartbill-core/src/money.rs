//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    45.5 * 3 + 0.1 = 136.6 ... or 136.60000000000002                     │
//! │                                                                         │
//! │  A receipt that prints "Round Off: +0.39999999" is a support call.      │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Paise                                            │
//! │    4550 paise × 3 + 10 paise = 13660 paise, exactly                     │
//! │    Rounding to whole rupees is an explicit, exact integer step          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use smartbill_core::money::Money;
//!
//! // Create from paise (preferred)
//! let price = Money::from_paise(4550); // ₹45.50
//!
//! // Or parse a decimal entered in a form
//! let same: Money = "45.50".parse().unwrap();
//! assert_eq!(price, same);
//!
//! // Bill totals round to whole rupees
//! assert_eq!(Money::from_paise(11040).round_to_whole().paise(), 11000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;

/// Minor units per major unit (paise per rupee).
pub const MINOR_PER_MAJOR: i64 = 100;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (paise).
///
/// ## Design Decisions
/// - **i64 (signed)**: Round-off can be negative (₹110.40 → ₹110, round-off −0.40)
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Serde**: Serialized as the raw paise integer
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                                                                         │
/// │  CatalogItem.price ──► CartItem.unit_price ──► line total               │
/// │                                                     │                   │
/// │                              Σ lines ──► sub_total ─┤                   │
/// │                                                     ▼                   │
/// │                          round_to_whole() ──► grand_total               │
/// │                          grand_total − sub_total ──► round_off          │
/// │                                                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from paise (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use smartbill_core::money::Money;
    ///
    /// let price = Money::from_paise(1999); // ₹19.99
    /// assert_eq!(price.paise(), 1999);
    /// ```
    #[inline]
    pub const fn from_paise(paise: i64) -> Self {
        Money(paise)
    }

    /// Creates a Money value from whole rupees.
    #[inline]
    pub const fn from_rupees(rupees: i64) -> Self {
        Money(rupees * MINOR_PER_MAJOR)
    }

    /// Returns the value in paise.
    #[inline]
    pub const fn paise(&self) -> i64 {
        self.0
    }

    /// Returns the whole-rupee portion (truncated toward zero).
    #[inline]
    pub const fn rupees(&self) -> i64 {
        self.0 / MINOR_PER_MAJOR
    }

    /// Returns the paise portion (always 0-99).
    ///
    /// ## Example
    /// ```rust
    /// use smartbill_core::money::Money;
    ///
    /// assert_eq!(Money::from_paise(4550).paise_part(), 50);
    /// assert_eq!(Money::from_paise(-40).paise_part(), 40); // Absolute value
    /// ```
    #[inline]
    pub const fn paise_part(&self) -> i64 {
        (self.0 % MINOR_PER_MAJOR).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies a unit price by a quantity, `None` on overflow.
    ///
    /// ## Example
    /// ```rust
    /// use smartbill_core::money::Money;
    ///
    /// let unit_price = Money::from_paise(4550); // ₹45.50
    /// let line_total = unit_price.checked_multiply_quantity(2).unwrap();
    /// assert_eq!(line_total.paise(), 9100); // ₹91.00
    /// ```
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(v) => Some(Money(v)),
            None => None,
        }
    }

    /// Rounds to the nearest whole rupee, halves rounding up.
    ///
    /// ## Rounding Law
    /// ```text
    /// ┌─────────────────────────────────────────────────────────────────────┐
    /// │  sub_total        grand_total      round_off                        │
    /// │  ₹110.00    ──►   ₹110             +0.00                            │
    /// │  ₹110.40    ──►   ₹110             −0.40                            │
    /// │  ₹110.50    ──►   ₹111             +0.50                            │
    /// │  ₹110.99    ──►   ₹111             +0.01                            │
    /// │                                                                     │
    /// │  Always: |grand_total − sub_total| < ₹1                             │
    /// └─────────────────────────────────────────────────────────────────────┘
    /// ```
    ///
    /// Matches how totals are printed on the receipt (half a rupee rounds up).
    pub const fn round_to_whole(&self) -> Money {
        let remainder = self.0.rem_euclid(MINOR_PER_MAJOR);
        let floor = self.0 - remainder;
        if remainder * 2 >= MINOR_PER_MAJOR {
            Money(floor + MINOR_PER_MAJOR)
        } else {
            Money(floor)
        }
    }

    /// Parses a decimal amount such as `"45.5"`, `"19"` or `"-0.40"`.
    ///
    /// At most two fractional digits are accepted; anything finer than a
    /// paisa is rejected rather than silently rounded.
    pub fn parse(input: &str) -> Result<Money, ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "amount".to_string(),
            reason: reason.to_string(),
        };

        let trimmed = input.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };

        let (whole, fraction) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };

        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid("must contain digits"));
        }
        if !whole.chars().all(|c| c.is_ascii_digit())
            || !fraction.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid("must be a decimal number"));
        }
        if fraction.len() > 2 {
            return Err(invalid("at most two decimal places"));
        }

        let whole_value: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid("amount is too large"))?
        };
        let fraction_value: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| invalid("bad fraction"))? * 10,
            _ => fraction.parse().map_err(|_| invalid("bad fraction"))?,
        };

        let paise = whole_value
            .checked_mul(MINOR_PER_MAJOR)
            .and_then(|p| p.checked_add(fraction_value))
            .ok_or_else(|| invalid("amount is too large"))?;

        Ok(Money(if negative { -paise } else { paise }))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows the amount the way it is printed on a receipt.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}₹{}.{:02}",
            sign,
            self.rupees().abs(),
            self.paise_part()
        )
    }
}

impl FromStr for Money {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::parse(s)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by a quantity.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
