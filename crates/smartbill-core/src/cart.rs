//! # Cart
//!
//! In-memory cart for the bill being rung up.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  UI Action                Cart Method             State Change          │
//! │  ─────────                ───────────             ────────────          │
//! │                                                                         │
//! │  Tap item  "+" ─────────► add_item(.., 1) ──────► qty += 1 / insert    │
//! │                                                                         │
//! │  Tap item  "−" ─────────► remove_item(id, 1) ───► qty -= 1 / delete    │
//! │                                                                         │
//! │  Review bill ───────────► totals() ─────────────► (read only)          │
//! │                                                                         │
//! │  Confirm ───────────────► snapshot() ───────────► (read only)          │
//! │                                                                         │
//! │  Committed / discard ───► clear() ──────────────► lines.clear()        │
//! │                                                                         │
//! │  NOTE: a line is never stored with quantity 0. Removing the last unit  │
//! │        deletes the entry.                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The cart has no persistence and no network access; it is owned by a
//! single editing session.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{CartItem, CatalogItem};
use crate::validation::{
    validate_cart_size, validate_item_id, validate_item_name, validate_quantity,
    validate_unit_price,
};
use crate::MAX_ITEM_QUANTITY;

/// Totals derived from the cart, recomputed on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    /// Σ unit_price × quantity.
    pub sub_total: Money,
    /// Σ quantity.
    pub total_qty: i64,
    /// Number of distinct lines.
    pub line_count: usize,
}

impl CartTotals {
    /// Computes totals over any set of lines.
    pub fn of<'a>(lines: impl IntoIterator<Item = &'a CartItem>) -> Self {
        lines
            .into_iter()
            .fold(CartTotals::default(), |acc, line| CartTotals {
                sub_total: acc.sub_total + line.line_total(),
                total_qty: acc.total_qty + line.quantity,
                line_count: acc.line_count + 1,
            })
    }
}

/// The shopping cart: item id → line.
///
/// ## Invariants
/// - Keys are unique (adding an existing id increases its quantity)
/// - Every stored quantity is in `1..=MAX_ITEM_QUANTITY`
/// - At most `MAX_CART_ITEMS` distinct lines
///
/// Serialized as its list of lines; deserializing goes through
/// [`Cart::try_from`] so a stored cart is re-validated line by line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<CartItem>", into = "Vec<CartItem>")]
pub struct Cart {
    lines: BTreeMap<String, CartItem>,
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Cart::default()
    }

    /// Adds `delta` units of an item, inserting the line if it is new.
    ///
    /// ## Behavior
    /// - Existing id: quantity += delta (name and price stay frozen)
    /// - New id: inserted with quantity = delta
    ///
    /// ## Errors
    /// `ValidationError` if delta ≤ 0, the price is negative, or a cart
    /// bound would be exceeded. The cart is unchanged on error.
    pub fn add_item(
        &mut self,
        id: &str,
        name: &str,
        unit_price: Money,
        delta: i64,
    ) -> CoreResult<()> {
        validate_quantity(delta)?;
        validate_unit_price(unit_price)?;

        if let Some(line) = self.lines.get_mut(id) {
            let new_qty = line.quantity + delta;
            if new_qty > MAX_ITEM_QUANTITY {
                return Err(ValidationError::OutOfRange {
                    field: "quantity".to_string(),
                    min: 1,
                    max: MAX_ITEM_QUANTITY,
                }
                .into());
            }
            line.quantity = new_qty;
            return Ok(());
        }

        validate_item_id(id)?;
        validate_item_name(name)?;
        validate_cart_size(self.lines.len())?;

        self.lines.insert(
            id.to_string(),
            CartItem {
                id: id.to_string(),
                name: name.trim().to_string(),
                unit_price,
                quantity: delta,
            },
        );
        Ok(())
    }

    /// Adds `delta` units of a catalog item.
    pub fn add_catalog_item(&mut self, item: &CatalogItem, delta: i64) -> CoreResult<()> {
        self.add_item(&item.id, &item.name, item.price, delta)
    }

    /// Removes `delta` units of an item.
    ///
    /// If the resulting quantity is ≤ 0 the line is deleted entirely.
    /// Returns the quantity left in the cart (0 when deleted).
    pub fn remove_item(&mut self, id: &str, delta: i64) -> CoreResult<i64> {
        if delta <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            }
            .into());
        }

        let line = self
            .lines
            .get_mut(id)
            .ok_or_else(|| CoreError::ItemNotInCart(id.to_string()))?;

        let remaining = line.quantity - delta;
        if remaining <= 0 {
            self.lines.remove(id);
            return Ok(0);
        }

        line.quantity = remaining;
        Ok(remaining)
    }

    /// Computes subtotal and quantity totals.
    pub fn totals(&self) -> CartTotals {
        CartTotals::of(self.lines.values())
    }

    /// Quantity of one item, 0 if absent.
    pub fn quantity_of(&self, id: &str) -> i64 {
        self.lines.get(id).map(|l| l.quantity).unwrap_or(0)
    }

    /// Owned copy of the lines (ordered by id) for a commit.
    pub fn snapshot(&self) -> Vec<CartItem> {
        self.lines.values().cloned().collect()
    }

    /// Iterates over the lines.
    pub fn lines(&self) -> impl Iterator<Item = &CartItem> {
        self.lines.values()
    }

    /// Clears all items from the cart.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Number of distinct lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Checks if the cart is empty.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl TryFrom<Vec<CartItem>> for Cart {
    type Error = CoreError;

    /// Rebuilds a cart through [`Cart::add_item`]; repeated ids merge.
    fn try_from(items: Vec<CartItem>) -> CoreResult<Self> {
        let mut cart = Cart::new();
        for item in items {
            cart.add_item(&item.id, &item.name, item.unit_price, item.quantity)?;
        }
        Ok(cart)
    }
}

impl From<Cart> for Vec<CartItem> {
    fn from(cart: Cart) -> Self {
        cart.lines.into_values().collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MAX_CART_ITEMS;

    fn paise(p: i64) -> Money {
        Money::from_paise(p)
    }

    #[test]
    fn test_add_same_item_twice_merges() {
        let mut cart = Cart::new();
        cart.add_item("a", "Idli", paise(3000), 1).unwrap();
        cart.add_item("a", "Idli", paise(3000), 1).unwrap();

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.quantity_of("a"), 2);
    }

    #[test]
    fn test_remove_twice_deletes_line() {
        let mut cart = Cart::new();
        cart.add_item("a", "Idli", paise(3000), 1).unwrap();
        cart.add_item("a", "Idli", paise(3000), 1).unwrap();

        assert_eq!(cart.remove_item("a", 1).unwrap(), 1);
        assert_eq!(cart.remove_item("a", 1).unwrap(), 0);

        assert!(cart.is_empty());
        assert_eq!(cart.quantity_of("a"), 0);
        assert!(cart.lines().all(|l| l.quantity > 0));
    }

    #[test]
    fn test_remove_more_than_held_deletes_line() {
        let mut cart = Cart::new();
        cart.add_item("a", "Idli", paise(3000), 2).unwrap();

        assert_eq!(cart.remove_item("a", 5).unwrap(), 0);
        assert!(cart.snapshot().is_empty());
    }

    #[test]
    fn test_remove_unknown_item() {
        let mut cart = Cart::new();
        assert_eq!(
            cart.remove_item("ghost", 1),
            Err(CoreError::ItemNotInCart("ghost".to_string()))
        );
    }

    #[test]
    fn test_invalid_deltas_and_prices_rejected() {
        let mut cart = Cart::new();
        assert!(matches!(
            cart.add_item("a", "Idli", paise(3000), 0),
            Err(CoreError::Validation(ValidationError::MustBePositive { .. }))
        ));
        assert!(cart.add_item("a", "Idli", paise(3000), -2).is_err());
        assert!(cart.add_item("a", "Idli", paise(-1), 1).is_err());
        assert!(cart.remove_item("a", 0).is_err());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_totals_scenario() {
        let mut cart = Cart::new();
        cart.add_item("a", "Masala Dosa", paise(4550), 2).unwrap();
        cart.add_item("b", "Filter Coffee", paise(1900), 1).unwrap();

        let totals = cart.totals();
        assert_eq!(totals.sub_total, paise(11000));
        assert_eq!(totals.total_qty, 3);
        assert_eq!(totals.line_count, 2);
    }

    #[test]
    fn test_quantity_bound() {
        let mut cart = Cart::new();
        cart.add_item("a", "Idli", paise(3000), MAX_ITEM_QUANTITY).unwrap();
        assert!(cart.add_item("a", "Idli", paise(3000), 1).is_err());
        assert_eq!(cart.quantity_of("a"), MAX_ITEM_QUANTITY);
    }

    #[test]
    fn test_cart_size_bound() {
        let mut cart = Cart::new();
        for i in 0..MAX_CART_ITEMS {
            cart.add_item(&format!("item-{i}"), "Item", paise(100), 1)
                .unwrap();
        }
        assert!(cart.add_item("one-too-many", "Item", paise(100), 1).is_err());
        // Existing lines can still grow.
        cart.add_item("item-0", "Item", paise(100), 1).unwrap();
    }

    #[test]
    fn test_price_frozen_on_merge() {
        let mut cart = Cart::new();
        cart.add_item("a", "Idli", paise(3000), 1).unwrap();
        cart.add_item("a", "Idli", paise(3500), 1).unwrap();
        assert_eq!(cart.totals().sub_total, paise(6000));
    }

    #[test]
    fn test_snapshot_and_clear() {
        let mut cart = Cart::new();
        cart.add_item("b", "Vada", paise(2000), 1).unwrap();
        cart.add_item("a", "Idli", paise(3000), 1).unwrap();

        let snapshot = cart.snapshot();
        assert_eq!(
            snapshot.iter().map(|l| l.id.as_str()).collect::<Vec<_>>(),
            vec!["a", "b"]
        );

        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn test_rebuild_from_lines_validates() {
        let line = |id: &str, quantity: i64| CartItem {
            id: id.to_string(),
            name: "Idli".to_string(),
            unit_price: paise(3000),
            quantity,
        };

        let cart = Cart::try_from(vec![line("a", 2), line("a", 1), line("b", 1)]).unwrap();
        assert_eq!(cart.len(), 2);
        assert_eq!(cart.quantity_of("a"), 3);

        assert!(Cart::try_from(vec![line("a", 0)]).is_err());
        assert!(Cart::try_from(vec![line("a", MAX_ITEM_QUANTITY + 1)]).is_err());
    }

    #[test]
    fn test_deserialize_rejects_invalid_lines() {
        let mut cart = Cart::new();
        cart.add_item("a", "Idli", paise(3000), 2).unwrap();
        let json = serde_json::to_string(&cart).unwrap();
        let back: Cart = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cart);

        let bad = json.replace("\"quantity\":2", "\"quantity\":0");
        assert_ne!(bad, json);
        assert!(serde_json::from_str::<Cart>(&bad).is_err());
    }
}
