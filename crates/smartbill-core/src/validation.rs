//! # Validation Module
//!
//! Input validation utilities for SmartBilling.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: UI forms                                                     │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (Rust)                                           │
//! │  ├── Cart rules (quantity, price, size)                                │
//! │  └── Profile rules (shop name, phone)                                  │
//! │           │   Every failure here stops BEFORE a transaction starts     │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── UNIQUE (account_id, bill_no)                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use smartbill_core::validation::{validate_quantity, validate_shop_name};
//!
//! validate_quantity(2).unwrap();
//! assert!(validate_shop_name("").is_err());
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY, MAX_UNIT_PRICE_PAISE};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

fn validate_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates an item id used as a cart key.
pub fn validate_item_id(id: &str) -> ValidationResult<()> {
    validate_text("item id", id, 128)
}

/// Validates an item or category display name.
///
/// ## Rules
/// - Must not be empty
/// - At most 200 characters
pub fn validate_item_name(name: &str) -> ValidationResult<()> {
    validate_text("name", name, 200)
}

/// Validates a shop name shown on every receipt.
pub fn validate_shop_name(name: &str) -> ValidationResult<()> {
    validate_text("shop name", name, 100)
}

/// Validates the owner's full name.
pub fn validate_owner_name(name: &str) -> ValidationResult<()> {
    validate_text("full name", name, 100)
}

/// Validates an account id.
///
/// ## Rules
/// - Must not be empty, at most 128 characters
/// - No whitespace or path separators
pub fn validate_account_id(id: &str) -> ValidationResult<()> {
    validate_text("account id", id, 128)?;

    if id.chars().any(|c| c.is_whitespace() || c == '/') {
        return Err(ValidationError::InvalidFormat {
            field: "account id".to_string(),
            reason: "must not contain whitespace or '/'".to_string(),
        });
    }

    Ok(())
}

/// Normalises a phone number to digits only.
///
/// ## Rules
/// - Non-digits are stripped (`"+91 98765-43210"` → `"919876543210"`)
/// - 10 to 15 digits must remain
///
/// ## Example
/// ```rust
/// use smartbill_core::validation::normalize_phone;
///
/// assert_eq!(normalize_phone("98765 43210").unwrap(), "9876543210");
/// assert!(normalize_phone("12345").is_err());
/// ```
pub fn normalize_phone(phone: &str) -> ValidationResult<String> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.is_empty() {
        return Err(ValidationError::Required {
            field: "phone".to_string(),
        });
    }

    if digits.len() < 10 {
        return Err(ValidationError::TooShort {
            field: "phone".to_string(),
            min: 10,
        });
    }

    if digits.len() > 15 {
        return Err(ValidationError::TooLong {
            field: "phone".to_string(),
            max: 15,
        });
    }

    Ok(digits)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity or quantity delta.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a unit price.
///
/// ## Rules
/// - Must be non-negative (zero is allowed: complimentary items)
/// - At most MAX_UNIT_PRICE_PAISE
///
/// ## Example
/// ```rust
/// use smartbill_core::money::Money;
/// use smartbill_core::validation::validate_unit_price;
///
/// assert!(validate_unit_price(Money::from_paise(4550)).is_ok());
/// assert!(validate_unit_price(Money::zero()).is_ok());
/// assert!(validate_unit_price(Money::from_paise(-100)).is_err());
/// ```
pub fn validate_unit_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() || price.paise() > MAX_UNIT_PRICE_PAISE {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: MAX_UNIT_PRICE_PAISE,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates that one more distinct line fits in the cart.
pub fn validate_cart_size(current_items: usize) -> ValidationResult<()> {
    if current_items >= MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "cart items".to_string(),
            min: 0,
            max: MAX_CART_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string (used for client submission ids).
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_names() {
        assert!(validate_item_name("Filter Coffee").is_ok());
        assert!(validate_item_name("   ").is_err());
        assert!(validate_item_name(&"A".repeat(201)).is_err());

        assert!(validate_shop_name("Sri Krishna Tiffins").is_ok());
        assert!(validate_shop_name("").is_err());
        assert!(validate_owner_name("Ravi Kumar").is_ok());
    }

    #[test]
    fn test_validate_account_id() {
        assert!(validate_account_id("u-123").is_ok());
        assert!(validate_account_id("").is_err());
        assert!(validate_account_id("a b").is_err());
        assert!(validate_account_id("users/1").is_err());
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("+91 98765-43210").unwrap(), "919876543210");
        assert!(matches!(
            normalize_phone("abc"),
            Err(ValidationError::Required { .. })
        ));
        assert!(matches!(
            normalize_phone("98765"),
            Err(ValidationError::TooShort { .. })
        ));
        assert!(normalize_phone(&"9".repeat(16)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_unit_price() {
        assert!(validate_unit_price(Money::zero()).is_ok());
        assert!(validate_unit_price(Money::from_paise(MAX_UNIT_PRICE_PAISE)).is_ok());
        assert!(validate_unit_price(Money::from_paise(-1)).is_err());
        assert!(validate_unit_price(Money::from_paise(MAX_UNIT_PRICE_PAISE + 1)).is_err());
    }

    #[test]
    fn test_validate_cart_size() {
        assert!(validate_cart_size(0).is_ok());
        assert!(validate_cart_size(MAX_CART_ITEMS - 1).is_ok());
        assert!(validate_cart_size(MAX_CART_ITEMS).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("not-a-uuid").is_err());
    }
}
