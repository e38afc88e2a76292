//! # Error Types
//!
//! Domain-specific error types for smartbill-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  smartbill-core errors (this file)                                     │
//! │  ├── ValidationError  - Input validation failures                      │
//! │  ├── CoreError        - Cart / bill session failures                   │
//! │  └── BillingError     - What a bill commit returns to the UI           │
//! │                                                                         │
//! │  smartbill-db errors (separate crate)                                  │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  Flow: ValidationError ─┐                                              │
//! │        DbError ─────────┴──► BillingError ──► UI (code + message)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (item id, account id, etc.)
//! 3. Errors are enum variants, never String
//! 4. Each `BillingError` variant maps to a stable machine-readable code

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Cart and bill-session errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Tried to decrement an item the cart does not hold.
    #[error("Item not in cart: {0}")]
    ItemNotInCart(String),

    /// The bill session is not in a state that allows the operation.
    ///
    /// ## When This Occurs
    /// - Editing the cart while a commit is in flight
    /// - Starting a second commit before the first resolves (double tap)
    /// - Completing a commit that was never started
    #[error("Cannot {operation} while bill is {state}")]
    InvalidSessionState {
        operation: &'static str,
        state: String,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// They are always raised before any storage work begins.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid amount).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// The cart has no items to bill.
    #[error("Cart is empty")]
    EmptyCart,
}

// =============================================================================
// Billing Error
// =============================================================================

/// The failure kinds a bill commit can report.
///
/// ## Retry Policy
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Variant              Retry?   Cart state      What the UI does         │
/// │  ───────────────────  ──────   ─────────────   ───────────────────────  │
/// │  Validation           never    unchanged       fix input                │
/// │  StorageUnavailable   yes      unchanged       "Try again" button       │
/// │  CommitConflict       yes      unchanged       retry with backoff       │
/// │  NotFound             never    unchanged       re-login / re-provision  │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
///
/// No variant ever leaves a bill written without its counter update.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BillingError {
    /// Input was rejected before any transaction was attempted.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The store could not be reached, timed out, or failed the write.
    #[error("Storage unavailable: {reason}")]
    StorageUnavailable { reason: String },

    /// The commit kept losing to concurrent commits on the same account.
    #[error("Commit conflicted with concurrent bills after {attempts} attempts")]
    CommitConflict { attempts: u32 },

    /// The account or shop profile does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },
}

impl BillingError {
    /// Creates a StorageUnavailable error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        BillingError::StorageUnavailable {
            reason: reason.into(),
        }
    }

    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        BillingError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Whether the caller may retry the same cart.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BillingError::StorageUnavailable { .. } | BillingError::CommitConflict { .. }
        )
    }

    /// Machine-readable code for the UI.
    pub fn code(&self) -> &'static str {
        match self {
            BillingError::Validation(_) => "VALIDATION_ERROR",
            BillingError::StorageUnavailable { .. } => "STORAGE_UNAVAILABLE",
            BillingError::CommitConflict { .. } => "COMMIT_CONFLICT",
            BillingError::NotFound { .. } => "NOT_FOUND",
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

/// Convenience type alias for bill commit results.
pub type BillingResult<T> = Result<T, BillingError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "shop name".to_string(),
        };
        assert_eq!(err.to_string(), "shop name is required");

        let err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        assert_eq!(err.to_string(), "quantity must be positive");
        assert_eq!(ValidationError::EmptyCart.to_string(), "Cart is empty");
    }

    #[test]
    fn test_validation_converts_to_core_and_billing_errors() {
        let core_err: CoreError = ValidationError::EmptyCart.into();
        assert!(matches!(core_err, CoreError::Validation(_)));

        let billing_err: BillingError = ValidationError::EmptyCart.into();
        assert_eq!(billing_err.code(), "VALIDATION_ERROR");
        assert!(!billing_err.is_retryable());
    }

    #[test]
    fn test_billing_error_retry_policy() {
        assert!(BillingError::unavailable("timeout").is_retryable());
        assert!(BillingError::CommitConflict { attempts: 5 }.is_retryable());
        assert!(!BillingError::not_found("Shop", "acct-1").is_retryable());

        let err = BillingError::CommitConflict { attempts: 5 };
        assert_eq!(
            err.to_string(),
            "Commit conflicted with concurrent bills after 5 attempts"
        );
        assert_eq!(err.code(), "COMMIT_CONFLICT");
    }
}
