//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ├── is_conflict()? ──► SequenceAllocator retries the commit      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BillingError (smartbill-core) ← What the UI sees                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use smartbill_core::{BillingError, ValidationError};
use thiserror::Error;

/// SQLite primary result codes that mean "another writer holds the lock".
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - Unknown account id (no shop profile)
    /// - Bill id or number doesn't exist for the account
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Provisioning an account twice
    /// - Duplicate category name within an account
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Adding a menu item to a category that doesn't exist
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Another connection holds the write lock.
    ///
    /// ## When This Occurs
    /// - Concurrent commits on the same database outlast `busy_timeout`
    #[error("Database busy: {0}")]
    Busy(String),

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A stored JSON column could not be encoded or decoded.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Input rejected before reaching SQL.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Whether a fresh attempt of the same transaction may succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, DbError::Busy(_))
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → BUSY/LOCKED → Busy, else constraint kind
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message().to_string();

                // Extended codes carry the primary code in the low byte
                // (517 = SQLITE_BUSY_SNAPSHOT, 262 = SQLITE_LOCKED_SHAREDCACHE).
                let primary = db_err
                    .code()
                    .and_then(|code| code.parse::<i32>().ok())
                    .map(|code| code & 0xff);
                if matches!(primary, Some(SQLITE_BUSY) | Some(SQLITE_LOCKED)) {
                    return DbError::Busy(msg);
                }

                match db_err.kind() {
                    sqlx::error::ErrorKind::UniqueViolation => {
                        let field = msg
                            .split("UNIQUE constraint failed: ")
                            .nth(1)
                            .unwrap_or("unknown")
                            .to_string();
                        DbError::UniqueViolation {
                            field,
                            value: "unknown".to_string(),
                        }
                    }
                    sqlx::error::ErrorKind::ForeignKeyViolation => {
                        DbError::ForeignKeyViolation { message: msg }
                    }
                    _ => DbError::QueryFailed(msg),
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            sqlx::Error::Io(e) => DbError::ConnectionFailed(e.to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Serialization(err.to_string())
    }
}

/// Maps storage failures onto the public billing taxonomy.
///
/// A single conflict converts to `CommitConflict { attempts: 1 }`; the
/// allocator reports its own attempt count when it gives up.
impl From<DbError> for BillingError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => BillingError::NotFound { entity, id },
            DbError::Validation(e) => BillingError::Validation(e),
            DbError::Busy(_) => BillingError::CommitConflict { attempts: 1 },
            other => BillingError::unavailable(other.to_string()),
        }
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_billing_error_mapping() {
        let err: BillingError = DbError::not_found("Shop", "acct-1").into();
        assert_eq!(err, BillingError::not_found("Shop", "acct-1"));

        let err: BillingError = DbError::Busy("database is locked".into()).into();
        assert_eq!(err, BillingError::CommitConflict { attempts: 1 });

        let err: BillingError = DbError::PoolExhausted.into();
        assert_eq!(err.code(), "STORAGE_UNAVAILABLE");

        let err: BillingError = DbError::Validation(ValidationError::EmptyCart).into();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_only_busy_is_conflict() {
        assert!(DbError::Busy("locked".into()).is_conflict());
        assert!(!DbError::PoolExhausted.is_conflict());
        assert!(!DbError::QueryFailed("syntax".into()).is_conflict());
    }

    #[test]
    fn test_sqlx_pool_errors() {
        assert!(matches!(
            DbError::from(sqlx::Error::PoolTimedOut),
            DbError::PoolExhausted
        ));
        assert!(matches!(
            DbError::from(sqlx::Error::RowNotFound),
            DbError::NotFound { .. }
        ));
    }
}
