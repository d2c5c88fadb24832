//! # Database Error Types
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  sqlx::Error / MigrateError / argon2 error                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← categorised by constraint / failure kind       │
//! │       │                                                                 │
//! │       ├──► CheckoutError::RolledBack (inside a checkout)                │
//! │       ▼                                                                 │
//! │  ApiError (register app) ← what the operator sees                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// UNIQUE constraint violation (product code, sale number, username, ...).
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint violation.
    ///
    /// ## When This Occurs
    /// Only when an invariant was bypassed, e.g. a stock decrement that
    /// would go below zero. Treat as a defect, never retry.
    #[error("Integrity violation: {message}")]
    IntegrityViolation { message: String },

    /// A row could not be mapped to its type (missing or ill-typed column).
    #[error("Failed to decode column '{column}': {message}")]
    Decode { column: String, message: String },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// RowNotFound                      → NotFound
/// Database "UNIQUE constraint"     → UniqueViolation
/// Database "FOREIGN KEY"           → ForeignKeyViolation
/// Database "CHECK constraint"      → IntegrityViolation
/// Database (anything else)         → QueryFailed
/// ColumnNotFound / ColumnDecode    → Decode
/// PoolTimedOut                     → PoolExhausted
/// PoolClosed                       → ConnectionFailed
/// Other                            → Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                if let Some(field) = msg.strip_prefix("UNIQUE constraint failed: ") {
                    DbError::UniqueViolation {
                        field: field.to_string(),
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("CHECK constraint failed") {
                    DbError::IntegrityViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::ColumnNotFound(column) => DbError::Decode {
                column,
                message: "column missing from result".to_string(),
            },

            sqlx::Error::ColumnDecode { index, source } => DbError::Decode {
                column: index,
                message: source.to_string(),
            },

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
