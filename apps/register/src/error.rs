//! # API Error Type
//!
//! Unified error type for register commands.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Register                           │
//! │                                                                         │
//! │  Terminal                    Commands                                   │
//! │  ────────                    ────────                                   │
//! │                                                                         │
//! │  > add PKM-OBF-125 2                                                    │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Command Function                                                │  │
//! │  │  Result<T, ApiError>                                             │  │
//! │  │         │                                                        │  │
//! │  │  Storage failure? ──── DbError / RolledBack ── error! ──┐        │  │
//! │  │         │                                               │        │  │
//! │  │  Rule broken? ──── CoreError / DiscountDenial ──────── ApiError ►│  │
//! │  │         │                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  ✗ [INSUFFICIENT_STOCK] requested 4 of PKM-OBF-125 exceeds ...         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Business rejections are expected outcomes and are not logged as faults.
//! Storage failures are logged with their detail and surface as a generic
//! message.

use serde::Serialize;
use tracing::error;

use crate::config::ConfigError;
use cardpos_core::{CoreError, DiscountDenial, ValidationError};
use cardpos_db::{CheckoutError, DbError};

/// Error returned from register commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "DISCOUNT_DENIED",
///   "message": "discount of 25% exceeds the 20% limit for SELLER"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for command responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,

    ValidationError,

    DatabaseError,

    /// A business rule refused the operation
    BusinessLogic,

    Internal,

    CartError,

    InsufficientStock,

    PaymentError,

    /// Manual discount refused by the policy
    DiscountDenied,

    /// Bad credentials or no operator logged in
    Unauthorized,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    pub fn cart(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::CartError, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Unauthorized, message)
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::ValidationError,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::ForeignKeyViolation { message } => {
                error!("Foreign key violation: {}", message);
                ApiError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            DbError::IntegrityViolation { message } => {
                error!("Integrity violation: {}", message);
                ApiError::new(ErrorCode::DatabaseError, "Stored data failed an integrity check")
            }
            DbError::Decode { column, message } => {
                error!(column = %column, "Row decode failed: {}", message);
                ApiError::new(ErrorCode::DatabaseError, "Stored data could not be read")
            }
            DbError::ConnectionFailed(e) => {
                error!("Database connection failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                error!("Database migration failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::TransactionFailed(e) => {
                error!("Transaction failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database transaction failed")
            }
            DbError::PoolExhausted => {
                error!("Database pool exhausted");
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::PasswordHash(e) => {
                error!("Password hashing failed: {}", e);
                ApiError::internal("Password hashing failed")
            }
            DbError::Internal(e) => {
                error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts business rejections to API errors. The core messages already
/// carry the concrete numbers.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::ProductNotFound(code) => ApiError::not_found("Product", &code),
            CoreError::CustomerNotFound(id) => ApiError::not_found("Customer", &id),
            CoreError::ProductInactive { .. } => ApiError::new(ErrorCode::BusinessLogic, message),
            CoreError::OutOfStock { .. } | CoreError::InsufficientStock { .. } => {
                ApiError::new(ErrorCode::InsufficientStock, message)
            }
            CoreError::LineNotInCart(_)
            | CoreError::EmptyCart
            | CoreError::CartTooLarge { .. }
            | CoreError::LineQuantityLimit { .. }
            | CoreError::AmountOverflow { .. } => ApiError::cart(message),
            CoreError::InsufficientPayment { .. } => ApiError::new(ErrorCode::PaymentError, message),
            CoreError::DiscountDenied(denial) => ApiError::from(denial),
            CoreError::Validation(e) => ApiError::validation(e.to_string()),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<DiscountDenial> for ApiError {
    fn from(denial: DiscountDenial) -> Self {
        ApiError::new(ErrorCode::DiscountDenied, denial.to_string())
    }
}

/// A rejected checkout maps like any business error. A rolled-back one is
/// logged here with the storage detail.
impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::Rejected(reason) => ApiError::from(reason),
            CheckoutError::RolledBack(e) => {
                error!(error = %e, "Checkout rolled back");
                ApiError::new(
                    ErrorCode::DatabaseError,
                    "Sale was not saved; nothing was charged to stock. Please retry",
                )
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Failures that stop the register from starting.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("database error: {0}")]
    Database(#[from] DbError),

    #[error("terminal I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardpos_core::{Money, Percentage, Role};

    #[test]
    fn test_stock_errors_keep_numbers() {
        let err = ApiError::from(CoreError::InsufficientStock {
            code: "PKM-001".to_string(),
            available: 3,
            requested: 5,
        });
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert!(err.message.contains('3'));
        assert!(err.message.contains('5'));
    }

    #[test]
    fn test_quantity_limit_is_a_cart_error() {
        let err = ApiError::from(CoreError::LineQuantityLimit {
            code: "PKM-001".to_string(),
            max: 999,
            requested: 1000,
        });
        assert_eq!(err.code, ErrorCode::CartError);
        assert!(err.message.contains("per-line limit of 999"));
    }

    #[test]
    fn test_discount_denial_nested_in_core_error() {
        let denial = DiscountDenial::RoleCeilingExceeded {
            requested: Percentage::from_whole(25),
            ceiling: Percentage::from_whole(20),
            role: Role::Seller,
        };
        let direct = ApiError::from(denial.clone());
        let nested = ApiError::from(CoreError::DiscountDenied(denial));
        assert_eq!(direct, nested);
        assert_eq!(direct.code, ErrorCode::DiscountDenied);
    }

    #[test]
    fn test_checkout_error_mapping() {
        let rejected = ApiError::from(CheckoutError::Rejected(CoreError::InsufficientPayment {
            total: Money::from_cents(3000),
            tendered: Money::from_cents(2000),
        }));
        assert_eq!(rejected.code, ErrorCode::PaymentError);

        let rolled_back =
            ApiError::from(CheckoutError::RolledBack(DbError::QueryFailed("disk I/O".into())));
        assert_eq!(rolled_back.code, ErrorCode::DatabaseError);
        assert!(!rolled_back.message.contains("disk"));
    }

    #[test]
    fn test_serializes_screaming_code() {
        let err = ApiError::from(CoreError::EmptyCart);
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "CART_ERROR");
        assert_eq!(json["message"], "Cart is empty");
    }
}
