//! # Error Types
//!
//! Domain errors for cardpos-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  cardpos-core (this file)                                               │
//! │  ├── CoreError        - business rejections (cart, checkout)            │
//! │  ├── ValidationError  - malformed input                                 │
//! │  └── DiscountDenial   - manual discount refused (discount.rs)           │
//! │                                                                         │
//! │  cardpos-db                                                             │
//! │  ├── DbError          - storage failures                                │
//! │  └── CheckoutError    - Rejected(CoreError) | RolledBack(DbError)       │
//! │                                                                         │
//! │  apps/register                                                          │
//! │  └── ApiError         - what the operator sees                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Business rejections are ordinary results. They are never logged as
//! faults and every message names the rule that was broken, with numbers,
//! so the operator can fix the cart without guessing.

use thiserror::Error;

use crate::discount::DiscountDenial;
use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised by the cart and checkout validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Product was soft-deleted after being looked up.
    #[error("Product {code} is no longer active")]
    ProductInactive { code: String },

    #[error("Product {code} is out of stock")]
    OutOfStock { code: String },

    /// Requested quantity is more than what is on hand.
    ///
    /// ## When This Occurs
    /// ```text
    /// add / qty +1 (line already at stock)     checkout re-check
    ///            │                                    │
    ///            ▼                                    ▼
    ///   requested 4 > available 3        stock edited to 1 since add
    ///            │                                    │
    ///            └──────────► InsufficientStock ◄─────┘
    ///                                │
    ///                                ▼
    ///  "requested 4 of PKM-SV1-001 exceeds available stock of 3"
    /// ```
    #[error("requested {requested} of {code} exceeds available stock of {available}")]
    InsufficientStock {
        code: String,
        available: i64,
        requested: i64,
    },

    /// Quantity stopped by the per-line cap rather than by stock.
    #[error("requested {requested} of {code} exceeds the per-line limit of {max}")]
    LineQuantityLimit {
        code: String,
        max: i64,
        requested: i64,
    },

    /// Adding the line would push the cart total past what Money can hold.
    #[error("cart total out of range after adding {code}")]
    AmountOverflow { code: String },

    #[error("Product {0} is not in the cart")]
    LineNotInCart(String),

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Cart cannot have more than {max} lines")]
    CartTooLarge { max: usize },

    /// Cash tendered does not cover the total.
    #[error("amount tendered {tendered} is less than total {total}")]
    InsufficientPayment { total: Money, tendered: Money },

    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    #[error("Discount denied: {0}")]
    DiscountDenied(#[from] DiscountDenial),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors, raised before any business logic runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A date range whose start is after its end.
    #[error("{field}: start {start} is after end {end}")]
    InvalidRange {
        field: String,
        start: String,
        end: String,
    },
}

// =============================================================================
// Result Type Alias
// =============================================================================

pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejections_name_the_numbers() {
        let err = CoreError::InsufficientStock {
            code: "PKM-SV1-001".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "requested 5 of PKM-SV1-001 exceeds available stock of 3"
        );

        let err = CoreError::InsufficientPayment {
            total: Money::from_cents(3000),
            tendered: Money::from_cents(2000),
        };
        assert_eq!(err.to_string(), "amount tendered 20.00 is less than total 30.00");
    }

    #[test]
    fn test_conversions_into_core_error() {
        let err: CoreError = ValidationError::Required {
            field: "code".to_string(),
        }
        .into();
        assert!(matches!(err, CoreError::Validation(_)));

        let err: CoreError = DiscountDenial::NegativeValue.into();
        assert!(matches!(err, CoreError::DiscountDenied(DiscountDenial::NegativeValue)));
    }
}
