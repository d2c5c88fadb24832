//! # Validation Module
//!
//! Input checks run before anything reaches the cart or the database.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: register commands  - parse text into typed values             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE        - business-shape rules (lengths, ranges)   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite             - UNIQUE, CHECK (stock >= 0), FOREIGN KEY  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use cardpos_core::validation::{validate_code, validate_quantity};
//!
//! assert!(validate_code("PKM-SV1-025").is_ok());
//! assert!(validate_quantity(0).is_err());
//! ```

use crate::error::ValidationError;
use crate::money::BPS_SCALE;
use crate::types::{CampaignDraft, CustomerDraft, ProductDraft};
use crate::{MAX_LINE_QUANTITY, MAX_PRICE_CENTS};

pub type ValidationResult<T> = Result<T, ValidationError>;

fn required(field: &str) -> ValidationError {
    ValidationError::Required {
        field: field.to_string(),
    }
}

fn check_len(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(required(field));
    }
    if value.trim().chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product code.
///
/// ## Rules
/// - Not empty, at most 50 characters
/// - Letters, digits, `-`, `_` and `.` only
///
/// ```rust
/// use cardpos_core::validation::validate_code;
///
/// assert!(validate_code("ETB-OBF").is_ok());
/// assert!(validate_code("has space").is_err());
/// ```
pub fn validate_code(code: &str) -> ValidationResult<()> {
    check_len("code", code, 50)?;

    if !code
        .trim()
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must contain only letters, numbers, '-', '_' and '.'".to_string(),
        });
    }

    Ok(())
}

pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    check_len("name", name, 200)
}

/// Validates a search query and returns it trimmed. Empty is allowed.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

pub fn validate_username(username: &str) -> ValidationResult<()> {
    check_len("username", username, 50)?;
    if username.trim().chars().count() < 3 {
        return Err(ValidationError::TooShort {
            field: "username".to_string(),
            min: 3,
        });
    }
    Ok(())
}

pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(required("password"));
    }
    if password.chars().count() < 4 {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: 4,
        });
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity entered for a cart line.
///
/// ## Rules
/// - Must be positive
/// - Must not exceed MAX_LINE_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Prices may be zero (promo items) but never negative or above
/// MAX_PRICE_CENTS.
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_PRICE_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

pub fn validate_stock(field: &str, units: i64) -> ValidationResult<()> {
    if units < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Campaign percentages must be in (0%, 100%].
pub fn validate_campaign_bps(bps: u32) -> ValidationResult<()> {
    if bps == 0 || bps > BPS_SCALE {
        return Err(ValidationError::OutOfRange {
            field: "discount percentage".to_string(),
            min: 1,
            max: BPS_SCALE as i64,
        });
    }
    Ok(())
}

// =============================================================================
// Record Validators
// =============================================================================

pub fn validate_product(draft: &ProductDraft) -> ValidationResult<()> {
    validate_code(&draft.code)?;
    validate_product_name(&draft.name)?;
    validate_price_cents(draft.price_cents)?;
    if let Some(sale_price) = draft.sale_price_cents {
        validate_price_cents(sale_price)?;
    }
    validate_stock("stock", draft.stock)?;
    validate_stock("min_stock", draft.min_stock)?;
    Ok(())
}

/// Validates a campaign.
///
/// ## Rules
/// - Name not empty
/// - 0 < percentage ≤ 100
/// - start_date ≤ end_date
pub fn validate_campaign(draft: &CampaignDraft) -> ValidationResult<()> {
    check_len("campaign name", &draft.name, 100)?;
    validate_campaign_bps(draft.discount_bps)?;

    if draft.start_date > draft.end_date {
        return Err(ValidationError::InvalidRange {
            field: "campaign dates".to_string(),
            start: draft.start_date.to_string(),
            end: draft.end_date.to_string(),
        });
    }

    Ok(())
}

pub fn validate_customer(draft: &CustomerDraft) -> ValidationResult<()> {
    check_len("document type", &draft.document_type, 10)?;
    check_len("document number", &draft.document_number, 20)?;
    if !draft.document_number.trim().chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::InvalidFormat {
            field: "document number".to_string(),
            reason: "must contain only letters and digits".to_string(),
        });
    }
    check_len("customer name", &draft.name, 200)?;
    if let Some(email) = draft.email.as_deref().filter(|e| !e.trim().is_empty()) {
        if !email.contains('@') {
            return Err(ValidationError::InvalidFormat {
                field: "email".to_string(),
                reason: "must contain '@'".to_string(),
            });
        }
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
