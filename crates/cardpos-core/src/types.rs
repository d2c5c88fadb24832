//! # Domain Types
//!
//! Read models and enums shared by every CardPOS crate.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Catalog                     Sales (facts of record)   Stock ledger     │
//! │  ┌─────────────────┐         ┌─────────────────┐       ┌──────────────┐ │
//! │  │    Product      │◄────────│    SaleItem     │       │StockMovement │ │
//! │  │  code (unique)  │         │  unit_price     │       │  OUT / IN    │ │
//! │  │  price_cents    │         │  line_total     │       │  quantity    │ │
//! │  │  stock ≥ 0      │         └────────┬────────┘       │  reason      │ │
//! │  └───────▲─────────┘                  │                └──────────────┘ │
//! │          │ many-to-many      ┌────────▼────────┐                        │
//! │  ┌───────┴─────────┐         │      Sale       │──► User (seller)       │
//! │  │DiscountCampaign │         │  sale_number    │──► Customer (optional) │
//! │  │  discount_bps   │         │  total / change │                        │
//! │  │  start..=end    │         └─────────────────┘                        │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity
//! Entities carry a UUID `id` for relations plus a human-facing key
//! (`code`, `sale_number`, `username`, `document_number`).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::money::{Money, Percentage};

// =============================================================================
// Roles & Actors
// =============================================================================

/// Operator role. Only admins may exceed the manual-discount ceiling.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Seller,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Seller => "SELLER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The operator performing an action.
///
/// Passed explicitly into cart and checkout calls; there is no ambient
/// "current user".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Actor {
    pub user_id: String,
    pub username: String,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, username: impl Into<String>, role: Role) -> Self {
        Actor {
            user_id: user_id.into(),
            username: username.into(),
            role,
        }
    }

    #[inline]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Actor {
            user_id: user.id.clone(),
            username: user.username.clone(),
            role: user.role,
        }
    }
}

/// An operator account.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct User {
    pub id: String,
    pub username: String,
    pub full_name: String,
    /// PHC-format hash. Never serialized to clients.
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Product
// =============================================================================

/// A sellable catalog item: single card, sealed product or accessory.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Business code. Unique and immutable after creation.
    pub code: String,

    pub name: String,

    /// "Single", "Booster", "ETB", "Accessory", ...
    pub category: Option<String>,

    /// Card set / expansion name.
    pub expansion: Option<String>,

    pub language: Option<String>,

    pub rarity: Option<String>,

    /// "Holo", "Reverse Holo", "Normal", ...
    pub finish: Option<String>,

    /// List price in cents.
    pub price_cents: i64,

    /// Suggested resale price, informational only. Never charged.
    pub sale_price_cents: Option<i64>,

    /// Units on hand. Never negative.
    pub stock: i64,

    /// Low-stock threshold for reporting.
    pub min_stock: i64,

    /// Soft-delete flag.
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the list price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// At or below the reorder threshold.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock
    }
}

/// Input for creating or editing a product.
///
/// `code` is only honoured on insert.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductDraft {
    pub code: String,
    pub name: String,
    pub category: Option<String>,
    pub expansion: Option<String>,
    pub language: Option<String>,
    pub rarity: Option<String>,
    pub finish: Option<String>,
    pub price_cents: i64,
    pub sale_price_cents: Option<i64>,
    pub stock: i64,
    pub min_stock: i64,
}

// =============================================================================
// Discount Campaigns
// =============================================================================

/// A time-boxed percentage discount linked to a set of products.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DiscountCampaign {
    pub id: String,
    pub name: String,
    /// 1500 = 15%.
    pub discount_bps: u32,
    /// First day in effect (inclusive).
    #[ts(as = "String")]
    pub start_date: NaiveDate,
    /// Last day in effect (inclusive).
    #[ts(as = "String")]
    pub end_date: NaiveDate,
    pub is_active: bool,
    pub created_by: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl DiscountCampaign {
    #[inline]
    pub fn percentage(&self) -> Percentage {
        Percentage::from_bps(self.discount_bps)
    }

    /// True when the campaign is active and `day` falls inside its window.
    pub fn is_in_effect_on(&self, day: NaiveDate) -> bool {
        self.is_active && self.start_date <= day && day <= self.end_date
    }
}

/// Input for creating or editing a campaign.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CampaignDraft {
    pub name: String,
    pub discount_bps: u32,
    #[ts(as = "String")]
    pub start_date: NaiveDate,
    #[ts(as = "String")]
    pub end_date: NaiveDate,
    pub is_active: bool,
}

/// Campaign details frozen onto a cart line for receipts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CampaignInfo {
    pub campaign_id: String,
    pub name: String,
    pub discount_bps: u32,
}

impl From<&DiscountCampaign> for CampaignInfo {
    fn from(campaign: &DiscountCampaign) -> Self {
        CampaignInfo {
            campaign_id: campaign.id.clone(),
            name: campaign.name.clone(),
            discount_bps: campaign.discount_bps,
        }
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How the customer paid. One method per sale.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    /// Physical cash; the only method that produces change.
    Cash,
    /// Card on an external terminal.
    Card,
    /// Yape mobile wallet.
    Yape,
    /// Plin mobile wallet.
    Plin,
    BankTransfer,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 5] = [
        PaymentMethod::Cash,
        PaymentMethod::Card,
        PaymentMethod::Yape,
        PaymentMethod::Plin,
        PaymentMethod::BankTransfer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "CASH",
            PaymentMethod::Card => "CARD",
            PaymentMethod::Yape => "YAPE",
            PaymentMethod::Plin => "PLIN",
            PaymentMethod::BankTransfer => "BANK_TRANSFER",
        }
    }

    #[inline]
    pub fn is_cash(&self) -> bool {
        matches!(self, PaymentMethod::Cash)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unrecognised payment method names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown payment method '{0}'")]
pub struct UnknownPaymentMethod(pub String);

impl FromStr for PaymentMethod {
    type Err = UnknownPaymentMethod;

    /// Case-insensitive; accepts `bank_transfer`, `bank-transfer`, `transfer`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        match normalized.as_str() {
            "CASH" => Ok(PaymentMethod::Cash),
            "CARD" => Ok(PaymentMethod::Card),
            "YAPE" => Ok(PaymentMethod::Yape),
            "PLIN" => Ok(PaymentMethod::Plin),
            "BANK_TRANSFER" | "TRANSFER" => Ok(PaymentMethod::BankTransfer),
            _ => Err(UnknownPaymentMethod(s.trim().to_string())),
        }
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A committed sale header. Immutable once written.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Sale {
    pub id: String,
    /// `V{yyyyMMdd}-{HHmmss}`, with `-N` appended for same-second sales.
    pub sale_number: String,
    /// Seller who rang up the sale.
    pub user_id: String,
    pub customer_id: Option<String>,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    pub amount_received_cents: i64,
    pub change_cents: i64,
    pub note: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn change(&self) -> Money {
        Money::from_cents(self.change_cents)
    }
}

/// A line of a committed sale. Snapshot of the price actually charged.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    /// unit_price_cents × quantity.
    pub line_total_cents: i64,
}

impl SaleItem {
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

// =============================================================================
// Stock Ledger
// =============================================================================

/// Direction of a stock movement.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum MovementType {
    /// Units leaving the shop (sales).
    Out,
    /// Units arriving (restock).
    In,
}

/// Append-only audit record mirroring every stock change.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockMovement {
    pub id: String,
    pub product_id: String,
    pub movement_type: MovementType,
    /// Always positive; direction comes from `movement_type`.
    pub quantity: i64,
    /// e.g. "SALE V20250301-143000".
    pub reason: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Customer
// =============================================================================

/// A registered customer, optionally attached to a sale.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Customer {
    pub id: String,
    /// "DNI", "RUC", "CE", ...
    pub document_type: String,
    pub document_number: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Input for registering a customer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerDraft {
    pub document_type: String,
    pub document_number: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================
