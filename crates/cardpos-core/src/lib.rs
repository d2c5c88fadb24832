//! # cardpos-core: Pure Business Logic for CardPOS
//!
//! Everything that decides *what* a sale is worth and *whether* it may
//! happen, as plain functions and in-memory types. No I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        CardPOS Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 apps/register (terminal)                        │   │
//! │  │   login ──► find ──► add / qty / rm ──► discount ──► pay        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ cardpos-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │  ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌────────┐ ┌──────────┐  │   │
//! │  │  │  money  │ │ pricing │ │ discount │ │  cart  │ │ checkout │  │   │
//! │  │  │ Money   │ │ resolve │ │ Policy   │ │ Cart   │ │ plan     │  │   │
//! │  │  │ Percent │ │ _price  │ │ Denial   │ │ Line   │ │ tender   │  │   │
//! │  │  └─────────┘ └─────────┘ └──────────┘ └────────┘ └──────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK                             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 cardpos-db (Database Layer)                     │   │
//! │  │     repositories, PriceResolver, CheckoutCoordinator, ledger    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money and Percentage, integer arithmetic only
//! - [`types`] - Product, DiscountCampaign, Sale, SaleItem, StockMovement, ...
//! - [`pricing`] - Campaign price resolution with deterministic tie-break
//! - [`discount`] - Manual discount authorization by role
//! - [`cart`] - The cart aggregate and its invariants
//! - [`checkout`] - Checkout validation, tender settlement, state machine
//! - [`sale_number`] - Sale number formatting
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use cardpos_core::money::{Money, Percentage};
//!
//! // 15.00 under a 15% campaign
//! let price = Money::from_cents(1500);
//! let charged = price.apply_percentage_discount(Percentage::from_whole(15));
//! assert_eq!(charged.to_string(), "12.75");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod checkout;
pub mod discount;
pub mod error;
pub mod money;
pub mod pricing;
pub mod sale_number;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartLine, CartTotals};
pub use checkout::{CheckoutPlan, CheckoutRequest, CheckoutState, Tender};
pub use discount::{AppliedDiscount, DiscountDenial, DiscountPolicy, ManualDiscount};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, Percentage};
pub use pricing::ResolvedPrice;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines in one cart.
pub const MAX_CART_LINES: usize = 100;

/// Maximum quantity on a single line.
///
/// Guards against typing 1000 instead of 10.
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Highest catalog price accepted, in minor units (100,000,000.00).
///
/// Keeps every cart total well inside `i64`.
pub const MAX_PRICE_CENTS: i64 = 10_000_000_000;

/// Manual-discount ceiling for sellers when the shop configures none (20%).
pub const DEFAULT_SELLER_DISCOUNT_CEILING_BPS: u32 = 2_000;
