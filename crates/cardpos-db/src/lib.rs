//! # cardpos-db: Database Layer for CardPOS
//!
//! SQLite storage for the card shop register, including the atomic checkout.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        CardPOS Data Flow                                │
//! │                                                                         │
//! │  Register command (add_to_cart, checkout, ...)                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                   cardpos-db (THIS CRATE)                       │    │
//! │  │                                                                 │    │
//! │  │  ┌────────────┐  ┌────────────────┐  ┌────────────────────┐     │    │
//! │  │  │  Database  │  │  Repositories  │  │ CheckoutCoordinator│     │    │
//! │  │  │ (pool.rs)  │◄─│ products       │  │  one transaction   │     │    │
//! │  │  │ SqlitePool │  │ campaigns      │  │  per sale          │     │    │
//! │  │  │ migrations │  │ sales, stock   │  │                    │     │    │
//! │  │  └────────────┘  │ customers/users│  └────────────────────┘     │    │
//! │  │                  └────────────────┘                             │    │
//! │  │  PriceResolver: campaigns → cardpos_core::pricing, list price   │    │
//! │  │                 on lookup failure                               │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (WAL)                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//! - [`pricing`] - Campaign-aware price resolution
//! - [`checkout`] - The sale transaction coordinator
//! - [`auth`] - Password hashing
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cardpos_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("cardpos.db")).await?;
//!
//! let product = db.products().get_by_code("PKM-OBF-125").await?;
//! let price = db.pricing().resolve_today(&product).await;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod auth;
pub mod checkout;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod pricing;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use checkout::{CheckoutCoordinator, CheckoutError, CommittedSale};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use pricing::PriceResolver;

pub use repository::campaign::CampaignRepository;
pub use repository::customer::CustomerRepository;
pub use repository::product::ProductRepository;
pub use repository::sale::SaleRepository;
pub use repository::stock::StockLedger;
pub use repository::user::UserRepository;
