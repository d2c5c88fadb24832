//! # Repository Module
//!
//! One repository per aggregate, all over the same pool.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  db.products()   ProductRepository    catalog CRUD, search, restock     │
//! │  db.campaigns()  CampaignRepository   campaigns + product links         │
//! │  db.customers()  CustomerRepository   customers by document             │
//! │  db.users()      UserRepository       operators, login                  │
//! │  db.sales()      SaleRepository       committed sales (read only)       │
//! │  db.stock()      StockLedger          stock counter + movement log      │
//! │                                                                         │
//! │  Methods taking `&mut SqliteConnection` run inside a caller's           │
//! │  transaction; the rest use the pool directly.                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod campaign;
pub mod customer;
pub mod product;
pub mod sale;
pub mod stock;
pub mod user;
