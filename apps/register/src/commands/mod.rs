//! # Register Commands
//!
//! Everything the terminal can ask the register to do.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs      ◄─── You are here (exports)
//! ├── auth.rs     ◄─── Operator login
//! ├── product.rs  ◄─── Product search with effective prices
//! ├── cart.rs     ◄─── Cart manipulation and manual discounts
//! ├── customer.rs ◄─── Customer registration and lookup
//! └── sale.rs     ◄─── Checkout and receipts
//! ```
//!
//! ## How Commands Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  terminal: "add PKM-OBF-125 2"                                          │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  cart::add_to_cart(&db, &mut session, "PKM-OBF-125", Some(2))           │
//! │         │    ├── db: repositories, price resolver, checkout             │
//! │         │    └── session: actor, cart, discount policy                  │
//! │         ▼                                                               │
//! │  Result<CartResponse, ApiError> ──► rendered by the terminal            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Commands take only what they need: the database handle and/or the
//! operator's session. They hold no state of their own.

pub mod auth;
pub mod cart;
pub mod customer;
pub mod product;
pub mod sale;

#[cfg(test)]
pub(crate) mod test_support {
    use cardpos_core::ProductDraft;
    use cardpos_db::{Database, DbConfig};

    use crate::session::RegisterSession;

    /// In-memory shop with the default accounts and the given
    /// `(code, price_cents, stock)` singles.
    pub(crate) async fn shop(products: &[(&str, i64, i64)]) -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.users().ensure_default_users().await.unwrap();

        for (code, price_cents, stock) in products {
            db.products()
                .insert(&ProductDraft {
                    code: code.to_string(),
                    name: format!("Card {code}"),
                    category: Some("Single".to_string()),
                    expansion: Some("Paldea Evolved".to_string()),
                    price_cents: *price_cents,
                    stock: *stock,
                    min_stock: 1,
                    ..Default::default()
                })
                .await
                .unwrap();
        }

        db
    }

    pub(crate) async fn login_as(db: &Database, username: &str) -> RegisterSession {
        super::auth::login(db, username, username, Default::default())
            .await
            .unwrap()
    }
}
