//! # Product Repository
//!
//! Catalog storage: singles, sealed product and accessories.
//!
//! ## Key Operations
//! - Substring search over code, name and expansion
//! - CRUD with soft delete
//! - Restock (stock increment + IN movement in one transaction)
//!
//! ## Search
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Operator types: "char"                                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  pattern = "%char%"   (%, _ and \ in the input are escaped)             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  code LIKE pattern OR name LIKE pattern OR expansion LIKE pattern       │
//! │  AND is_active = 1                                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  PKM-OBF-125  | Charizard ex     | Obsidian Flames  ← match             │
//! │  PKM-BS-004   | Charizard        | Base Set         ← match             │
//! │  PKM-PAL-001  | Pineco           | Paldea Evolved                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::stock::StockLedger;
use cardpos_core::{MovementType, Product, ProductDraft};

const PRODUCT_COLUMNS: &str = "id, code, name, category, expansion, language, rarity, finish, \
     price_cents, sale_price_cents, stock, min_stock, is_active, created_at, updated_at";

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
///
/// let results = repo.search("charizard", 20).await?;
/// let product = repo.get_by_code("PKM-OBF-125").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Searches active products by code, name or expansion.
    ///
    /// An empty query lists active products by name.
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Product>> {
        let query = query.trim();

        debug!(query = %query, limit = %limit, "Searching products");

        if query.is_empty() {
            return self.list_active(limit).await;
        }

        let pattern = format!("%{}%", escape_like(query));
        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE is_active = 1
              AND (code LIKE ?1 ESCAPE '\'
                   OR name LIKE ?1 ESCAPE '\'
                   OR expansion LIKE ?1 ESCAPE '\')
            ORDER BY name, code
            LIMIT ?2
            "#
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(&pattern)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    async fn list_active(&self, limit: u32) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active = 1 ORDER BY name, code LIMIT ?1"
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Gets a product by ID, active or not.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Gets a product by its business code (exact match).
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE code = ?1");

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(code.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Loads a product on the caller's connection, so checkout sees the
    /// stock as of its own transaction.
    pub async fn fetch_on(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(product)
    }

    /// Inserts a new product.
    ///
    /// ## Errors
    /// `UniqueViolation { field: "code" }` when the code is taken.
    pub async fn insert(&self, draft: &ProductDraft) -> DbResult<Product> {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            code: draft.code.trim().to_string(),
            name: draft.name.trim().to_string(),
            category: draft.category.clone(),
            expansion: draft.expansion.clone(),
            language: draft.language.clone(),
            rarity: draft.rarity.clone(),
            finish: draft.finish.clone(),
            price_cents: draft.price_cents,
            sale_price_cents: draft.sale_price_cents,
            stock: draft.stock,
            min_stock: draft.min_stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, code = %product.code, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, code, name, category, expansion, language, rarity, finish,
                price_cents, sale_price_cents, stock, min_stock, is_active,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8,
                ?9, ?10, ?11, ?12, ?13,
                ?14, ?15
            )
            "#,
        )
        .bind(&product.id)
        .bind(&product.code)
        .bind(&product.name)
        .bind(&product.category)
        .bind(&product.expansion)
        .bind(&product.language)
        .bind(&product.rarity)
        .bind(&product.finish)
        .bind(product.price_cents)
        .bind(product.sale_price_cents)
        .bind(product.stock)
        .bind(product.min_stock)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("code", &product.code),
            other => other,
        })?;

        Ok(product)
    }

    /// Updates an existing product's details. The code never changes.
    ///
    /// Writing `stock` here is an inventory correction and leaves no
    /// movement record; use [`restock`](Self::restock) for deliveries.
    pub async fn update(&self, id: &str, draft: &ProductDraft) -> DbResult<Product> {
        debug!(id = %id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                category = ?3,
                expansion = ?4,
                language = ?5,
                rarity = ?6,
                finish = ?7,
                price_cents = ?8,
                sale_price_cents = ?9,
                stock = ?10,
                min_stock = ?11,
                updated_at = ?12
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(draft.name.trim())
        .bind(&draft.category)
        .bind(&draft.expansion)
        .bind(&draft.language)
        .bind(&draft.rarity)
        .bind(&draft.finish)
        .bind(draft.price_cents)
        .bind(draft.sale_price_cents)
        .bind(draft.stock)
        .bind(draft.min_stock)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Soft-deletes a product (sets is_active = 0).
    ///
    /// Sold products stay referenced by their sale items; nothing is
    /// physically removed.
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deactivating product");

        let result = sqlx::query("UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Receives `quantity` units of a product.
    ///
    /// The stock increment and its IN movement commit together.
    pub async fn restock(&self, id: &str, quantity: i64, reason: &str) -> DbResult<Product> {
        info!(id = %id, quantity, reason = %reason, "Restocking product");

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        StockLedger::increment(&mut *tx, id, quantity, now).await?;
        StockLedger::record_movement(&mut *tx, id, MovementType::In, quantity, reason, now)
            .await?;

        let product = Self::fetch_on(&mut *tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(product)
    }

    /// Active products at or below their minimum stock, emptiest first.
    pub async fn list_low_stock(&self) -> DbResult<Vec<Product>> {
        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE is_active = 1 AND stock <= min_stock
            ORDER BY stock, name
            "#
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Counts active products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Escapes LIKE wildcards so operator input matches literally.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    pub(crate) fn draft(code: &str, price_cents: i64, stock: i64) -> ProductDraft {
        ProductDraft {
            code: code.to_string(),
            name: format!("Card {code}"),
            category: Some("Single".to_string()),
            expansion: Some("Obsidian Flames".to_string()),
            price_cents,
            stock,
            min_stock: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%"), "50\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let inserted = repo.insert(&draft("PKM-001", 1500, 5)).await.unwrap();
        let by_id = repo.get_by_id(&inserted.id).await.unwrap().unwrap();
        assert_eq!(by_id.code, "PKM-001");
        assert_eq!(by_id.price_cents, 1500);
        assert!(by_id.is_active);

        let by_code = repo.get_by_code("PKM-001").await.unwrap().unwrap();
        assert_eq!(by_code.id, inserted.id);
        assert!(repo.get_by_code("NOPE").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        repo.insert(&draft("PKM-001", 1500, 5)).await.unwrap();
        let err = repo.insert(&draft("PKM-001", 900, 1)).await.unwrap_err();
        match err {
            DbError::UniqueViolation { field, value } => {
                assert_eq!(field, "code");
                assert_eq!(value, "PKM-001");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_search_matches_code_name_expansion() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let mut charizard = draft("PKM-OBF-125", 4500, 1);
        charizard.name = "Charizard ex".to_string();
        repo.insert(&charizard).await.unwrap();

        let mut pineco = draft("PKM-PAL-001", 50, 10);
        pineco.name = "Pineco".to_string();
        pineco.expansion = Some("Paldea Evolved".to_string());
        repo.insert(&pineco).await.unwrap();

        assert_eq!(repo.search("charizard", 20).await.unwrap().len(), 1);
        assert_eq!(repo.search("pal-001", 20).await.unwrap().len(), 1);
        assert_eq!(repo.search("paldea", 20).await.unwrap().len(), 1);
        assert_eq!(repo.search("", 20).await.unwrap().len(), 2);
        assert!(repo.search("%", 20).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deactivated_hidden_from_search() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let p = repo.insert(&draft("PKM-001", 1500, 5)).await.unwrap();
        repo.deactivate(&p.id).await.unwrap();

        assert!(repo.search("PKM", 20).await.unwrap().is_empty());
        assert_eq!(repo.count().await.unwrap(), 0);
        let stored = repo.get_by_id(&p.id).await.unwrap().unwrap();
        assert!(!stored.is_active);
    }

    #[tokio::test]
    async fn test_update_keeps_code() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let p = repo.insert(&draft("PKM-001", 1500, 5)).await.unwrap();
        let mut edit = draft("OTHER", 1800, 7);
        edit.name = "Renamed".to_string();
        let updated = repo.update(&p.id, &edit).await.unwrap();

        assert_eq!(updated.code, "PKM-001");
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.price_cents, 1800);
        assert_eq!(updated.stock, 7);

        let err = repo.update("missing", &edit).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_restock_records_movement() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let p = repo.insert(&draft("PKM-001", 1500, 0)).await.unwrap();
        let restocked = repo.restock(&p.id, 12, "Distributor delivery").await.unwrap();
        assert_eq!(restocked.stock, 12);

        let movements = db.stock().movements_for(&p.id).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].movement_type, MovementType::In);
        assert_eq!(movements[0].quantity, 12);
    }

    #[tokio::test]
    async fn test_low_stock() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        repo.insert(&draft("LOW", 100, 1)).await.unwrap();
        repo.insert(&draft("OK", 100, 10)).await.unwrap();

        let low = repo.list_low_stock().await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].code, "LOW");
    }
}
