//! # Stock Ledger
//!
//! The product stock counter and its append-only movement log.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Inside the caller's transaction (checkout or restock):                 │
//! │                                                                         │
//! │  StockLedger::decrement(&mut *tx, product, qty)                         │
//! │       UPDATE products SET stock = stock - qty                           │
//! │       (CHECK stock >= 0 turns a bypassed availability check into an     │
//! │        IntegrityViolation instead of negative stock)                    │
//! │                                                                         │
//! │  StockLedger::record_movement(&mut *tx, product, OUT, qty, reason)      │
//! │       INSERT INTO stock_movements ...   (append-only, never updated)    │
//! │                                                                         │
//! │  Both roll back with the enclosing transaction; no other recovery.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `decrement` does not re-check availability. It must only run after
//! checkout validation passed inside the same transaction.
//!
//! Writes take their timestamp from the caller, so a sale header, its
//! stock updates and its movements all carry the same instant.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use cardpos_core::{MovementType, StockMovement};

/// Stock counter writes (on a caller's connection) and movement reads.
#[derive(Debug, Clone)]
pub struct StockLedger {
    pool: SqlitePool,
}

impl StockLedger {
    pub fn new(pool: SqlitePool) -> Self {
        StockLedger { pool }
    }

    /// Subtracts `quantity` from a product's stock.
    pub async fn decrement(
        conn: &mut SqliteConnection,
        product_id: &str,
        quantity: i64,
        at: DateTime<Utc>,
    ) -> DbResult<()> {
        debug!(product_id = %product_id, quantity, "Decrementing stock");

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock - ?2,
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(product_id)
        .bind(quantity)
        .bind(at)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", product_id));
        }

        Ok(())
    }

    /// Adds `quantity` to a product's stock.
    pub async fn increment(
        conn: &mut SqliteConnection,
        product_id: &str,
        quantity: i64,
        at: DateTime<Utc>,
    ) -> DbResult<()> {
        debug!(product_id = %product_id, quantity, "Incrementing stock");

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock + ?2,
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(product_id)
        .bind(quantity)
        .bind(at)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", product_id));
        }

        Ok(())
    }

    /// Appends a movement record.
    pub async fn record_movement(
        conn: &mut SqliteConnection,
        product_id: &str,
        movement_type: MovementType,
        quantity: i64,
        reason: &str,
        at: DateTime<Utc>,
    ) -> DbResult<StockMovement> {
        let movement = StockMovement {
            id: Uuid::new_v4().to_string(),
            product_id: product_id.to_string(),
            movement_type,
            quantity,
            reason: reason.to_string(),
            created_at: at,
        };

        debug!(
            product_id = %product_id,
            movement_type = ?movement_type,
            quantity,
            reason = %reason,
            "Recording stock movement"
        );

        sqlx::query(
            r#"
            INSERT INTO stock_movements (
                id, product_id, movement_type, quantity, reason, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&movement.id)
        .bind(&movement.product_id)
        .bind(movement.movement_type)
        .bind(movement.quantity)
        .bind(&movement.reason)
        .bind(movement.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(movement)
    }

    /// All movements of a product, oldest first.
    pub async fn movements_for(&self, product_id: &str) -> DbResult<Vec<StockMovement>> {
        debug!(product_id = %product_id, "Loading stock movements");

        let movements = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT id, product_id, movement_type, quantity, reason, created_at
            FROM stock_movements
            WHERE product_id = ?1
            ORDER BY created_at, rowid
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Movements whose reason matches exactly, e.g. `"SALE V20250301-101500"`.
    pub async fn movements_with_reason(&self, reason: &str) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT id, product_id, movement_type, quantity, reason, created_at
            FROM stock_movements
            WHERE reason = ?1
            ORDER BY rowid
            "#,
        )
        .bind(reason)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Net stock change recorded in the ledger (IN − OUT).
    pub async fn net_movement(&self, product_id: &str) -> DbResult<i64> {
        let net: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT SUM(CASE movement_type WHEN 'IN' THEN quantity ELSE -quantity END)
            FROM stock_movements
            WHERE product_id = ?1
            "#,
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(net.unwrap_or(0))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
