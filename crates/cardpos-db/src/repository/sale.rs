//! # Sale Repository
//!
//! Read access to committed sales. Sales are written only by the
//! [`CheckoutCoordinator`](crate::checkout::CheckoutCoordinator) and never
//! updated afterwards.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Cart (in memory) ──checkout──► sales + sale_items + stock_movements    │
//! │                                  │    (one transaction)                 │
//! │                                  ▼                                      │
//! │        get_by_number / items_for / list_between / list_for_customer     │
//! │                                  (read-only from here on)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use cardpos_core::{Money, Sale, SaleItem};

const SALE_COLUMNS: &str = "id, sale_number, user_id, customer_id, subtotal_cents, \
     discount_cents, total_cents, payment_method, amount_received_cents, change_cents, note, \
     created_at, updated_at";

#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1");

        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sale)
    }

    /// Looks a sale up by its receipt number, e.g. `V20250301-101500`.
    pub async fn get_by_number(&self, sale_number: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE sale_number = ?1");

        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(sale_number.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(sale)
    }

    /// Items of a sale in the order they were rung up.
    pub async fn items_for(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(
            r#"
            SELECT id, sale_id, product_id, quantity, unit_price_cents, line_total_cents
            FROM sale_items
            WHERE sale_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Sales created in `[from, to)`, oldest first.
    pub async fn list_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<Sale>> {
        debug!(%from, %to, "Listing sales");

        let sql = format!(
            r#"
            SELECT {SALE_COLUMNS}
            FROM sales
            WHERE created_at >= ?1 AND created_at < ?2
            ORDER BY created_at, rowid
            "#
        );

        let sales = sqlx::query_as::<_, Sale>(&sql)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;

        Ok(sales)
    }

    /// A customer's purchases, newest first, at most `limit`.
    pub async fn list_for_customer(&self, customer_id: &str, limit: u32) -> DbResult<Vec<Sale>> {
        debug!(customer_id = %customer_id, limit, "Listing customer purchases");

        let sql = format!(
            r#"
            SELECT {SALE_COLUMNS}
            FROM sales
            WHERE customer_id = ?1
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?2
            "#
        );

        let sales = sqlx::query_as::<_, Sale>(&sql)
            .bind(customer_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(sales)
    }

    /// Sum of sale totals in `[from, to)`.
    pub async fn total_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> DbResult<Money> {
        let total: Option<i64> = sqlx::query_scalar(
            "SELECT SUM(total_cents) FROM sales WHERE created_at >= ?1 AND created_at < ?2",
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok(Money::from_cents(total.unwrap_or(0)))
    }

    /// Number of committed sales.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
