//! # Customer Repository
//!
//! Registered customers, identified by their document number.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use cardpos_core::{Customer, CustomerDraft};

const CUSTOMER_COLUMNS: &str = "id, document_type, document_number, name, phone, email, \
     address, notes, is_active, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Registers a customer.
    ///
    /// ## Errors
    /// `UniqueViolation { field: "document_number" }` on a repeat document.
    pub async fn create(&self, draft: &CustomerDraft) -> DbResult<Customer> {
        let now = Utc::now();
        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            document_type: draft.document_type.trim().to_uppercase(),
            document_number: draft.document_number.trim().to_string(),
            name: draft.name.trim().to_string(),
            phone: draft.phone.clone(),
            email: draft.email.clone(),
            address: draft.address.clone(),
            notes: draft.notes.clone(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %customer.id, document = %customer.document_number, "Creating customer");

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, document_type, document_number, name, phone, email,
                address, notes, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.document_type)
        .bind(&customer.document_number)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(&customer.email)
        .bind(&customer.address)
        .bind(&customer.notes)
        .bind(customer.is_active)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => {
                DbError::duplicate("document_number", &customer.document_number)
            }
            other => other,
        })?;

        Ok(customer)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1");

        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(customer)
    }

    pub async fn get_by_document(&self, document_number: &str) -> DbResult<Option<Customer>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE document_number = ?1");

        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(document_number.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(customer)
    }

    /// Active customers whose name or document starts with `query`.
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Customer>> {
        let pattern = format!("{}%", query.trim().replace(['%', '_'], ""));
        let sql = format!(
            r#"
            SELECT {CUSTOMER_COLUMNS}
            FROM customers
            WHERE is_active = 1
              AND (name LIKE ?1 OR document_number LIKE ?1)
            ORDER BY name
            LIMIT ?2
            "#
        );

        let customers = sqlx::query_as::<_, Customer>(&sql)
            .bind(&pattern)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(customers)
    }

    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE customers SET is_active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        Ok(())
    }

    /// True when an active customer with this id exists.
    pub async fn exists(&self, id: &str) -> DbResult<bool> {
        let mut conn = self.pool.acquire().await?;
        Self::exists_on(&mut conn, id).await
    }

    /// [`exists`](Self::exists) on the caller's connection.
    pub async fn exists_on(conn: &mut SqliteConnection, id: &str) -> DbResult<bool> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM customers WHERE id = ?1 AND is_active = 1")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;

        Ok(found.is_some())
    }
}
