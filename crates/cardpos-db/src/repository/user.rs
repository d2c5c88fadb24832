//! # User Repository
//!
//! Operator accounts and login.
//!
//! ## Login Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  authenticate("seller", "****")                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SELECT ... WHERE username = ? (case-insensitive)                       │
//! │       │                                                                 │
//! │       ├── no row / is_active = 0 ──────────────► None                   │
//! │       ▼                                                                 │
//! │  argon2 verify(password, password_hash)                                 │
//! │       ├── mismatch ────────────────────────────► None                   │
//! │       ▼                                                                 │
//! │  Some(User) → Actor for the register session                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The three failure cases are indistinguishable to the caller.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::{hash_password, verify_password};
use crate::error::{DbError, DbResult};
use cardpos_core::{Role, User};

const USER_COLUMNS: &str =
    "id, username, full_name, password_hash, role, is_active, created_at, updated_at";

/// Accounts created on first start when absent: (username, full name, password, role).
const DEFAULT_USERS: [(&str, &str, &str, Role); 2] = [
    ("admin", "Administrator", "admin", Role::Admin),
    ("seller", "Shop Seller", "seller", Role::Seller),
];

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Creates an account with a freshly hashed password.
    pub async fn create(
        &self,
        username: &str,
        full_name: &str,
        password: &str,
        role: Role,
    ) -> DbResult<User> {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            username: username.trim().to_string(),
            full_name: full_name.trim().to_string(),
            password_hash: hash_password(password)?,
            role,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %user.id, username = %user.username, role = %role, "Creating user");

        sqlx::query(
            r#"
            INSERT INTO users (
                id, username, full_name, password_hash, role, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.full_name)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(user.is_active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("username", &user.username),
            other => other,
        })?;

        Ok(user)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Case-insensitive lookup.
    pub async fn get_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1");

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Checks credentials. `None` for an unknown user, an inactive account
    /// or a wrong password.
    pub async fn authenticate(&self, username: &str, password: &str) -> DbResult<Option<User>> {
        let user = match self.get_by_username(username).await? {
            Some(user) if user.is_active => user,
            _ => {
                warn!(username = %username.trim(), "Login rejected");
                return Ok(None);
            }
        };

        if !verify_password(password, &user.password_hash) {
            warn!(username = %user.username, "Login rejected");
            return Ok(None);
        }

        info!(username = %user.username, role = %user.role, "User logged in");
        Ok(Some(user))
    }

    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE users SET is_active = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        Ok(())
    }

    /// Creates the default admin and seller accounts if missing.
    ///
    /// ## Returns
    /// Number of accounts created (0 on every start after the first).
    pub async fn ensure_default_users(&self) -> DbResult<usize> {
        let mut created = 0;

        for (username, full_name, password, role) in DEFAULT_USERS {
            if self.get_by_username(username).await?.is_some() {
                continue;
            }
            self.create(username, full_name, password, role).await?;
            info!(username = %username, role = %role, "Created default user");
            created += 1;
        }

        Ok(created)
    }
}
