//! User repository for PostgreSQL.

use anyhow::Result;
use async_trait::async_trait;
use shared::api::UserRole;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::models::{NewUser, User};

/// Repository for durable account records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepo: Send + Sync {
    /// True if an account exists for this (email, role) pair.
    async fn exists(&self, email: &str, role: UserRole) -> Result<bool>;

    /// Find an account by (email, role).
    async fn find(&self, email: &str, role: UserRole) -> Result<Option<User>>;

    /// Find an account by ID.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Create an account from a verified signup. The password is hashed.
    async fn create(&self, user: NewUser) -> Result<User>;

    /// Replace the stored password hash. Returns false when no account
    /// matches the (email, role) pair.
    async fn set_password(&self, email: &str, role: UserRole, password_hash: &str)
    -> Result<bool>;
}

/// PostgreSQL implementation of [`UserRepo`].
#[derive(Clone)]
pub struct PgUserRepo {
    pool: Pool<Postgres>,
}

impl PgUserRepo {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn exists(&self, email: &str, role: UserRole) -> Result<bool> {
        let found: Option<i32> =
            sqlx::query_scalar("SELECT 1 FROM users WHERE email = $1 AND role = $2")
                .bind(email)
                .bind(role.as_str())
                .fetch_optional(&self.pool)
                .await?;
        Ok(found.is_some())
    }

    async fn find(&self, email: &str, role: UserRole) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE email = $1 AND role = $2",
        )
        .bind(email)
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn create(&self, user: NewUser) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (full_name, email, role, password) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(&user.full_name)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(&user.password)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn set_password(
        &self,
        email: &str,
        role: UserRole,
        password_hash: &str,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE users SET password = $3, updated_at = now() \
             WHERE email = $1 AND role = $2",
        )
        .bind(email)
        .bind(role.as_str())
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
