//! Customer profile repository for PostgreSQL.

use anyhow::Result;
use async_trait::async_trait;
use shared::api::CustomerProfilePayload;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::models::Customer;

/// Repository for customer profiles (one per customer account).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CustomerRepo: Send + Sync {
    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<Customer>>;

    /// Create or replace the profile owned by `user_id`.
    async fn upsert_profile(&self, user_id: Uuid, profile: CustomerProfilePayload) -> Result<()>;
}

/// PostgreSQL implementation of [`CustomerRepo`].
#[derive(Clone)]
pub struct PgCustomerRepo {
    pool: Pool<Postgres>,
}

impl PgCustomerRepo {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CustomerRepo for PgCustomerRepo {
    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<Customer>> {
        let customer =
            sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(customer)
    }

    async fn upsert_profile(&self, user_id: Uuid, profile: CustomerProfilePayload) -> Result<()> {
        let conditions: Vec<String> = profile
            .health_conditions
            .iter()
            .map(|c| c.as_str().to_owned())
            .collect();

        sqlx::query(
            "INSERT INTO customers \
                 (user_id, phone_number, alternate_phone_number, date_of_birth, \
                  street, city, state, zip_code, health_conditions) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (user_id) DO UPDATE SET \
                 phone_number = EXCLUDED.phone_number, \
                 alternate_phone_number = EXCLUDED.alternate_phone_number, \
                 date_of_birth = EXCLUDED.date_of_birth, \
                 street = EXCLUDED.street, \
                 city = EXCLUDED.city, \
                 state = EXCLUDED.state, \
                 zip_code = EXCLUDED.zip_code, \
                 health_conditions = EXCLUDED.health_conditions, \
                 updated_at = now()",
        )
        .bind(user_id)
        .bind(&profile.phone_number)
        .bind(&profile.alternate_phone_number)
        .bind(profile.date_of_birth)
        .bind(&profile.delivery_address.street)
        .bind(&profile.delivery_address.city)
        .bind(&profile.delivery_address.state)
        .bind(&profile.delivery_address.zip_code)
        .bind(&conditions)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
