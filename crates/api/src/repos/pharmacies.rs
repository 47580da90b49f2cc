//! Pharmacy profile repository for PostgreSQL.

use anyhow::Result;
use async_trait::async_trait;
use shared::api::{PharmacyProfilePayload, PharmacySearchQuery};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::models::Pharmacy;

/// Discovery results are paged five at a time, like the catalog search.
pub const SEARCH_PAGE_SIZE: i64 = 5;

/// Repository for pharmacy profiles and the review rating aggregate.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PharmacyRepo: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Pharmacy>>;

    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<Pharmacy>>;

    /// Create or update the profile owned by `user_id`. Moderation fields
    /// (`verified`, `rejection_message`) and the rating aggregate are never
    /// touched by a profile write.
    async fn upsert_profile(&self, user_id: Uuid, profile: PharmacyProfilePayload) -> Result<()>;

    /// Filtered discovery search; all filters optional, paged via `next`.
    async fn search(&self, filter: PharmacySearchQuery) -> Result<Vec<Pharmacy>>;

    /// Atomically shift the rating aggregate. Deltas commute, so concurrent
    /// review writes cannot clobber each other's update. Returns false when
    /// the pharmacy no longer exists.
    async fn apply_rating_delta(
        &self,
        id: Uuid,
        rate_delta: f64,
        count_delta: i64,
    ) -> Result<bool>;
}

/// PostgreSQL implementation of [`PharmacyRepo`].
#[derive(Clone)]
pub struct PgPharmacyRepo {
    pool: Pool<Postgres>,
}

impl PgPharmacyRepo {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PharmacyRepo for PgPharmacyRepo {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Pharmacy>> {
        let pharmacy = sqlx::query_as::<_, Pharmacy>("SELECT * FROM pharmacies WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(pharmacy)
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<Pharmacy>> {
        let pharmacy =
            sqlx::query_as::<_, Pharmacy>("SELECT * FROM pharmacies WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(pharmacy)
    }

    async fn upsert_profile(&self, user_id: Uuid, profile: PharmacyProfilePayload) -> Result<()> {
        sqlx::query(
            "INSERT INTO pharmacies \
                 (user_id, license_number, pharmacy_name, description, phone_number, \
                  street, city, state, zip_code, lat, lng, open_hours, website, \
                  person_name, delivery) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             ON CONFLICT (user_id) DO UPDATE SET \
                 license_number = EXCLUDED.license_number, \
                 pharmacy_name = EXCLUDED.pharmacy_name, \
                 description = EXCLUDED.description, \
                 phone_number = EXCLUDED.phone_number, \
                 street = EXCLUDED.street, \
                 city = EXCLUDED.city, \
                 state = EXCLUDED.state, \
                 zip_code = EXCLUDED.zip_code, \
                 lat = EXCLUDED.lat, \
                 lng = EXCLUDED.lng, \
                 open_hours = EXCLUDED.open_hours, \
                 website = EXCLUDED.website, \
                 person_name = EXCLUDED.person_name, \
                 delivery = EXCLUDED.delivery, \
                 updated_at = now()",
        )
        .bind(user_id)
        .bind(&profile.license_number)
        .bind(&profile.pharmacy_name)
        .bind(&profile.description)
        .bind(&profile.phone_number)
        .bind(&profile.address.street)
        .bind(&profile.address.city)
        .bind(&profile.address.state)
        .bind(&profile.address.zip_code)
        .bind(profile.location.lat)
        .bind(profile.location.lng)
        .bind(serde_json::to_value(&profile.open_hours)?)
        .bind(&profile.website)
        .bind(&profile.person_name)
        .bind(profile.delivery)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn search(&self, filter: PharmacySearchQuery) -> Result<Vec<Pharmacy>> {
        // Haversine distance against the stored lat/lng; geocoding the query
        // address is a client concern.
        let pharmacies = sqlx::query_as::<_, Pharmacy>(
            "SELECT * FROM pharmacies \
             WHERE ($1::text IS NULL OR pharmacy_name ILIKE '%' || $1 || '%') \
               AND ($2::text IS NULL \
                    OR street ILIKE '%' || $2 || '%' \
                    OR city ILIKE '%' || $2 || '%' \
                    OR state ILIKE '%' || $2 || '%') \
               AND ($3::float8 IS NULL OR $4::float8 IS NULL OR $5::float8 IS NULL \
                    OR 2 * 6371000 * asin(sqrt( \
                         pow(sin(radians(lat - $3) / 2), 2) \
                         + cos(radians($3)) * cos(radians(lat)) \
                           * pow(sin(radians(lng - $4) / 2), 2))) <= $5) \
               AND ($6::boolean IS NULL OR delivery = $6) \
               AND ($7::float8 IS NULL \
                    OR (ratings_count > 0 AND rating_sum / ratings_count >= $7)) \
             ORDER BY created_at DESC \
             OFFSET $8 LIMIT $9",
        )
        .bind(&filter.name)
        .bind(&filter.address)
        .bind(filter.lat)
        .bind(filter.lng)
        .bind(filter.distance)
        .bind(filter.delivery)
        .bind(filter.rating)
        .bind(filter.next * SEARCH_PAGE_SIZE)
        .bind(SEARCH_PAGE_SIZE)
        .fetch_all(&self.pool)
        .await?;

        Ok(pharmacies)
    }

    async fn apply_rating_delta(
        &self,
        id: Uuid,
        rate_delta: f64,
        count_delta: i64,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE pharmacies SET \
                 rating_sum = rating_sum + $2, \
                 ratings_count = ratings_count + $3, \
                 updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(rate_delta)
        .bind(count_delta)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
