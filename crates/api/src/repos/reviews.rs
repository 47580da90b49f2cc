//! Review repositories for PostgreSQL.
//!
//! Pharmacy reviews carry a 1-5 rate and feed the pharmacy rating aggregate;
//! medicine reviews are a free-text append-only log.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::models::{MedicineReviewWithAuthor, Review, ReviewWithAuthor};

/// Repository for pharmacy and medicine reviews.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReviewRepo: Send + Sync {
    /// The one review a user holds for a pharmacy, if any.
    async fn find_by_user_and_pharmacy(
        &self,
        user_id: Uuid,
        pharmacy_id: Uuid,
    ) -> Result<Option<Review>>;

    /// A review scoped to its owner, so users can only touch their own.
    async fn find_by_id_and_user(&self, review_id: Uuid, user_id: Uuid)
    -> Result<Option<Review>>;

    async fn create(
        &self,
        user_id: Uuid,
        pharmacy_id: Uuid,
        rate: i32,
        content: Option<String>,
    ) -> Result<Review>;

    /// Edit an existing review in place.
    async fn update(&self, review_id: Uuid, rate: i32, content: Option<String>) -> Result<()>;

    /// Delete a review scoped to its owner. Returns false when absent.
    async fn delete(&self, review_id: Uuid, user_id: Uuid) -> Result<bool>;

    /// Reviews for a pharmacy, newest first, optionally only one user's.
    async fn list_by_pharmacy(
        &self,
        pharmacy_id: Uuid,
        user_id: Option<Uuid>,
        page: i64,
        count: i64,
    ) -> Result<Vec<ReviewWithAuthor>>;

    async fn create_medicine_review(
        &self,
        user_id: Uuid,
        medicine_id: Uuid,
        message: &str,
    ) -> Result<()>;

    async fn list_by_medicine(
        &self,
        medicine_id: Uuid,
        user_id: Option<Uuid>,
        page: i64,
        count: i64,
    ) -> Result<Vec<MedicineReviewWithAuthor>>;

    /// Bulk-delete medicine reviews scoped to their owner.
    async fn delete_medicine_reviews(&self, user_id: Uuid, review_ids: &[Uuid]) -> Result<u64>;
}

/// PostgreSQL implementation of [`ReviewRepo`].
#[derive(Clone)]
pub struct PgReviewRepo {
    pool: Pool<Postgres>,
}

impl PgReviewRepo {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewRepo for PgReviewRepo {
    async fn find_by_user_and_pharmacy(
        &self,
        user_id: Uuid,
        pharmacy_id: Uuid,
    ) -> Result<Option<Review>> {
        let review = sqlx::query_as::<_, Review>(
            "SELECT * FROM reviews WHERE user_id = $1 AND pharmacy_id = $2",
        )
        .bind(user_id)
        .bind(pharmacy_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(review)
    }

    async fn find_by_id_and_user(
        &self,
        review_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Review>> {
        let review =
            sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE id = $1 AND user_id = $2")
                .bind(review_id)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(review)
    }

    async fn create(
        &self,
        user_id: Uuid,
        pharmacy_id: Uuid,
        rate: i32,
        content: Option<String>,
    ) -> Result<Review> {
        let review = sqlx::query_as::<_, Review>(
            "INSERT INTO reviews (user_id, pharmacy_id, rate, content) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(user_id)
        .bind(pharmacy_id)
        .bind(rate)
        .bind(&content)
        .fetch_one(&self.pool)
        .await?;
        Ok(review)
    }

    async fn update(&self, review_id: Uuid, rate: i32, content: Option<String>) -> Result<()> {
        sqlx::query("UPDATE reviews SET rate = $2, content = $3, updated_at = now() WHERE id = $1")
            .bind(review_id)
            .bind(rate)
            .bind(&content)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete(&self, review_id: Uuid, user_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1 AND user_id = $2")
            .bind(review_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_by_pharmacy(
        &self,
        pharmacy_id: Uuid,
        user_id: Option<Uuid>,
        page: i64,
        count: i64,
    ) -> Result<Vec<ReviewWithAuthor>> {
        let reviews = sqlx::query_as::<_, ReviewWithAuthor>(
            "SELECT r.id, r.pharmacy_id, u.full_name AS author, r.rate, r.content, \
                    r.created_at \
             FROM reviews r JOIN users u ON u.id = r.user_id \
             WHERE r.pharmacy_id = $1 AND ($2::uuid IS NULL OR r.user_id = $2) \
             ORDER BY r.created_at DESC OFFSET $3 LIMIT $4",
        )
        .bind(pharmacy_id)
        .bind(user_id)
        .bind((page - 1) * count)
        .bind(count)
        .fetch_all(&self.pool)
        .await?;
        Ok(reviews)
    }

    async fn create_medicine_review(
        &self,
        user_id: Uuid,
        medicine_id: Uuid,
        message: &str,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO medicine_reviews (user_id, medicine_id, message) VALUES ($1, $2, $3)",
        )
        .bind(user_id)
        .bind(medicine_id)
        .bind(message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_by_medicine(
        &self,
        medicine_id: Uuid,
        user_id: Option<Uuid>,
        page: i64,
        count: i64,
    ) -> Result<Vec<MedicineReviewWithAuthor>> {
        let reviews = sqlx::query_as::<_, MedicineReviewWithAuthor>(
            "SELECT r.id, r.medicine_id, u.full_name AS author, r.message, r.created_at \
             FROM medicine_reviews r JOIN users u ON u.id = r.user_id \
             WHERE r.medicine_id = $1 AND ($2::uuid IS NULL OR r.user_id = $2) \
             ORDER BY r.created_at DESC OFFSET $3 LIMIT $4",
        )
        .bind(medicine_id)
        .bind(user_id)
        .bind((page - 1) * count)
        .bind(count)
        .fetch_all(&self.pool)
        .await?;
        Ok(reviews)
    }

    async fn delete_medicine_reviews(&self, user_id: Uuid, review_ids: &[Uuid]) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM medicine_reviews WHERE user_id = $1 AND id = ANY($2)")
                .bind(user_id)
                .bind(review_ids)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }
}
