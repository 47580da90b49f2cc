//! Medicine catalog repository for PostgreSQL.

use anyhow::Result;
use async_trait::async_trait;
use shared::api::{MedicineAvailability, MedicinePayload, MedicineSearchQuery};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::models::Medicine;

/// Catalog search results are paged five at a time via the `next` offset.
pub const SEARCH_PAGE_SIZE: i64 = 5;

/// Repository for the medicine catalog.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MedicineRepo: Send + Sync {
    /// Add a medicine to a pharmacy's catalog.
    async fn create(&self, pharmacy_id: Uuid, medicine: MedicinePayload) -> Result<Medicine>;

    /// Update a medicine, scoped to the owning pharmacy. None when the
    /// medicine doesn't exist or belongs to another pharmacy.
    async fn update(
        &self,
        pharmacy_id: Uuid,
        medicine_id: Uuid,
        medicine: MedicinePayload,
    ) -> Result<Option<Medicine>>;

    /// Delete medicines, scoped to the owning pharmacy. Returns the number
    /// actually removed.
    async fn delete_many(&self, pharmacy_id: Uuid, medicine_ids: &[Uuid]) -> Result<u64>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Medicine>>;

    async fn list_by_pharmacy(
        &self,
        pharmacy_id: Uuid,
        page: i64,
        count: i64,
    ) -> Result<Vec<Medicine>>;

    /// Filtered catalog search; all filters optional, paged via `next`.
    async fn search(&self, filter: MedicineSearchQuery) -> Result<Vec<Medicine>>;

    /// Medicines tagged with any of the given health conditions.
    async fn recommend(
        &self,
        conditions: &[String],
        page: i64,
        count: i64,
    ) -> Result<Vec<Medicine>>;
}

/// PostgreSQL implementation of [`MedicineRepo`].
#[derive(Clone)]
pub struct PgMedicineRepo {
    pool: Pool<Postgres>,
}

impl PgMedicineRepo {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn conditions_of(medicine: &MedicinePayload) -> Vec<String> {
    medicine
        .health_conditions
        .iter()
        .map(|c| c.as_str().to_owned())
        .collect()
}

#[async_trait]
impl MedicineRepo for PgMedicineRepo {
    async fn create(&self, pharmacy_id: Uuid, medicine: MedicinePayload) -> Result<Medicine> {
        let created = sqlx::query_as::<_, Medicine>(
            "INSERT INTO medicines \
                 (pharmacy_id, name, description, dosage, form, category, quantity, \
                  price, batch_number, manufactured_date, expiry_date, \
                  prescription_required, manufacturer, storage_instructions, \
                  stock_threshold, health_conditions) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, \
                     $15, $16) \
             RETURNING *",
        )
        .bind(pharmacy_id)
        .bind(&medicine.name)
        .bind(&medicine.description)
        .bind(&medicine.dosage)
        .bind(&medicine.form)
        .bind(&medicine.category)
        .bind(medicine.quantity)
        .bind(medicine.price)
        .bind(&medicine.batch_number)
        .bind(medicine.manufactured_date)
        .bind(medicine.expiry_date)
        .bind(medicine.prescription_required)
        .bind(&medicine.manufacturer)
        .bind(&medicine.storage_instructions)
        .bind(medicine.stock_threshold.unwrap_or(0))
        .bind(conditions_of(&medicine))
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn update(
        &self,
        pharmacy_id: Uuid,
        medicine_id: Uuid,
        medicine: MedicinePayload,
    ) -> Result<Option<Medicine>> {
        let updated = sqlx::query_as::<_, Medicine>(
            "UPDATE medicines SET \
                 name = $3, description = $4, dosage = $5, form = $6, category = $7, \
                 quantity = $8, price = $9, batch_number = $10, \
                 manufactured_date = $11, expiry_date = $12, \
                 prescription_required = $13, manufacturer = $14, \
                 storage_instructions = $15, stock_threshold = $16, \
                 health_conditions = $17, updated_at = now() \
             WHERE pharmacy_id = $1 AND id = $2 \
             RETURNING *",
        )
        .bind(pharmacy_id)
        .bind(medicine_id)
        .bind(&medicine.name)
        .bind(&medicine.description)
        .bind(&medicine.dosage)
        .bind(&medicine.form)
        .bind(&medicine.category)
        .bind(medicine.quantity)
        .bind(medicine.price)
        .bind(&medicine.batch_number)
        .bind(medicine.manufactured_date)
        .bind(medicine.expiry_date)
        .bind(medicine.prescription_required)
        .bind(&medicine.manufacturer)
        .bind(&medicine.storage_instructions)
        .bind(medicine.stock_threshold.unwrap_or(0))
        .bind(conditions_of(&medicine))
        .fetch_optional(&self.pool)
        .await?;

        Ok(updated)
    }

    async fn delete_many(&self, pharmacy_id: Uuid, medicine_ids: &[Uuid]) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM medicines WHERE pharmacy_id = $1 AND id = ANY($2)")
                .bind(pharmacy_id)
                .bind(medicine_ids)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Medicine>> {
        let medicine = sqlx::query_as::<_, Medicine>("SELECT * FROM medicines WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(medicine)
    }

    async fn list_by_pharmacy(
        &self,
        pharmacy_id: Uuid,
        page: i64,
        count: i64,
    ) -> Result<Vec<Medicine>> {
        let medicines = sqlx::query_as::<_, Medicine>(
            "SELECT * FROM medicines WHERE pharmacy_id = $1 \
             ORDER BY created_at DESC OFFSET $2 LIMIT $3",
        )
        .bind(pharmacy_id)
        .bind((page - 1) * count)
        .bind(count)
        .fetch_all(&self.pool)
        .await?;
        Ok(medicines)
    }

    async fn search(&self, filter: MedicineSearchQuery) -> Result<Vec<Medicine>> {
        // availability: in stock (> 0), low stock (> 0 but at or below the
        // per-medicine threshold), out of stock (= 0)
        let (min_quantity, low_stock, out_of_stock) = match filter.availability {
            Some(MedicineAvailability::InStock) => (Some(1i64), false, false),
            Some(MedicineAvailability::LowStock) => (None, true, false),
            Some(MedicineAvailability::OutOfStock) => (None, false, true),
            None => (None, false, false),
        };

        let medicines = sqlx::query_as::<_, Medicine>(
            "SELECT * FROM medicines \
             WHERE ($1::uuid IS NULL OR pharmacy_id = $1) \
               AND ($2::text IS NULL OR name ILIKE '%' || $2 || '%') \
               AND ($3::text IS NULL OR category = $3) \
               AND ($4::text IS NULL OR form = $4) \
               AND ($5::text IS NULL OR dosage = $5) \
               AND ($6::float8 IS NULL OR price >= $6) \
               AND ($7::float8 IS NULL OR price <= $7) \
               AND ($8::boolean IS NULL OR prescription_required = $8) \
               AND ($9::text IS NULL OR manufacturer ILIKE '%' || $9 || '%') \
               AND ($10::bigint IS NULL OR quantity >= $10) \
               AND (NOT $11 OR (quantity > 0 AND quantity <= stock_threshold)) \
               AND (NOT $12 OR quantity = 0) \
             ORDER BY created_at DESC \
             OFFSET $13 LIMIT $14",
        )
        .bind(filter.pharmacy_id)
        .bind(&filter.name)
        .bind(&filter.category)
        .bind(&filter.form)
        .bind(&filter.dosage)
        .bind(filter.min_price)
        .bind(filter.max_price)
        .bind(filter.prescription_required)
        .bind(&filter.manufacturer)
        .bind(min_quantity)
        .bind(low_stock)
        .bind(out_of_stock)
        .bind(filter.next * SEARCH_PAGE_SIZE)
        .bind(SEARCH_PAGE_SIZE)
        .fetch_all(&self.pool)
        .await?;

        Ok(medicines)
    }

    async fn recommend(
        &self,
        conditions: &[String],
        page: i64,
        count: i64,
    ) -> Result<Vec<Medicine>> {
        let medicines = sqlx::query_as::<_, Medicine>(
            "SELECT * FROM medicines WHERE health_conditions && $1 \
             ORDER BY created_at DESC OFFSET $2 LIMIT $3",
        )
        .bind(conditions)
        .bind((page - 1) * count)
        .bind(count)
        .fetch_all(&self.pool)
        .await?;
        Ok(medicines)
    }
}
