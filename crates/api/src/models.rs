use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use shared::api::{
    Address, CustomerProfileInfo, GeoPoint, HealthCondition, MedicineInfo, OpenHours,
    PharmacyInfo, UserRole,
};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{FromRow, Row};
use uuid::Uuid;

/// Durable account record. One row per (email, role): the same address may
/// hold both a customer and a pharmacist account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub role: UserRole,
    /// Argon2 hash, never the plaintext.
    pub password: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for User {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let role: String = row.try_get("role")?;
        Ok(Self {
            id: row.try_get("id")?,
            full_name: row.try_get("full_name")?,
            email: row.try_get("email")?,
            role: role.parse().map_err(|err: String| sqlx::Error::ColumnDecode {
                index: "role".into(),
                source: err.into(),
            })?,
            password: row.try_get("password")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Fields needed to create a durable user, produced by a verified signup.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub full_name: String,
    pub email: String,
    pub role: UserRole,
    /// Already hashed.
    pub password: String,
}

/// Ephemeral signup state held in the credential cache until the emailed code
/// is confirmed or the entry expires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingSignup {
    pub full_name: String,
    pub email: String,
    pub role: UserRole,
    /// Argon2 hash of the chosen password.
    pub password: String,
    /// Argon2 hash of the emailed code.
    pub otp_hash: String,
}

impl From<PendingSignup> for NewUser {
    fn from(pending: PendingSignup) -> Self {
        Self {
            full_name: pending.full_name,
            email: pending.email,
            role: pending.role,
            password: pending.password,
        }
    }
}

/// Session payload cached under the access-token key and, for "remember me"
/// logins, under the refresh-token key as well.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSession {
    pub id: Uuid,
    pub role: UserRole,
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Pharmacy {
    pub id: Uuid,
    pub user_id: Uuid,
    pub license_number: String,
    pub pharmacy_name: String,
    pub description: Option<String>,
    pub phone_number: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub lat: f64,
    pub lng: f64,
    pub open_hours: Json<Vec<OpenHours>>,
    pub website: Option<String>,
    pub person_name: Option<String>,
    pub delivery: bool,
    pub verified: bool,
    pub rejection_message: Option<String>,
    /// Sum of all current review rates. The displayed mean is derived, which
    /// keeps concurrent review updates purely additive.
    pub rating_sum: f64,
    pub ratings_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Pharmacy {
    /// Running mean of review rates; None until the first review.
    pub fn rating(&self) -> Option<f64> {
        if self.ratings_count == 0 {
            None
        } else {
            Some(self.rating_sum / self.ratings_count as f64)
        }
    }

    pub fn into_info(self) -> PharmacyInfo {
        let rating = self.rating();
        PharmacyInfo {
            id: self.id,
            pharmacy_name: self.pharmacy_name,
            description: self.description,
            phone_number: self.phone_number,
            address: Address {
                street: self.street,
                city: self.city,
                state: self.state,
                zip_code: self.zip_code,
            },
            location: GeoPoint {
                lat: self.lat,
                lng: self.lng,
            },
            open_hours: self.open_hours.0,
            website: self.website,
            delivery: self.delivery,
            verified: self.verified,
            rating,
            ratings_count: self.ratings_count,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Customer {
    pub user_id: Uuid,
    pub phone_number: String,
    pub alternate_phone_number: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub health_conditions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// Known health conditions; unrecognized stored values are dropped.
    pub fn conditions(&self) -> Vec<HealthCondition> {
        self.health_conditions
            .iter()
            .filter_map(|c| c.parse().ok())
            .collect()
    }

    pub fn into_info(self) -> CustomerProfileInfo {
        let health_conditions = self.conditions();
        CustomerProfileInfo {
            phone_number: self.phone_number,
            alternate_phone_number: self.alternate_phone_number,
            date_of_birth: self.date_of_birth,
            delivery_address: Address {
                street: self.street,
                city: self.city,
                state: self.state,
                zip_code: self.zip_code,
            },
            health_conditions,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Medicine {
    pub id: Uuid,
    pub pharmacy_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub dosage: String,
    pub form: String,
    pub category: Option<String>,
    pub quantity: i64,
    pub price: f64,
    pub batch_number: Option<String>,
    pub manufactured_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub prescription_required: bool,
    pub manufacturer: Option<String>,
    pub storage_instructions: Option<String>,
    pub stock_threshold: i64,
    pub health_conditions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Medicine {
    pub fn into_info(self) -> MedicineInfo {
        MedicineInfo {
            id: self.id,
            pharmacy_id: self.pharmacy_id,
            name: self.name,
            description: self.description,
            dosage: self.dosage,
            form: self.form,
            category: self.category,
            quantity: self.quantity,
            price: self.price,
            prescription_required: self.prescription_required,
            manufacturer: self.manufacturer,
            expiry_date: self.expiry_date,
        }
    }
}

/// Pharmacy review; at most one per (user, pharmacy).
#[derive(Debug, Clone, FromRow)]
pub struct Review {
    pub id: Uuid,
    pub user_id: Uuid,
    pub pharmacy_id: Uuid,
    pub rate: i32,
    pub content: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Review joined with its author's display name for listings.
#[derive(Debug, Clone, FromRow)]
pub struct ReviewWithAuthor {
    pub id: Uuid,
    pub pharmacy_id: Uuid,
    pub author: String,
    pub rate: i32,
    pub content: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Free-text medicine review; append-only, no aggregation.
#[derive(Debug, Clone, FromRow)]
pub struct MedicineReviewWithAuthor {
    pub id: Uuid,
    pub medicine_id: Uuid,
    pub author: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
