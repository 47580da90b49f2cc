//! Shared API request/response types used by both the server and clients.

use chrono::{DateTime, NaiveDate, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account role. An email address may hold one account per role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Customer,
    Pharmacist,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Customer => "customer",
            UserRole::Pharmacist => "pharmacist",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(UserRole::Customer),
            "pharmacist" => Ok(UserRole::Pharmacist),
            other => Err(format!("unknown user role: {other}")),
        }
    }
}

/// Health conditions a customer can record on their profile, used for
/// medicine recommendations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthCondition {
    Diabetes,
    Hypertension,
    Pregnancy,
}

impl HealthCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthCondition::Diabetes => "diabetes",
            HealthCondition::Hypertension => "hypertension",
            HealthCondition::Pregnancy => "pregnancy",
        }
    }
}

impl std::str::FromStr for HealthCondition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "diabetes" => Ok(HealthCondition::Diabetes),
            "hypertension" => Ok(HealthCondition::Hypertension),
            "pregnancy" => Ok(HealthCondition::Pregnancy),
            other => Err(format!("unknown health condition: {other}")),
        }
    }
}

/// Passwords must carry an uppercase letter, a lowercase letter, a digit and a
/// special character, and be at least 8 characters long.
fn strong_password(value: &str, _ctx: &()) -> garde::Result {
    if value.len() < 8 {
        return Err(garde::Error::new(
            "password must be at least 8 characters long",
        ));
    }
    if !value.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(garde::Error::new(
            "password must contain at least one uppercase letter",
        ));
    }
    if !value.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(garde::Error::new(
            "password must contain at least one lowercase letter",
        ));
    }
    if !value.chars().any(|c| c.is_ascii_digit()) {
        return Err(garde::Error::new(
            "password must contain at least one number",
        ));
    }
    if !value.chars().any(|c| "!@#$%^&*(),.?\":{}|<>".contains(c)) {
        return Err(garde::Error::new(
            "password must contain at least one special character",
        ));
    }
    Ok(())
}

/// Request a new account. The account only becomes durable once the emailed
/// verification code is confirmed.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct SignupPayload {
    /// Two words, letters only (given name and family name).
    #[garde(pattern(r"^[a-zA-Z]{3,} [a-zA-Z]{3,}$"), length(max = 50))]
    pub full_name: String,
    #[garde(email)]
    pub email: String,
    #[garde(custom(strong_password))]
    pub password: String,
    #[garde(skip)]
    pub role: UserRole,
}

/// Confirm the verification code received via email.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct VerifyEmailPayload {
    #[garde(email)]
    pub email: String,
    #[garde(skip)]
    pub role: UserRole,
    #[garde(pattern(r"^[0-9]{6}$"))]
    pub otp_code: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct LoginPayload {
    #[garde(email)]
    pub email: String,
    #[garde(skip)]
    pub role: UserRole,
    #[garde(length(min = 1))]
    pub password: String,
    /// Issue a long-lived refresh token alongside the access token.
    #[garde(skip)]
    #[serde(default)]
    pub remember_me: bool,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ForgetPasswordPayload {
    #[garde(email)]
    pub email: String,
    #[garde(skip)]
    pub role: UserRole,
}

/// Set a new password using either the emailed reset link token or the OTP
/// code. Exactly one of the two must be supplied; the handler enforces it.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ResetPasswordPayload {
    #[garde(email)]
    pub email: String,
    #[garde(skip)]
    pub role: UserRole,
    #[garde(custom(strong_password))]
    pub password: String,
    #[garde(skip)]
    pub token: Option<String>,
    #[garde(inner(pattern(r"^[0-9]{6}$")))]
    pub otp_code: Option<String>,
}

/// Returned when a verification or reset code has been issued.
#[derive(Debug, Serialize, Deserialize)]
pub struct OtpIssuedResponse {
    pub message: String,
    /// When the code expires (epoch milliseconds).
    pub expires_at: i64,
    /// Earliest time a new code may be requested (epoch milliseconds).
    pub resend_at: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(rename = "type")]
    pub token_type: String,
    /// Access token expiry (epoch milliseconds).
    pub expires_at: i64,
    pub role: UserRole,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Address {
    #[garde(length(min = 1))]
    pub street: String,
    #[garde(length(min = 1))]
    pub city: String,
    #[garde(length(min = 1))]
    pub state: String,
    #[garde(length(min = 1))]
    pub zip_code: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Validate)]
pub struct GeoPoint {
    #[garde(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[garde(range(min = -180.0, max = 180.0))]
    pub lng: f64,
}

/// Weekly opening interval, times as "HH:MM".
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OpenHours {
    #[garde(pattern(r"^(Mon|Tue|Wed|Thu|Fri|Sat|Sun)$"))]
    pub day: String,
    #[garde(pattern(r"^[0-2][0-9]:[0-5][0-9]$"))]
    pub open: String,
    #[garde(pattern(r"^[0-2][0-9]:[0-5][0-9]$"))]
    pub close: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct PharmacyProfilePayload {
    #[garde(length(min = 1))]
    pub license_number: String,
    #[garde(length(min = 1, max = 100))]
    pub pharmacy_name: String,
    #[garde(inner(length(max = 1000)))]
    pub description: Option<String>,
    #[garde(length(min = 1))]
    pub phone_number: String,
    #[garde(dive)]
    pub address: Address,
    #[garde(dive)]
    pub location: GeoPoint,
    #[garde(length(min = 1), dive)]
    pub open_hours: Vec<OpenHours>,
    #[garde(skip)]
    pub website: Option<String>,
    #[garde(skip)]
    pub person_name: Option<String>,
    #[garde(skip)]
    #[serde(default)]
    pub delivery: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PharmacyInfo {
    pub id: Uuid,
    pub pharmacy_name: String,
    pub description: Option<String>,
    pub phone_number: String,
    pub address: Address,
    pub location: GeoPoint,
    pub open_hours: Vec<OpenHours>,
    pub website: Option<String>,
    pub delivery: bool,
    pub verified: bool,
    /// Running mean of review rates; absent until the first review.
    pub rating: Option<f64>,
    pub ratings_count: i64,
}

/// Pharmacy discovery filters, all optional. `distance` is meters around
/// (`lat`, `lng`); results are paged 5 at a time via `next`.
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct PharmacySearchQuery {
    #[garde(skip)]
    pub name: Option<String>,
    #[garde(skip)]
    pub address: Option<String>,
    #[garde(inner(range(min = -90.0, max = 90.0)))]
    pub lat: Option<f64>,
    #[garde(inner(range(min = -180.0, max = 180.0)))]
    pub lng: Option<f64>,
    #[garde(inner(range(min = 1.0)))]
    pub distance: Option<f64>,
    #[garde(skip)]
    pub delivery: Option<bool>,
    #[garde(inner(range(min = 1.0, max = 5.0)))]
    pub rating: Option<f64>,
    #[garde(range(min = 0))]
    #[serde(default)]
    pub next: i64,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CustomerProfilePayload {
    #[garde(length(min = 1))]
    pub phone_number: String,
    #[garde(skip)]
    pub alternate_phone_number: Option<String>,
    #[garde(skip)]
    pub date_of_birth: Option<NaiveDate>,
    #[garde(dive)]
    pub delivery_address: Address,
    #[garde(skip)]
    #[serde(default)]
    pub health_conditions: Vec<HealthCondition>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CustomerProfileInfo {
    pub phone_number: String,
    pub alternate_phone_number: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub delivery_address: Address,
    pub health_conditions: Vec<HealthCondition>,
    pub updated_at: DateTime<Utc>,
}

pub const MEDICINE_FORMS: &[&str] = &["tablet", "syrup", "injection", "cream"];

fn known_form(value: &str, _ctx: &()) -> garde::Result {
    if MEDICINE_FORMS.contains(&value) {
        Ok(())
    } else {
        Err(garde::Error::new("unknown medicine form"))
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct MedicinePayload {
    #[garde(length(min = 1, max = 200))]
    pub name: String,
    #[garde(inner(length(max = 2000)))]
    pub description: Option<String>,
    #[garde(length(min = 1))]
    pub dosage: String,
    #[garde(custom(known_form))]
    pub form: String,
    #[garde(skip)]
    pub category: Option<String>,
    #[garde(range(min = 0))]
    pub quantity: i64,
    #[garde(range(min = 0.01))]
    pub price: f64,
    #[garde(skip)]
    pub batch_number: Option<String>,
    #[garde(skip)]
    pub manufactured_date: NaiveDate,
    #[garde(skip)]
    pub expiry_date: NaiveDate,
    #[garde(skip)]
    pub prescription_required: bool,
    #[garde(skip)]
    pub manufacturer: Option<String>,
    #[garde(skip)]
    pub storage_instructions: Option<String>,
    #[garde(inner(range(min = 0)))]
    pub stock_threshold: Option<i64>,
    #[garde(skip)]
    #[serde(default)]
    pub health_conditions: Vec<HealthCondition>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MedicineInfo {
    pub id: Uuid,
    pub pharmacy_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub dosage: String,
    pub form: String,
    pub category: Option<String>,
    pub quantity: i64,
    pub price: f64,
    pub prescription_required: bool,
    pub manufacturer: Option<String>,
    pub expiry_date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MedicineAvailability {
    InStock,
    LowStock,
    OutOfStock,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct MedicineSearchQuery {
    #[garde(skip)]
    pub pharmacy_id: Option<Uuid>,
    #[garde(skip)]
    pub name: Option<String>,
    #[garde(skip)]
    pub category: Option<String>,
    #[garde(skip)]
    pub form: Option<String>,
    #[garde(skip)]
    pub dosage: Option<String>,
    #[garde(inner(range(min = 0.0)))]
    pub min_price: Option<f64>,
    #[garde(inner(range(min = 0.0)))]
    pub max_price: Option<f64>,
    #[garde(skip)]
    pub availability: Option<MedicineAvailability>,
    #[garde(skip)]
    pub prescription_required: Option<bool>,
    #[garde(skip)]
    pub manufacturer: Option<String>,
    #[garde(range(min = 0))]
    #[serde(default)]
    pub next: i64,
}

/// Free-text condition description for AI-assisted medicine lookup.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct SuggestMedicinesPayload {
    #[garde(length(min = 3, max = 500))]
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuggestMedicinesResponse {
    /// Medicine names suggested by the model (best-effort, possibly empty).
    pub suggestions: Vec<String>,
    /// Catalog entries matching any suggested name.
    pub medicines: Vec<MedicineInfo>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct DeleteManyPayload {
    #[garde(length(min = 1, max = 50))]
    pub ids: Vec<Uuid>,
}

/// Write (or edit) a pharmacy review. One review per (user, pharmacy).
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct WriteReviewPayload {
    #[garde(skip)]
    pub pharmacy_id: Uuid,
    #[garde(range(min = 1, max = 5))]
    pub rate: i32,
    #[garde(inner(length(max = 2000)))]
    pub content: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReviewInfo {
    pub id: Uuid,
    pub pharmacy_id: Uuid,
    pub author: String,
    pub rate: i32,
    pub content: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct WriteMedicineReviewPayload {
    #[garde(skip)]
    pub medicine_id: Uuid,
    #[garde(length(min = 1, max = 2000))]
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MedicineReviewInfo {
    pub id: Uuid,
    pub medicine_id: Uuid,
    pub author: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// 1-based page + page size, used by review and catalog listings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Validate)]
pub struct PageQuery {
    #[garde(range(min = 1))]
    #[serde(default = "default_page")]
    pub page: i64,
    #[garde(range(min = 1, max = 50))]
    #[serde(default = "default_count")]
    pub count: i64,
}

fn default_page() -> i64 {
    1
}

fn default_count() -> i64 {
    10
}

impl Default for PageQuery {
    fn default() -> Self {
        Self { page: 1, count: 10 }
    }
}
