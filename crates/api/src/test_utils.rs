//! Shared test utilities for API handler tests.
//!
//! Provides common mock factories and a flexible `TestStateBuilder` for
//! constructing `AppState` instances with only the mocks needed for each test.
//!
//! ## Usage
//!
//! ```ignore
//! use crate::test_utils::{TestStateBuilder, mock_user};
//!
//! let mut users = MockUserRepo::new();
//! users.expect_find().returning(|_, _| Ok(Some(mock_user("alice@example.com", UserRole::Customer))));
//!
//! let state = TestStateBuilder::new()
//!     .with_user_repo(users)
//!     .build();
//! ```

use std::sync::Arc;

use chrono::Utc;
use shared::api::UserRole;
use sqlx::types::Json;
use uuid::Uuid;

use crate::config::Config;
use crate::crypto;
use crate::models::{Customer, Medicine, Pharmacy, Review, User, UserSession};
use crate::repos::{
    MockCustomerRepo, MockMedicineRepo, MockPharmacyRepo, MockReviewRepo, MockUserRepo, Repos,
};
use crate::services::{MockEmailSender, MockMedicineSuggester};
use crate::state::AppState;
use crate::stores::{Credentials, MockCredentialStore};

/// Creates a test configuration with dummy values.
pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 3000,
        database_url: "postgres://test".to_string(),
        redis_url: "redis://test".to_string(),
        smtp_url: "smtp://localhost:1025".to_string(),
        email_domain: "medlink.test".to_string(),
        frontend_url: "https://app.medlink.test".to_string(),
        gemini_api_key: None,
        env: "test".to_string(),
        sentry_dsn: None,
    }
}

/// The plaintext behind every mock user's password hash.
pub const TEST_PASSWORD: &str = "Sufficient1!";

/// Creates a user with the given email and role; the password hash matches
/// [`TEST_PASSWORD`].
pub fn mock_user(email: &str, role: UserRole) -> User {
    User {
        id: Uuid::new_v4(),
        full_name: "Test User".to_string(),
        email: email.to_string(),
        role,
        password: crypto::hash(TEST_PASSWORD).unwrap(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// Creates a logged-in session without a refresh token.
pub fn mock_session(role: UserRole) -> UserSession {
    UserSession {
        id: Uuid::new_v4(),
        role,
        access_token: crypto::generate_session_id(),
        refresh_token: None,
    }
}

/// Creates a pharmacy with the given rating aggregate.
pub fn mock_pharmacy(rating_sum: f64, ratings_count: i64) -> Pharmacy {
    Pharmacy {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        license_number: "LIC-1234".to_string(),
        pharmacy_name: "Central Pharmacy".to_string(),
        description: None,
        phone_number: "+251900000000".to_string(),
        street: "Main St".to_string(),
        city: "Addis Ababa".to_string(),
        state: "AA".to_string(),
        zip_code: "1000".to_string(),
        lat: 9.0,
        lng: 38.7,
        open_hours: Json(Vec::new()),
        website: None,
        person_name: None,
        delivery: false,
        verified: true,
        rejection_message: None,
        rating_sum,
        ratings_count,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// Creates a customer profile owned by `user_id`, with no health conditions.
pub fn mock_customer(user_id: Uuid) -> Customer {
    Customer {
        user_id,
        phone_number: "+251911111111".to_string(),
        alternate_phone_number: None,
        date_of_birth: None,
        street: "Main St".to_string(),
        city: "Addis Ababa".to_string(),
        state: "AA".to_string(),
        zip_code: "1000".to_string(),
        health_conditions: Vec::new(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// Creates a review by `user_id` for `pharmacy_id` with the given rate.
pub fn mock_review(user_id: Uuid, pharmacy_id: Uuid, rate: i32) -> Review {
    Review {
        id: Uuid::new_v4(),
        user_id,
        pharmacy_id,
        rate,
        content: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// Creates a medicine owned by `pharmacy_id`.
pub fn mock_medicine(pharmacy_id: Uuid, name: &str) -> Medicine {
    Medicine {
        id: Uuid::new_v4(),
        pharmacy_id,
        name: name.to_string(),
        description: None,
        dosage: "500mg".to_string(),
        form: "tablet".to_string(),
        category: None,
        quantity: 10,
        price: 4.5,
        batch_number: None,
        manufactured_date: chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        expiry_date: chrono::NaiveDate::from_ymd_opt(2027, 1, 1).unwrap(),
        prescription_required: false,
        manufacturer: None,
        storage_instructions: None,
        stock_threshold: 2,
        health_conditions: Vec::new(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// Builder for constructing test `AppState` with custom mocks.
///
/// Uses default (empty) mocks for any repo/store/service not explicitly set.
/// This allows tests to only configure the mocks they actually need.
pub struct TestStateBuilder {
    user_repo: Option<MockUserRepo>,
    customer_repo: Option<MockCustomerRepo>,
    pharmacy_repo: Option<MockPharmacyRepo>,
    medicine_repo: Option<MockMedicineRepo>,
    review_repo: Option<MockReviewRepo>,
    credential_store: Option<MockCredentialStore>,
    email_sender: Option<MockEmailSender>,
    suggester: Option<MockMedicineSuggester>,
}

impl TestStateBuilder {
    /// Creates a new builder with no mocks configured.
    pub fn new() -> Self {
        Self {
            user_repo: None,
            customer_repo: None,
            pharmacy_repo: None,
            medicine_repo: None,
            review_repo: None,
            credential_store: None,
            email_sender: None,
            suggester: None,
        }
    }

    pub fn with_user_repo(mut self, repo: MockUserRepo) -> Self {
        self.user_repo = Some(repo);
        self
    }

    pub fn with_customer_repo(mut self, repo: MockCustomerRepo) -> Self {
        self.customer_repo = Some(repo);
        self
    }

    pub fn with_pharmacy_repo(mut self, repo: MockPharmacyRepo) -> Self {
        self.pharmacy_repo = Some(repo);
        self
    }

    pub fn with_medicine_repo(mut self, repo: MockMedicineRepo) -> Self {
        self.medicine_repo = Some(repo);
        self
    }

    pub fn with_review_repo(mut self, repo: MockReviewRepo) -> Self {
        self.review_repo = Some(repo);
        self
    }

    pub fn with_credential_store(mut self, store: MockCredentialStore) -> Self {
        self.credential_store = Some(store);
        self
    }

    pub fn with_email_sender(mut self, sender: MockEmailSender) -> Self {
        self.email_sender = Some(sender);
        self
    }

    pub fn with_suggester(mut self, suggester: MockMedicineSuggester) -> Self {
        self.suggester = Some(suggester);
        self
    }

    /// Builds the `AppState` using configured mocks or defaults.
    pub fn build(self) -> AppState {
        let repos = Repos {
            users: Arc::new(self.user_repo.unwrap_or_else(MockUserRepo::new)),
            customers: Arc::new(self.customer_repo.unwrap_or_else(MockCustomerRepo::new)),
            pharmacies: Arc::new(self.pharmacy_repo.unwrap_or_else(MockPharmacyRepo::new)),
            medicines: Arc::new(self.medicine_repo.unwrap_or_else(MockMedicineRepo::new)),
            reviews: Arc::new(self.review_repo.unwrap_or_else(MockReviewRepo::new)),
        };

        let credentials = Credentials::new(Arc::new(
            self.credential_store
                .unwrap_or_else(MockCredentialStore::new),
        ));

        let email = Arc::new(self.email_sender.unwrap_or_else(MockEmailSender::new))
            as Arc<dyn crate::services::EmailSender>;
        let ai = Arc::new(self.suggester.unwrap_or_else(MockMedicineSuggester::new))
            as Arc<dyn crate::services::MedicineSuggester>;

        // lazy handles: nothing connects unless a test actually queries them
        let database = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://test")
            .expect("lazy test pool");
        let redis = redis::Client::open("redis://test").expect("lazy test client");

        AppState {
            config: test_config(),
            database,
            redis,
            repos,
            credentials,
            email,
            ai,
        }
    }
}

impl Default for TestStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
