//! Database repositories (PostgreSQL).
//!
//! This module contains traits and implementations for database access.
//! Each repository is abstracted behind a trait to enable mocking in tests.
//!
//! ## Repositories
//!
//! - **users** - Durable accounts, one per (email, role)
//! - **customers** - Customer profiles
//! - **pharmacies** - Pharmacy profiles, discovery search, rating aggregate
//! - **medicines** - Catalog CRUD, search and recommendations
//! - **reviews** - Pharmacy reviews (rated) and medicine reviews (free-text)
//!
//! ## Usage in Handlers
//!
//! Repositories are accessed via `state.repos`:
//!
//! ```ignore
//! async fn handler(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
//!     let user = state.repos.users.find_by_id(user_id).await?;
//!     let pharmacy = state.repos.pharmacies.find_by_user(user_id).await?;
//! }
//! ```

mod customers;
mod medicines;
mod pharmacies;
mod reviews;
mod users;

pub use customers::{CustomerRepo, PgCustomerRepo};
pub use medicines::{MedicineRepo, PgMedicineRepo};
pub use pharmacies::{PgPharmacyRepo, PharmacyRepo};
pub use reviews::{PgReviewRepo, ReviewRepo};
pub use users::{PgUserRepo, UserRepo};

#[cfg(test)]
pub use customers::MockCustomerRepo;
#[cfg(test)]
pub use medicines::MockMedicineRepo;
#[cfg(test)]
pub use pharmacies::MockPharmacyRepo;
#[cfg(test)]
pub use reviews::MockReviewRepo;
#[cfg(test)]
pub use users::MockUserRepo;

use std::sync::Arc;

/// Collection of all database repositories.
#[derive(Clone)]
pub struct Repos {
    pub users: Arc<dyn UserRepo>,
    pub customers: Arc<dyn CustomerRepo>,
    pub pharmacies: Arc<dyn PharmacyRepo>,
    pub medicines: Arc<dyn MedicineRepo>,
    pub reviews: Arc<dyn ReviewRepo>,
}
