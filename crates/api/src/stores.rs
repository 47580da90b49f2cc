//! Ephemeral credential storage (Redis).
//!
//! Everything stored here expires via TTL: pending signups, session payloads,
//! password reset slots. Key derivation lives in [`crate::keys`]; durable
//! entities live in [`crate::repos`].
//!
//! ## Usage in Handlers
//!
//! The store is accessed via `state.credentials`:
//!
//! ```ignore
//! async fn handler(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
//!     state.credentials.set_json(&key, &pending, ttl_secs).await?;
//!     let session: Option<UserSession> = state.credentials.get_json(&key).await?;
//! }
//! ```

mod credentials;

pub use credentials::{CredentialStore, Credentials, RedisCredentialStore};

#[cfg(test)]
pub use credentials::MockCredentialStore;
