use std::sync::Arc;

use sqlx::{Pool, Postgres};

use crate::{
    config::Config,
    repos::Repos,
    services::{EmailSender, MedicineSuggester},
    stores::Credentials,
};

#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Database pool, used directly only by the health check.
    pub database: Pool<Postgres>,
    /// Redis client, used directly only by the health check.
    pub redis: redis::Client,
    /// Database repositories.
    pub repos: Repos,
    /// Ephemeral credential store (Redis).
    pub credentials: Credentials,
    /// Email sender (fire-and-forget at call sites).
    pub email: Arc<dyn EmailSender>,
    /// AI medicine-name suggester (best-effort).
    pub ai: Arc<dyn MedicineSuggester>,
}
