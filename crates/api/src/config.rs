use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub redis_url: String,
    /// SMTP URL for outgoing mail (e.g., smtp://localhost:1025)
    pub smtp_url: String,
    /// Domain used in From addresses (noreply@<domain>)
    pub email_domain: String,
    /// Base URL of the web frontend, used to build password reset links
    pub frontend_url: String,
    /// Gemini API key for AI-assisted medicine lookup; suggestions are
    /// disabled when unset
    #[serde(default)]
    pub gemini_api_key: Option<String>,
    /// Set to "production" for JSON logging, anything else for human-readable.
    #[serde(default)]
    pub env: String,
    /// Sentry DSN for error tracking
    #[serde(default)]
    pub sentry_dsn: Option<String>,
}

impl Config {
    pub fn is_production(&self) -> bool {
        self.env == "production"
    }
}
