mod config;
mod crypto;
mod error;
mod handlers;
mod keys;
mod middleware;
mod models;
mod repos;
mod services;
mod state;
mod stores;
#[cfg(test)]
mod test_utils;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{Router, http};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    config::Config,
    repos::{PgCustomerRepo, PgMedicineRepo, PgPharmacyRepo, PgReviewRepo, PgUserRepo, Repos},
    services::{GeminiSuggester, SmtpEmailSender},
    state::AppState,
    stores::{Credentials, RedisCredentialStore},
};

#[derive(Parser)]
#[command(name = "api")]
#[command(about = "MedLink API server")]
struct Args {
    /// Run database migrations and exit
    #[arg(long)]
    migrate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider before any TLS operations
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let args = Args::parse();
    let config = envy::prefixed("MEDLINK_").from_env::<Config>()?;

    // Initialize Sentry for error tracking (must be done early, guard must stay alive)
    let _sentry_guard = config.sentry_dsn.as_ref().map(|dsn| {
        sentry::init((
            dsn.as_str(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                environment: Some(config.env.clone().into()),
                ..Default::default()
            },
        ))
    });

    // Set up tracing: JSON in production, human-readable otherwise
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.is_production() {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer())
            .init();
    }

    let database = PgPoolOptions::new()
        .max_connections(25)
        .connect(&config.database_url)
        .await?;

    // Run migrations via init container only (--migrate flag)
    if args.migrate {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&database).await?;
        tracing::info!("Migrations complete");
        return Ok(());
    }

    let redis = redis::Client::open(config.redis_url.as_str())?;
    let email = SmtpEmailSender::new(&config.smtp_url, &config.email_domain)?;
    let ai = GeminiSuggester::new(config.gemini_api_key.clone());

    // Build repositories
    let repos = Repos {
        users: Arc::new(PgUserRepo::new(database.clone())),
        customers: Arc::new(PgCustomerRepo::new(database.clone())),
        pharmacies: Arc::new(PgPharmacyRepo::new(database.clone())),
        medicines: Arc::new(PgMedicineRepo::new(database.clone())),
        reviews: Arc::new(PgReviewRepo::new(database.clone())),
    };

    // Build the credential store
    let credentials = Credentials::new(Arc::new(RedisCredentialStore::new(redis.clone())));

    let state = AppState {
        config: config.clone(),
        database,
        redis,
        repos,
        credentials,
        email: Arc::new(email),
        ai: Arc::new(ai),
    };

    // Request ID header name
    let x_request_id = http::HeaderName::from_static("x-request-id");

    let app = Router::new()
        .nest("/health", handlers::health::router())
        .nest("/auth", handlers::auth::router())
        .nest("/users", handlers::users::router())
        .nest("/customers", handlers::customers::router())
        .nest("/pharmacies", handlers::pharmacies::router())
        .nest("/medicines", handlers::medicines::router())
        .nest("/reviews", handlers::reviews::router())
        .with_state(state)
        // Request ID: generate UUID, include in logs, return in response
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &http::Request<axum::body::Body>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            },
        ))
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
        .layer(RequestBodyLimitLayer::new(1024 * 1024)); // 1MB limit

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
