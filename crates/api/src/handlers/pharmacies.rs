//! Pharmacy profiles and discovery.
//!
//! Endpoints:
//! - GET /pharmacies - filtered discovery search (name, address, proximity,
//!   delivery, minimum rating)
//! - GET /pharmacies/profile - the pharmacist's own profile
//! - PUT /pharmacies/profile - create/update the pharmacist's profile
//! - GET /pharmacies/{id} - a single pharmacy
//!
//! Profile writes never touch the moderation fields or the rating aggregate.

use axum::{
    Json, Router, debug_handler,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use garde::Validate;
use shared::api::{PharmacyInfo, PharmacyProfilePayload, PharmacySearchQuery};
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::auth::{AuthSession, PharmacistSession},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(search))
        .route("/profile", get(get_profile).put(set_profile))
        .route("/{id}", get(get_pharmacy))
}

#[debug_handler]
async fn search(
    _session: AuthSession,
    State(state): State<AppState>,
    Query(filter): Query<PharmacySearchQuery>,
) -> Result<impl IntoResponse, AppError> {
    filter
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let pharmacies = state.repos.pharmacies.search(filter).await?;

    let result: Vec<PharmacyInfo> = pharmacies.into_iter().map(|p| p.into_info()).collect();

    Ok(Json(result))
}

#[debug_handler]
async fn get_pharmacy(
    _session: AuthSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let Some(pharmacy) = state.repos.pharmacies.find_by_id(id).await? else {
        return Err(AppError::not_found("Pharmacy not found."));
    };

    Ok(Json(pharmacy.into_info()))
}

#[debug_handler]
async fn get_profile(
    PharmacistSession(session): PharmacistSession,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let Some(pharmacy) = state.repos.pharmacies.find_by_user(session.id).await? else {
        return Err(AppError::not_found("Pharmacy profile not set."));
    };

    Ok(Json(pharmacy.into_info()))
}

#[debug_handler]
async fn set_profile(
    PharmacistSession(session): PharmacistSession,
    State(state): State<AppState>,
    Json(payload): Json<PharmacyProfilePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    state
        .repos
        .pharmacies
        .upsert_profile(session.id, payload)
        .await?;

    tracing::info!(user_id = %session.id, "pharmacy profile updated");

    Ok(StatusCode::OK)
}
