//! Customer profile endpoints (customer role only).

use axum::{
    Json, Router, debug_handler,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use garde::Validate;
use shared::api::CustomerProfilePayload;

use crate::{error::AppError, middleware::auth::CustomerSession, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new().route("/profile", get(get_profile).put(set_profile))
}

#[debug_handler]
async fn get_profile(
    CustomerSession(session): CustomerSession,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let Some(customer) = state.repos.customers.find_by_user(session.id).await? else {
        return Err(AppError::not_found("Customer profile not set."));
    };

    Ok(Json(customer.into_info()))
}

#[debug_handler]
async fn set_profile(
    CustomerSession(session): CustomerSession,
    State(state): State<AppState>,
    Json(payload): Json<CustomerProfilePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    state
        .repos
        .customers
        .upsert_profile(session.id, payload)
        .await?;

    tracing::info!(user_id = %session.id, "customer profile updated");

    Ok(StatusCode::OK)
}
