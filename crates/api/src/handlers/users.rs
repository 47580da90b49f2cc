//! Account-level endpoints shared by both roles.

use axum::{Json, Router, debug_handler, extract::State, response::IntoResponse, routing::get};
use shared::api::MeResponse;

use crate::{error::AppError, middleware::auth::AuthSession, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[debug_handler]
async fn get_me(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let Some(user) = state.repos.users.find_by_id(session.id).await? else {
        return Err(AppError::not_found("User could not be found."));
    };

    Ok(Json(MeResponse {
        id: user.id,
        full_name: user.full_name,
        email: user.email,
        role: user.role,
        created_at: user.created_at,
        updated_at: user.updated_at,
    }))
}
