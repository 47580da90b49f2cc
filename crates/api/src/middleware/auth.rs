//! Session guard: resolves bearer tokens to cached sessions.
//!
//! Usage: add `AuthSession` (or a role-scoped variant) as an extractor
//! parameter to require authentication.
//!
//! ```ignore
//! async fn my_handler(AuthSession(session): AuthSession, ...) -> ... {
//!     // session.id and session.role are available here
//! }
//! ```
//!
//! Every failure mode — missing header, unknown token, expired entry, wrong
//! role — produces the identical 401 response, so a probe can't learn whether
//! a token exists or which role it carries.

use axum::{
    Json, RequestPartsExt,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use shared::api::UserRole;

use crate::{error::ErrorCode, keys, models::UserSession, state::AppState};

/// Session resolved through the access-token cache entry.
pub struct AuthSession(pub UserSession);

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        resolve(parts, state, keys::access_token).await.map(Self)
    }
}

/// Session resolved through the refresh-token cache entry. Only exists for
/// "remember me" logins.
pub struct RefreshSession(pub UserSession);

impl FromRequestParts<AppState> for RefreshSession {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = resolve(parts, state, keys::refresh_token).await?;

        // a refresh entry without its own token would be a corrupt write
        if session.refresh_token.is_none() {
            return Err(AuthError);
        }

        Ok(Self(session))
    }
}

/// Session restricted to customer accounts.
pub struct CustomerSession(pub UserSession);

impl FromRequestParts<AppState> for CustomerSession {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthSession(session) = AuthSession::from_request_parts(parts, state).await?;

        if session.role != UserRole::Customer {
            return Err(AuthError);
        }

        Ok(Self(session))
    }
}

/// Session restricted to pharmacist accounts.
pub struct PharmacistSession(pub UserSession);

impl FromRequestParts<AppState> for PharmacistSession {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthSession(session) = AuthSession::from_request_parts(parts, state).await?;

        if session.role != UserRole::Pharmacist {
            return Err(AuthError);
        }

        Ok(Self(session))
    }
}

async fn resolve(
    parts: &mut Parts,
    state: &AppState,
    token_key: fn(&str) -> String,
) -> Result<UserSession, AuthError> {
    let TypedHeader(Authorization(bearer)) = parts
        .extract::<TypedHeader<Authorization<Bearer>>>()
        .await
        .map_err(|_| AuthError)?;

    let session: Option<UserSession> = state
        .credentials
        .get_json(&token_key(bearer.token()))
        .await
        .map_err(|err| {
            tracing::error!("session lookup failed: {:?}", err);
            AuthError
        })?;

    session.ok_or(AuthError)
}

/// Uniform 401 rejection; deliberately identical for every failure mode.
pub struct AuthError;

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": "Authorization required.",
            "code": ErrorCode::AuthRequired,
        });

        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}
