//! Account lifecycle: signup with email-code verification, login, token
//! refresh, logout, and password reset.
//!
//! Flow:
//! 1. POST /auth/signup caches a pending entry (hashed password + hashed OTP)
//!    under a (email, role) key with TTL = code expiry, and emails the code
//! 2. POST /auth/verify-email checks the code against the cached hash and, on
//!    match, converts the entry into a durable user (no session is issued;
//!    the client logs in afterwards)
//! 3. POST /auth/login verifies credentials and caches a session under the
//!    new access token; "remember me" adds a second entry under a refresh
//!    token
//! 4. POST /auth/refresh (bearer = refresh token) rotates the access token
//! 5. Password reset mirrors signup: a reset token + OTP pair with one TTL
//!
//! Security notes:
//! - OTP codes and passwords are stored hashed; reset link tokens are stored
//!   raw but carry 256 bits of entropy
//! - Login failures are uniform in message and timing: a missing account
//!   burns a hash comparison against a dummy hash
//! - The cooldown check runs before any hashing so rejected requests stay
//!   cheap; two racing signups for one identity can still both pass it, in
//!   which case the second write wins and the first code simply stops
//!   matching (accepted, the cache key serializes the writes themselves)

use axum::{
    Json, Router, debug_handler,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use chrono::{DateTime, Duration, Utc};
use garde::Validate;
use shared::api::{
    ForgetPasswordPayload, LoginPayload, LoginResponse, OtpIssuedResponse, ResetPasswordPayload,
    SignupPayload, VerifyEmailPayload,
};

use crate::{
    crypto,
    error::{AppError, ErrorCode},
    keys,
    middleware::auth::{AuthSession, RefreshSession},
    models::{NewUser, PendingSignup, UserSession},
    state::AppState,
};

// ensure time consistency
const OTP_RESEND_SECS: i64 = 2 * 60;
const OTP_EXPIRY_SECS: i64 = 5 * 60;
const ACCESS_TOKEN_EXPIRY_HOURS: i64 = 24;
const REFRESH_TOKEN_EXPIRY_DAYS: i64 = 30;

const OTP_VALIDITY: &str = "5 minutes";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/verify-email", post(verify_email))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/forget-password", post(forget_password))
        .route("/reset-password", post(reset_password))
}

/// A pending entry with `time_left` seconds of TTL remaining was issued at
/// `now + time_left - OTP_EXPIRY`; a new code may only be requested once
/// OTP_RESEND has passed since then.
fn resend_elapsed(now: DateTime<Utc>, time_left: i64) -> bool {
    let expiry_time = now + Duration::seconds(time_left);
    let sent_time = expiry_time - Duration::seconds(OTP_EXPIRY_SECS);

    now > sent_time + Duration::seconds(OTP_RESEND_SECS)
}

#[debug_handler]
async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let key = keys::signup_otp(&payload.email, payload.role);

    // a still-pending code blocks a new one until the cooldown passes
    if state.credentials.has_all(&[key.clone()]).await? {
        if let Some(time_left) = state.credentials.time_left(&key).await? {
            if !resend_elapsed(Utc::now(), time_left) {
                return Err(AppError::bad_request(
                    "A verification code already sent to your email, \
                     resend after a few moments or check your inbox.",
                ));
            }
        }
    }

    if state.repos.users.exists(&payload.email, payload.role).await? {
        let message = "Email already exists.";
        return Err(AppError::bad_request_field(
            Some(ErrorCode::EmailExists),
            "email",
            message,
        ));
    }

    // cheap checks are done; only now pay for hashing
    let otp = crypto::generate_otp(crypto::OTP_LENGTH);
    let otp_hash = crypto::hash(&otp)?;
    let password = crypto::hash(&payload.password)?;

    let now = Utc::now();
    let resend_at = now + Duration::seconds(OTP_RESEND_SECS);
    let expires_at = now + Duration::seconds(OTP_EXPIRY_SECS);

    let email = payload.email.clone();
    let sender = state.email.clone();
    tokio::spawn(async move {
        if let Err(err) = sender
            .send_signup_verification(&email, &otp, OTP_VALIDITY)
            .await
        {
            tracing::error!("failed to send signup verification email: {:?}", err);
        }
    });

    let pending = PendingSignup {
        full_name: payload.full_name,
        email: payload.email.clone(),
        role: payload.role,
        password,
        otp_hash,
    };
    let ttl = (expires_at - now).num_seconds() as u64;
    state.credentials.set_json(&key, &pending, ttl).await?;

    tracing::info!(email = %payload.email, role = %payload.role, "signup verification code issued");

    Ok(Json(OtpIssuedResponse {
        message: "A verification code has been sent to your email address.".to_string(),
        expires_at: expires_at.timestamp_millis(),
        resend_at: resend_at.timestamp_millis(),
    }))
}

// TODO: rate limit verify attempts per identity
#[debug_handler]
async fn verify_email(
    State(state): State<AppState>,
    Json(payload): Json<VerifyEmailPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let key = keys::signup_otp(&payload.email, payload.role);
    let Some(pending) = state.credentials.get_json::<PendingSignup>(&key).await? else {
        return Err(AppError::not_found(
            "Verification doesn't exist, it is either expired or completed.",
        ));
    };

    if !crypto::verify(&payload.otp_code, &pending.otp_hash) {
        // a wrong code leaves the pending entry untouched
        let message = "Incorrect otp code.";
        return Err(AppError::bad_request_field(None, "otp_code", message));
    }

    state.credentials.del(&[key]).await?;
    state.repos.users.create(NewUser::from(pending)).await?;

    tracing::info!(email = %payload.email, role = %payload.role, "account verified");

    Ok(StatusCode::CREATED)
}

#[debug_handler]
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let user = state.repos.users.find(&payload.email, payload.role).await?;

    // an identity mid-verification must finish signup first
    let signup_key = keys::signup_otp(&payload.email, payload.role);
    if state.credentials.has_all(&[signup_key]).await? {
        return Err(AppError::bad_request(
            "Please goto signup page to complete account registration first.",
        ));
    }

    let password_ok = match &user {
        Some(user) => crypto::verify(&payload.password, &user.password),
        None => {
            // burn a comparison so a missing account takes as long as a
            // wrong password
            crypto::verify(&payload.password, crypto::DUMMY_HASH);
            false
        }
    };

    let Some(user) = user else {
        return Err(invalid_credentials());
    };
    if !password_ok {
        return Err(invalid_credentials());
    }

    let now = Utc::now();
    let access_token = crypto::generate_session_id();
    let access_expiry = now + Duration::hours(ACCESS_TOKEN_EXPIRY_HOURS);

    let mut session = UserSession {
        id: user.id,
        role: user.role,
        access_token: access_token.clone(),
        refresh_token: None,
    };

    if payload.remember_me {
        // the refresh entry embeds its own token so refresh can find it
        let refresh_token = crypto::generate_session_id();
        let refresh_expiry = now + Duration::days(REFRESH_TOKEN_EXPIRY_DAYS);
        session.refresh_token = Some(refresh_token.clone());

        state
            .credentials
            .set_json(
                &keys::refresh_token(&refresh_token),
                &session,
                (refresh_expiry - now).num_seconds() as u64,
            )
            .await?;
    }

    state
        .credentials
        .set_json(
            &keys::access_token(&access_token),
            &session,
            (access_expiry - now).num_seconds() as u64,
        )
        .await?;

    tracing::info!(user_id = %user.id, role = %user.role, "user logged in");

    Ok(Json(LoginResponse {
        access_token,
        refresh_token: session.refresh_token,
        token_type: "Bearer".to_string(),
        expires_at: access_expiry.timestamp_millis(),
        role: user.role,
    }))
}

fn invalid_credentials() -> AppError {
    // same message for "no such account" and "wrong password"
    AppError::unauthorized(ErrorCode::InvalidCredentials, "Incorrect email or password.")
}

#[debug_handler]
async fn refresh(
    RefreshSession(session): RefreshSession,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let now = Utc::now();
    let access_token = crypto::generate_session_id();
    let access_expiry = now + Duration::hours(ACCESS_TOKEN_EXPIRY_HOURS);

    let old_access_key = keys::access_token(&session.access_token);
    let rotated = UserSession {
        access_token: access_token.clone(),
        ..session
    };

    state
        .credentials
        .set_json(
            &keys::access_token(&access_token),
            &rotated,
            (access_expiry - now).num_seconds() as u64,
        )
        .await?;

    // the refresh entry is rewritten in place with its TTL preserved: using
    // a refresh token never extends its own lifetime
    if let Some(refresh_token) = &rotated.refresh_token {
        state
            .credentials
            .update_json(&keys::refresh_token(refresh_token), &rotated)
            .await?;
    }

    // the replaced access token stops resolving immediately
    state.credentials.del(&[old_access_key]).await?;

    tracing::info!(user_id = %rotated.id, "access token rotated");

    Ok(Json(LoginResponse {
        access_token,
        refresh_token: None,
        token_type: "Bearer".to_string(),
        expires_at: access_expiry.timestamp_millis(),
        role: rotated.role,
    }))
}

/// Deleting absent keys is a no-op, so logging out twice is fine.
#[debug_handler]
async fn logout(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let mut stale = vec![keys::access_token(&session.access_token)];

    if let Some(refresh_token) = &session.refresh_token {
        stale.push(keys::refresh_token(refresh_token));
    }

    state.credentials.del(&stale).await?;

    tracing::info!(user_id = %session.id, "user logged out");

    Ok(StatusCode::OK)
}

#[debug_handler]
async fn forget_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgetPasswordPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let token_key = keys::pass_reset_token(&payload.email, payload.role);
    let otp_key = keys::pass_reset_otp(&payload.email, payload.role);

    // both slots are written together, so both must exist for the cooldown
    // to apply
    if state
        .credentials
        .has_all(&[token_key.clone(), otp_key.clone()])
        .await?
    {
        if let Some(time_left) = state.credentials.time_left(&token_key).await? {
            if !resend_elapsed(Utc::now(), time_left) {
                return Err(AppError::bad_request(
                    "A password reset link already sent to your email, \
                     resend after a few moments or check your inbox.",
                ));
            }
        }
    }

    // unlike login, this flow deliberately discloses whether the account
    // exists
    if state.repos.users.find(&payload.email, payload.role).await?.is_none() {
        let message = "Account doesn't exist.";
        return Err(AppError::not_found_field("email", message));
    }

    let token = crypto::generate_session_id();
    let otp = crypto::generate_otp(crypto::OTP_LENGTH);
    let otp_hash = crypto::hash(&otp)?;

    let now = Utc::now();
    let expires_at = now + Duration::seconds(OTP_EXPIRY_SECS);
    let resend_at = now + Duration::seconds(OTP_RESEND_SECS);

    let link = format!("{}/reset-password/{}", state.config.frontend_url, token);
    let email = payload.email.clone();
    let sender = state.email.clone();
    tokio::spawn(async move {
        if let Err(err) = sender
            .send_password_reset(&email, &link, &otp, OTP_VALIDITY)
            .await
        {
            tracing::error!("failed to send password reset link: {:?}", err);
        }
    });

    let ttl = (expires_at - now).num_seconds() as u64;
    state.credentials.set(&token_key, &token, ttl).await?;
    // the OTP slot stores a hash, same as signup codes
    state.credentials.set(&otp_key, &otp_hash, ttl).await?;

    tracing::info!(email = %payload.email, role = %payload.role, "password reset issued");

    Ok(Json(OtpIssuedResponse {
        message: "A password reset link has been sent to your email address.".to_string(),
        expires_at: expires_at.timestamp_millis(),
        resend_at: resend_at.timestamp_millis(),
    }))
}

#[debug_handler]
async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let token_key = keys::pass_reset_token(&payload.email, payload.role);
    let otp_key = keys::pass_reset_otp(&payload.email, payload.role);

    match (&payload.token, &payload.otp_code) {
        (Some(token), None) => {
            let stored = state.credentials.get(&token_key).await?;

            if stored.as_deref() != Some(token.as_str()) {
                return Err(AppError::bad_request(
                    "Invalid or expired password reset link.",
                ));
            }
        }
        (None, Some(otp_code)) => {
            let stored = state.credentials.get(&otp_key).await?;
            let valid = stored
                .map(|hash| crypto::verify(otp_code, &hash))
                .unwrap_or(false);

            if !valid {
                return Err(AppError::bad_request("Invalid or expired OTP code."));
            }
        }
        _ => {
            return Err(AppError::bad_request(
                "Please use either OTP code or a password reset link.",
            ));
        }
    }

    let password = crypto::hash(&payload.password)?;
    let updated = state
        .repos
        .users
        .set_password(&payload.email, payload.role, &password)
        .await?;

    if !updated {
        // same response as a bad token: the credential matched but the
        // account is gone, don't disclose which
        return Err(AppError::bad_request(
            "Invalid or expired password reset link.",
        ));
    }

    // consume both slots no matter which one verified
    state.credentials.del(&[token_key, otp_key]).await?;

    tracing::info!(email = %payload.email, role = %payload.role, "password reset completed");

    Ok(StatusCode::OK)
}
