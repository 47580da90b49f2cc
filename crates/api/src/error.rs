use std::collections::BTreeMap;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Application error codes surfaced to clients alongside the HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidInput,
    NotFound,
    InternalError,
    AuthRequired,
    EmailExists,
    InvalidCredentials,
}

#[derive(Debug)]
pub enum AppError {
    /// Internal errors - logged but return generic 500 to user
    Internal(anyhow::Error),
    /// User-facing errors - message is safe to show
    External {
        status: StatusCode,
        code: Option<ErrorCode>,
        message: String,
        /// Field name → message, for errors tied to a specific input field.
        details: Option<BTreeMap<&'static str, String>>,
    },
    /// Validation errors - safe to show
    Validation(String),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::External {
            status: StatusCode::BAD_REQUEST,
            code: None,
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_request_field(
        code: Option<ErrorCode>,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        let message = message.into();
        Self::External {
            status: StatusCode::BAD_REQUEST,
            code,
            message: message.clone(),
            details: Some(BTreeMap::from([(field, message)])),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::External {
            status: StatusCode::NOT_FOUND,
            code: Some(ErrorCode::NotFound),
            message: message.into(),
            details: None,
        }
    }

    pub fn not_found_field(field: &'static str, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::External {
            status: StatusCode::NOT_FOUND,
            code: Some(ErrorCode::NotFound),
            message: message.clone(),
            details: Some(BTreeMap::from([(field, message)])),
        }
    }

    pub fn unauthorized(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::External {
            status: StatusCode::UNAUTHORIZED,
            code: Some(code),
            message: message.into(),
            details: None,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<ErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<BTreeMap<&'static str, String>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Internal(err) => {
                tracing::error!("internal error: {:?}", err);
                sentry::capture_error(
                    err.as_ref() as &(dyn std::error::Error + Send + Sync + 'static)
                );

                let body = ErrorBody {
                    error: "Internal server error".to_string(),
                    code: Some(ErrorCode::InternalError),
                    details: None,
                };
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
            AppError::External {
                status,
                code,
                message,
                details,
            } => {
                let body = ErrorBody {
                    error: message,
                    code,
                    details,
                };
                (status, Json(body)).into_response()
            }
            AppError::Validation(msg) => {
                let body = ErrorBody {
                    error: msg,
                    code: Some(ErrorCode::InvalidInput),
                    details: None,
                };
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
        }
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Internal(err.into())
    }
}
