use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;

/// AppError
///
/// Every error kind the core can surface at the request boundary. All variants
/// are recoverable: none of them crash the process, and each maps onto exactly
/// one entry of the status taxonomy below.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("that username is already registered")]
    DuplicateUsername,

    #[error("{0} not found")]
    NotFound(&'static str),

    // Deliberately vague at the boundary: the login flow maps a missing user
    // onto this variant as well, so the response body never reveals which half
    // of the credential pair was wrong.
    #[error("invalid username or password")]
    WrongPassword,

    #[error("{field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("authentication required")]
    Unauthorized,

    #[error("you do not have permission to perform this action")]
    Forbidden,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// The status taxonomy entry this error maps onto.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::DuplicateUsername | AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::WrongPassword | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// validation
    ///
    /// Shorthand constructor for field-level validation failures.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field,
            message: message.into(),
        }
    }
}

/// ErrorBody
///
/// The negotiated JSON error shape: `{error, message, code, details?}`.
/// Browser clients never see this for 401/403, since the browser error layer
/// in `lib.rs` converts those into redirects instead.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// catalog_entry
///
/// Maps every status code of the error surface onto its human-readable
/// name/description pair. Codes outside the taxonomy collapse onto the
/// 500 entry.
pub fn catalog_entry(code: StatusCode) -> (&'static str, &'static str) {
    match code.as_u16() {
        400 => (
            "Bad Request",
            "The request was malformed or failed validation.",
        ),
        401 => ("Unauthorized", "Sign in to access this page."),
        403 => (
            "Forbidden",
            "You do not have permission to access this page.",
        ),
        404 => ("Not Found", "The requested resource does not exist."),
        405 => (
            "Method Not Allowed",
            "The HTTP method is not supported for this path.",
        ),
        413 => (
            "Payload Too Large",
            "The request body exceeds the allowed size.",
        ),
        429 => ("Too Many Requests", "Slow down and try again later."),
        _ => (
            "Internal Server Error",
            "The server encountered an unexpected condition. Try again later.",
        ),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (name, description) = catalog_entry(status);

        let (message, details) = match &self {
            // Storage failures are logged with full context server-side but the
            // client only ever sees the opaque taxonomy entry.
            AppError::Database(e) => {
                tracing::error!("storage failure: {:?}", e);
                (description.to_string(), None)
            }
            AppError::Internal(detail) => {
                tracing::error!("internal failure: {}", detail);
                (description.to_string(), None)
            }
            AppError::Validation { field, .. } => {
                (self.to_string(), Some(format!("field: {}", field)))
            }
            _ => (self.to_string(), None),
        };

        let body = ErrorBody {
            error: name.to_string(),
            message,
            code: status.as_u16(),
            details,
        };

        (status, Json(body)).into_response()
    }
}
