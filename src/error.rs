//! Error types shared across layers.
//!
//! - [`AppError`] - infrastructure and API errors, rendered as JSON
//! - [`ResolveError`] - terminal outcomes of resolving a short link, rendered
//!   as HTML pages by [`crate::web::pages`]

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorInfo,
}

/// Machine-readable error payload embedded in JSON responses.
#[derive(Debug, Serialize)]
pub struct ErrorInfo {
    pub code: &'static str,
    pub message: String,
    pub details: Value,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{message}")]
    Validation { message: String, details: Value },
    #[error("{message}")]
    NotFound { message: String, details: Value },
    #[error("{message}")]
    Conflict { message: String, details: Value },
    #[error("{message}")]
    Internal { message: String, details: Value },
    /// Stored data that cannot be read back; retrying will not help.
    #[error("{message}")]
    Data { message: String, details: Value },
}

impl AppError {
    pub fn bad_request(message: impl Into<String>, details: Value) -> Self {
        Self::Validation {
            message: message.into(),
            details,
        }
    }
    pub fn not_found(message: impl Into<String>, details: Value) -> Self {
        Self::NotFound {
            message: message.into(),
            details,
        }
    }
    pub fn conflict(message: impl Into<String>, details: Value) -> Self {
        Self::Conflict {
            message: message.into(),
            details,
        }
    }
    pub fn internal(message: impl Into<String>, details: Value) -> Self {
        Self::Internal {
            message: message.into(),
            details,
        }
    }
    pub fn data(message: impl Into<String>, details: Value) -> Self {
        Self::Data {
            message: message.into(),
            details,
        }
    }

    /// Whether repeating the failed operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match self {
            AppError::Validation { message, details } => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                message,
                details,
            ),
            AppError::NotFound { message, details } => {
                (StatusCode::NOT_FOUND, "not_found", message, details)
            }
            AppError::Conflict { message, details } => {
                (StatusCode::CONFLICT, "conflict", message, details)
            }
            AppError::Internal { message, details } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                message,
                details,
            ),
            AppError::Data { message, details } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "data_error",
                message,
                details,
            ),
        };

        let body = ErrorBody {
            error: ErrorInfo {
                code,
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

pub fn map_sqlx_error(e: sqlx::Error) -> AppError {
    if matches!(
        e,
        sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::Decode(_)
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::TypeNotFound { .. }
    ) {
        return AppError::data("Unreadable row", json!({ "reason": e.to_string() }));
    }

    if let Some(db) = e.as_database_error() {
        if db.is_unique_violation() {
            return AppError::conflict(
                "Unique constraint violation",
                json!({ "constraint": db.constraint() }),
            );
        }
        if db.is_foreign_key_violation() {
            return AppError::bad_request(
                "Referenced record does not exist",
                json!({ "constraint": db.constraint() }),
            );
        }
    }

    AppError::internal("Database error", json!({ "reason": e.to_string() }))
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        map_sqlx_error(e)
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = e.field_errors().keys().map(|k| k.to_string()).collect();
        fields.sort();
        AppError::bad_request(
            "Validation failed",
            json!({ "fields": fields, "reason": e.to_string() }),
        )
    }
}

/// Terminal reasons a short link cannot be resolved to a destination.
///
/// A wrong password is deliberately absent: it leaves the flow in
/// [`crate::application::services::RedirectState::PasswordRequired`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("This link does not exist")]
    NotFound,
    #[error("This link has expired")]
    Expired,
    #[error("This link is not active yet")]
    NotYetActive,
    #[error("This link has reached its click limit")]
    ClickLimitReached,
    #[error("This widget cannot be opened directly")]
    InvalidWidget,
    #[error("This link has no valid destination")]
    InvalidDestination,
    /// Lookup kept failing after all retries; shown to visitors like `NotFound`.
    #[error("This link is unavailable right now")]
    LookupFailed,
    #[error("This link is already being opened")]
    AlreadyInFlight,
}

impl ResolveError {
    /// Stable identifier used in logs and templates.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Expired => "expired",
            Self::NotYetActive => "not_yet_active",
            Self::ClickLimitReached => "click_limit_reached",
            Self::InvalidWidget => "invalid_widget",
            Self::InvalidDestination => "invalid_destination",
            Self::LookupFailed => "lookup_failed",
            Self::AlreadyInFlight => "already_in_flight",
        }
    }

    /// HTTP status used when the failure is rendered as a page.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::AlreadyInFlight => StatusCode::CONFLICT,
            _ => StatusCode::NOT_FOUND,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_failures_render_as_not_found() {
        for err in [
            ResolveError::NotFound,
            ResolveError::Expired,
            ResolveError::NotYetActive,
            ResolveError::ClickLimitReached,
            ResolveError::InvalidWidget,
            ResolveError::InvalidDestination,
            ResolveError::LookupFailed,
        ] {
            assert_eq!(err.status(), StatusCode::NOT_FOUND, "{}", err.code());
        }
        assert_eq!(ResolveError::AlreadyInFlight.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_app_error_status_codes() {
        let resp = AppError::bad_request("bad", json!({})).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = AppError::internal("boom", json!({})).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_decode_errors_are_not_transient() {
        let decode = map_sqlx_error(sqlx::Error::ColumnDecode {
            index: "\"ab_test_config\"".to_string(),
            source: "invalid type: null, expected struct".into(),
        });
        assert!(matches!(decode, AppError::Data { .. }));
        assert!(!decode.is_transient());

        assert!(map_sqlx_error(sqlx::Error::PoolTimedOut).is_transient());
        assert!(!AppError::not_found("gone", json!({})).is_transient());
    }
}
