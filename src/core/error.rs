//! Error handling - Error taxonomy and its HTTP mapping
//!
//! Every operation of the chat core fails with one of the kinds below. The kind
//! travels in the JSON body as `code`, so clients can tell an expired edit window
//! apart from a plain permission failure even where the HTTP status is shared.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::fmt;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Chat, message, reaction or block entry absent (or logically invisible)
    NotFound,
    /// Authenticated but not entitled: non-member, non-author, non-admin, blocked
    Forbidden,
    /// Duplicate personal chat or duplicate reaction
    Conflict,
    /// Missing or oversized fields, cross-chat reply target
    InvalidInput,
    /// Right author, but the edit window is over
    EditWindowExpired,
    /// Not applicable to this chat kind or message state
    InvalidOperation,
    /// Token missing or rejected by the identity verifier
    AuthError,
    /// Store failure or anything else the caller cannot fix
    Internal,
}

impl ErrorKind {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::EditWindowExpired => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::InvalidOperation => StatusCode::CONFLICT,
            ErrorKind::AuthError => StatusCode::UNAUTHORIZED,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    code: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

#[derive(Debug)]
pub struct AppError {
    kind: ErrorKind,
    message: &'static str,
    details: Option<String>,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: &'static str) -> Self {
        Self {
            kind,
            message,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &'static str {
        self.message
    }

    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }

    // Common error constructors
    pub fn not_found(message: &'static str) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn forbidden(message: &'static str) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    pub fn conflict(message: &'static str) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn invalid_input(message: &'static str) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    pub fn edit_window_expired(message: &'static str) -> Self {
        Self::new(ErrorKind::EditWindowExpired, message)
    }

    pub fn invalid_operation(message: &'static str) -> Self {
        Self::new(ErrorKind::InvalidOperation, message)
    }

    pub fn unauthorized(message: &'static str) -> Self {
        Self::new(ErrorKind::AuthError, message)
    }

    pub fn internal_server_error(message: &'static str) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.details {
            Some(details) => write!(f, "{:?}: {} ({})", self.kind, self.message, details),
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::not_found("Resource not found"),
            // store failures are never retried here, the caller decides
            other => {
                error!("Store failure: {:?}", other);
                Self::internal_server_error("Internal server error")
            }
        }
    }
}

impl From<axum::Error> for AppError {
    fn from(err: axum::Error) -> Self {
        Self::internal_server_error("Internal server error").with_details(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::invalid_input("Malformed request body").with_details(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::invalid_input("Malformed query string").with_details(rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::invalid_input("Validation error").with_details(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let body = Json(ErrorResponse {
            error: self.message,
            code: self.kind,
            details: self.details,
        });
        (status, body).into_response()
    }
}
