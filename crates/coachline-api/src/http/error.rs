//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use coachline_core::relay::RelayError;
use coachline_types::error::{AccountError, HistoryError};

use crate::http::response::{ApiResponse, request_id};

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Account and session errors.
    Account(AccountError),
    /// Conversation history errors.
    History(HistoryError),
    /// The relay refused a connection.
    Relay(RelayError),
    /// Validation error.
    Validation(String),
}

impl From<AccountError> for AppError {
    fn from(e: AccountError) -> Self {
        AppError::Account(e)
    }
}

impl From<HistoryError> for AppError {
    fn from(e: HistoryError) -> Self {
        AppError::History(e)
    }
}

impl From<RelayError> for AppError {
    fn from(e: RelayError) -> Self {
        AppError::Relay(e)
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Account(e @ (AccountError::InvalidUsername(_) | AccountError::InvalidPassword(_))) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
            }
            AppError::Account(AccountError::UsernameTaken(name)) => (
                StatusCode::CONFLICT,
                "USERNAME_TAKEN",
                format!("Username '{name}' is already taken"),
            ),
            AppError::Account(AccountError::InvalidCredentials) => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "Wrong username or password".to_string(),
            ),
            AppError::Account(AccountError::Unauthenticated) => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Missing, expired or unknown session token".to_string(),
            ),
            AppError::Account(e) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "ACCOUNT_ERROR", e.to_string())
            }
            AppError::History(HistoryError::UnknownUser(name)) => (
                StatusCode::NOT_FOUND,
                "USER_NOT_FOUND",
                format!("User '{name}' not found"),
            ),
            AppError::History(e) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "HISTORY_ERROR", e.to_string())
            }
            AppError::Relay(e) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", e.to_string()),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status.is_server_error() {
            tracing::error!(code, error = %message, "request failed");
        }

        let body = ApiResponse::error(code, &message, request_id());
        (status, axum::Json(body)).into_response()
    }
}
