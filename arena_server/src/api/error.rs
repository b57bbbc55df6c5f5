//! Error responses for the HTTP API.
//!
//! Every failure is rendered as `{"success": false, "error": "..."}` with a
//! status derived from the engine's error taxonomy. Internal errors are
//! logged in full and returned with a sanitized message.

use arena_core::auth::AuthError;
use arena_core::tournament::{ErrorKind, TournamentError};
use arena_core::wallet::WalletError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

/// Error returned by every handler
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Authentication required")
    }
}

/// HTTP status for an engine failure class
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::StateConflict => StatusCode::CONFLICT,
        ErrorKind::InsufficientBalance => StatusCode::PAYMENT_REQUIRED,
        ErrorKind::Authorization => StatusCode::FORBIDDEN,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Metric label for an engine failure class
pub fn kind_label(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Validation => "validation",
        ErrorKind::NotFound => "not_found",
        ErrorKind::StateConflict => "state_conflict",
        ErrorKind::InsufficientBalance => "insufficient_balance",
        ErrorKind::Authorization => "authorization",
        ErrorKind::Internal => "internal",
    }
}

impl From<TournamentError> for ApiError {
    fn from(err: TournamentError) -> Self {
        let kind = err.kind();
        if kind == ErrorKind::Internal {
            tracing::error!("Tournament operation failed: {}", err);
        }
        Self::new(status_for(kind), err.client_message())
    }
}

impl From<WalletError> for ApiError {
    fn from(err: WalletError) -> Self {
        let status = match &err {
            WalletError::WalletNotFound(_) => StatusCode::NOT_FOUND,
            WalletError::InvalidAmount(_) => StatusCode::BAD_REQUEST,
            WalletError::InsufficientBalance { .. } => StatusCode::PAYMENT_REQUIRED,
            WalletError::DuplicateTransaction(_) => StatusCode::CONFLICT,
            _ => {
                tracing::error!("Wallet operation failed: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, err.client_message())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let status = match &err {
            AuthError::Forbidden(_) => StatusCode::FORBIDDEN,
            AuthError::Database(_) => {
                tracing::error!("Profile lookup failed: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AuthError::JwtError(_) | AuthError::MissingToken => StatusCode::UNAUTHORIZED,
        };
        Self::new(status, err.client_message())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            success: false,
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
