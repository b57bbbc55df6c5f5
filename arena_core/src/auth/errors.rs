//! Authentication error types.

use super::models::Permission;
use thiserror::Error;

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// JWT token error
    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    /// No bearer token supplied
    #[error("Missing access token")]
    MissingToken,

    /// Caller lacks a permission
    #[error("Permission denied: {0}")]
    Forbidden(Permission),

    /// Profile lookup failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl AuthError {
    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// JWT errors are sanitized to prevent information disclosure
    /// about the token structure.
    pub fn client_message(&self) -> String {
        match self {
            AuthError::JwtError(_) => "Authentication failed".to_string(),
            AuthError::Database(_) => "An internal error occurred".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;
