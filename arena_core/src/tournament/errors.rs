//! Tournament error types.

use super::models::{TournamentId, TournamentStatus};
use crate::auth::{AuthError, UserId};
use crate::wallet::WalletError;
use thiserror::Error;

/// Operation attempted against the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    SetCredentials,
    Finalize,
    Cancel,
}

impl std::fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleAction::SetCredentials => write!(f, "set credentials"),
            LifecycleAction::Finalize => write!(f, "finalize"),
            LifecycleAction::Cancel => write!(f, "cancel"),
        }
    }
}

/// Coarse failure classes surfaced to API callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    StateConflict,
    InsufficientBalance,
    NotFound,
    Authorization,
    Internal,
}

/// Tournament errors
#[derive(Debug, Error)]
pub enum TournamentError {
    #[error("Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("Tournament not found: {0}")]
    NotFound(TournamentId),

    #[error("User {0} is not a participant")]
    ParticipantNotFound(UserId),

    #[error("Tournament is not open (status: {0})")]
    TournamentNotOpen(TournamentStatus),

    #[error("Tournament is full")]
    TournamentFull,

    #[error("Already joined this tournament")]
    AlreadyJoined,

    #[error("Insufficient balance: available {available}, required {required}")]
    InsufficientBalance { available: i64, required: i64 },

    #[error("Tournament already finalized")]
    AlreadyFinalized,

    #[error("Tournament already cancelled")]
    AlreadyCancelled,

    #[error("Cannot {action} a tournament in status {from}")]
    InvalidTransition {
        from: TournamentStatus,
        action: LifecycleAction,
    },

    #[error("User has not joined this tournament")]
    NotJoined,

    #[error("Room details are not yet available")]
    NotYetAvailable,

    #[error("Wallet error: {0}")]
    Wallet(WalletError),

    #[error("Profile error: {0}")]
    Profile(#[from] AuthError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<WalletError> for TournamentError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::InsufficientBalance {
                available,
                required,
            } => TournamentError::InsufficientBalance {
                available,
                required,
            },
            WalletError::Database(e) => TournamentError::Database(e),
            other => TournamentError::Wallet(other),
        }
    }
}

impl TournamentError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        TournamentError::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Failure class used for HTTP status mapping
    pub fn kind(&self) -> ErrorKind {
        match self {
            TournamentError::Validation { .. } | TournamentError::ParticipantNotFound(_) => {
                ErrorKind::Validation
            }
            TournamentError::NotFound(_) => ErrorKind::NotFound,
            TournamentError::TournamentNotOpen(_)
            | TournamentError::TournamentFull
            | TournamentError::AlreadyJoined
            | TournamentError::AlreadyFinalized
            | TournamentError::AlreadyCancelled
            | TournamentError::InvalidTransition { .. } => ErrorKind::StateConflict,
            TournamentError::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            TournamentError::NotJoined | TournamentError::NotYetAvailable => {
                ErrorKind::Authorization
            }
            TournamentError::Wallet(WalletError::WalletNotFound(_)) => ErrorKind::NotFound,
            TournamentError::Wallet(WalletError::InvalidAmount(_)) => ErrorKind::Validation,
            TournamentError::Wallet(WalletError::DuplicateTransaction(_)) => {
                ErrorKind::StateConflict
            }
            TournamentError::Profile(AuthError::Database(_)) => ErrorKind::Internal,
            TournamentError::Profile(_) => ErrorKind::Authorization,
            TournamentError::Wallet(_)
            | TournamentError::Database(_)
            | TournamentError::Serialization(_) => ErrorKind::Internal,
        }
    }

    /// Get a sanitized error message safe for client display
    pub fn client_message(&self) -> String {
        match self {
            TournamentError::Wallet(e) => e.client_message(),
            TournamentError::Profile(e) => e.client_message(),
            TournamentError::Database(_) | TournamentError::Serialization(_) => {
                "An internal error occurred".to_string()
            }
            TournamentError::InsufficientBalance { .. } => {
                "Insufficient balance to join this tournament".to_string()
            }
            TournamentError::NotJoined => "You have not joined this tournament".to_string(),
            other => other.to_string(),
        }
    }
}

pub type TournamentResult<T> = Result<T, TournamentError>;
