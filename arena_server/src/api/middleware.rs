//! Authentication middleware for protected endpoints.
//!
//! Extracts and validates the JWT access token from the `Authorization`
//! header, then injects the caller as an [`AuthUser`] into request
//! extensions for downstream handlers.
//!
//! ```rust,no_run
//! use arena_core::auth::AuthUser;
//! use axum::extract::Extension;
//!
//! async fn protected_handler(Extension(user): Extension<AuthUser>) -> String {
//!     format!("Authenticated as user {}", user.user_id)
//! }
//! # let _ = protected_handler;
//! ```

use arena_core::auth::{AuthUser, Permission};
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::AppState;
use super::error::ApiError;
use crate::logging;

/// Validate the bearer token and inject the caller
///
/// - **Success**: Token valid → injects `AuthUser` → calls next handler
/// - **Missing header, bad format, invalid or expired token**: `401 Unauthorized`
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let Some(token) = token else {
        return ApiError::unauthorized().into_response();
    };

    match state.auth.authenticate(token) {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => {
            tracing::debug!("Rejected access token: {}", e);
            ApiError::unauthorized().into_response()
        }
    }
}

/// Check an admin permission, recording denials as security events
pub fn require_permission(
    user: &AuthUser,
    permission: Permission,
    tournament_id: Option<i64>,
) -> Result<(), ApiError> {
    user.require(permission).map_err(|e| {
        logging::log_security_event(
            "permission_denied",
            Some(user.user_id),
            tournament_id,
            &format!("role {} lacks {}", user.role, permission),
        );
        ApiError::from(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_core::auth::Role;
    use axum::http::StatusCode;

    fn user(role: Role) -> AuthUser {
        AuthUser {
            user_id: 5,
            username: "mod5".to_string(),
            role,
        }
    }

    #[test]
    fn test_moderator_can_only_view() {
        let moderator = user(Role::Moderator);
        assert!(require_permission(&moderator, Permission::ViewTournaments, None).is_ok());

        let err =
            require_permission(&moderator, Permission::SettleTournaments, Some(3)).unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_player_has_no_admin_permissions() {
        let player = user(Role::User);
        for permission in [
            Permission::ViewTournaments,
            Permission::ManageTournaments,
            Permission::SettleTournaments,
            Permission::OverrideStatus,
        ] {
            assert!(require_permission(&player, permission, None).is_err());
        }
    }
}
