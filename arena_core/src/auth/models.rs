//! Authentication data models.

use super::errors::{AuthError, AuthResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User ID type
pub type UserId = i64;

/// Account role carried in access tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Moderator,
    Admin,
}

impl Role {
    /// Permissions granted to this role
    pub fn permissions(self) -> &'static [Permission] {
        match self {
            Role::User => &[],
            Role::Moderator => &[Permission::ViewTournaments],
            Role::Admin => &[
                Permission::ViewTournaments,
                Permission::ManageTournaments,
                Permission::SettleTournaments,
                Permission::OverrideStatus,
            ],
        }
    }

    pub fn allows(self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Moderator => write!(f, "moderator"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "moderator" => Ok(Role::Moderator),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Admin capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    /// List, inspect and search tournaments including hidden ones
    ViewTournaments,
    /// Create tournaments, set credentials, toggle visibility
    ManageTournaments,
    /// Finalize and cancel tournaments
    SettleTournaments,
    /// Overwrite status outside the state machine
    OverrideStatus,
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Permission::ViewTournaments => write!(f, "view_tournaments"),
            Permission::ManageTournaments => write!(f, "manage_tournaments"),
            Permission::SettleTournaments => write!(f, "settle_tournaments"),
            Permission::OverrideStatus => write!(f, "override_status"),
        }
    }
}

/// JWT claims for access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub sub: UserId, // User ID
    pub username: String,
    #[serde(default)]
    pub role: Role,
    pub exp: i64, // Expiration timestamp
    pub iat: i64, // Issued at timestamp
}

/// Authenticated caller injected into request extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: UserId,
    pub username: String,
    pub role: Role,
}

impl AuthUser {
    /// Fail with `AuthError::Forbidden` unless the caller holds `permission`
    pub fn require(&self, permission: Permission) -> AuthResult<()> {
        if self.role.allows(permission) {
            Ok(())
        } else {
            Err(AuthError::Forbidden(permission))
        }
    }
}

impl From<AccessTokenClaims> for AuthUser {
    fn from(claims: AccessTokenClaims) -> Self {
        Self {
            user_id: claims.sub,
            username: claims.username,
            role: claims.role,
        }
    }
}

/// User profile as supplied by the account service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: Option<String>,
    pub in_game_name: Option<String>,
    pub free_fire_uid: Option<String>,
    pub avatar_id: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_has_no_admin_permissions() {
        for permission in [
            Permission::ViewTournaments,
            Permission::ManageTournaments,
            Permission::SettleTournaments,
            Permission::OverrideStatus,
        ] {
            assert!(!Role::User.allows(permission));
        }
    }

    #[test]
    fn test_moderator_can_only_view() {
        assert!(Role::Moderator.allows(Permission::ViewTournaments));
        assert!(!Role::Moderator.allows(Permission::SettleTournaments));
        assert!(!Role::Moderator.allows(Permission::OverrideStatus));
    }

    #[test]
    fn test_require_returns_forbidden() {
        let user = AuthUser {
            user_id: 3,
            username: "mod".to_string(),
            role: Role::Moderator,
        };
        let err = user.require(Permission::ManageTournaments).unwrap_err();
        assert!(matches!(err, AuthError::Forbidden(Permission::ManageTournaments)));
    }

    #[test]
    fn test_role_parse_is_case_insensitive() {
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn test_claims_without_role_default_to_user() {
        let claims: AccessTokenClaims = serde_json::from_value(serde_json::json!({
            "sub": 1, "username": "u", "exp": 0, "iat": 0
        }))
        .unwrap();
        assert_eq!(claims.role, Role::User);
    }
}
