//! Authentication module verifying bearer tokens and gating admin actions.
//!
//! Sessions are issued by the platform's account service. This module only
//! verifies HS256 access tokens, maps their role to permissions and exposes
//! the user profile contract the tournament core reads.
//!
//! ## Example
//!
//! ```
//! use arena_core::auth::{AuthManager, Permission, Role};
//!
//! let auth = AuthManager::new("a_long_enough_secret_for_signing_tokens".to_string());
//! let token = auth.issue_access_token(7, "admin7", Role::Admin).unwrap();
//! let user = auth.authenticate(&token).unwrap();
//! assert!(user.require(Permission::SettleTournaments).is_ok());
//! ```

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{AuthError, AuthResult};
pub use manager::AuthManager;
pub use models::{AccessTokenClaims, AuthUser, Permission, Role, UserId, UserProfile};
