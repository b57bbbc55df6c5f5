//! Access token verification.

use super::{
    errors::AuthResult,
    models::{AccessTokenClaims, AuthUser, Role, UserId},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};

/// Authentication manager
#[derive(Clone)]
pub struct AuthManager {
    jwt_secret: String,
    access_token_duration: Duration,
}

impl AuthManager {
    /// Create a new authentication manager
    ///
    /// # Arguments
    ///
    /// * `jwt_secret` - Secret key shared with the account service
    pub fn new(jwt_secret: String) -> Self {
        Self {
            jwt_secret,
            access_token_duration: Duration::minutes(15),
        }
    }

    /// Verify access token
    pub fn verify_access_token(&self, token: &str) -> AuthResult<AccessTokenClaims> {
        let token_data = decode::<AccessTokenClaims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )?;

        Ok(token_data.claims)
    }

    /// Verify a token and return the caller it identifies
    pub fn authenticate(&self, token: &str) -> AuthResult<AuthUser> {
        self.verify_access_token(token).map(AuthUser::from)
    }

    /// Issue an access token signed with the shared secret
    ///
    /// Used by operational tooling and tests; regular sessions come from
    /// the account service.
    pub fn issue_access_token(
        &self,
        user_id: UserId,
        username: &str,
        role: Role,
    ) -> AuthResult<String> {
        let now = Utc::now();
        let claims = AccessTokenClaims {
            sub: user_id,
            username: username.to_string(),
            role,
            exp: (now + self.access_token_duration).timestamp(),
            iat: now.timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )?;

        Ok(token)
    }
}
