//! Session token claims and issuance.

use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::types::{AuthUuid, SessionToken};

/// Signature algorithm for every session token.
pub const SESSION_ALGORITHM: Algorithm = Algorithm::HS512;

/// Claims embedded in a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Local user id
    pub user_id: i64,
    /// Display name at issuance, for clients only
    pub user_name: String,
    /// Snapshot of the user's revocation marker
    pub auth_uuid: AuthUuid,
    /// Expiration time (Unix timestamp, seconds)
    pub exp: u64,
}

/// Signs session tokens with the configured secret.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    ttl_seconds: u64,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            ttl_seconds: config.token_ttl_seconds,
        }
    }

    /// Issue a token that expires `ttl_seconds` from now.
    pub fn issue(
        &self,
        user_id: i64,
        user_name: &str,
        auth_uuid: &AuthUuid,
    ) -> Result<SessionToken, jsonwebtoken::errors::Error> {
        self.issue_at(user_id, user_name, auth_uuid, unix_now())
    }

    /// Issue a token as if the current time were `issued_at`.
    pub fn issue_at(
        &self,
        user_id: i64,
        user_name: &str,
        auth_uuid: &AuthUuid,
        issued_at: u64,
    ) -> Result<SessionToken, jsonwebtoken::errors::Error> {
        let claims = SessionClaims {
            user_id,
            user_name: user_name.to_string(),
            auth_uuid: auth_uuid.clone(),
            exp: issued_at + self.ttl_seconds,
        };

        let token = encode(&Header::new(SESSION_ALGORITHM), &claims, &self.encoding_key)?;
        Ok(SessionToken::new(token))
    }
}

/// Current Unix time in whole seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
