//! Session token validation.

use std::fmt;
use std::sync::Arc;

use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::{debug, warn};

use crate::auth::context::{AuthenticatedUser, Session};
use crate::auth::token::{SESSION_ALGORITHM, SessionClaims, unix_now};
use crate::auth::user_store::UserStore;
use crate::config::AuthConfig;

/// Reasons a supplied session token is refused.
#[derive(Debug, Clone)]
pub enum AuthError {
    /// Signature does not verify, or the token is not a well-formed session token
    Malformed,
    /// Token is past its validity window
    Expired,
    /// The user has logged in again since this token was issued
    Revoked,
    /// The user lookup failed
    Database(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "Failed to decode JWT! Please provide correct JWT!"),
            Self::Expired => write!(
                f,
                "Your sign-in state has been expired! Please sign-in again!"
            ),
            Self::Revoked => write!(
                f,
                "Your sign-in state has been invalidated! Please sign-in again!"
            ),
            Self::Database(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

/// Validates session tokens against the signing secret and the user table.
pub struct SessionValidator {
    decoding_key: DecodingKey,
    validation: Validation,
    user_store: Arc<UserStore>,
}

impl SessionValidator {
    pub fn new(config: &AuthConfig, user_store: Arc<UserStore>) -> Self {
        let mut validation = Validation::new(SESSION_ALGORITHM);
        // Expiry is compared against our own clock in `validate_at`, with no leeway.
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            user_store,
        }
    }

    /// Validate an optional raw token at the current time.
    pub async fn validate(&self, raw_token: Option<&str>) -> Result<Session, AuthError> {
        self.validate_at(raw_token, unix_now()).await
    }

    /// Validate an optional raw token as if the current time were `now`.
    ///
    /// Checks run in order: signature and structure, expiry, user lookup
    /// (missing or disabled users yield `Anonymous`), revocation marker.
    pub async fn validate_at(
        &self,
        raw_token: Option<&str>,
        now: u64,
    ) -> Result<Session, AuthError> {
        let Some(token) = raw_token else {
            return Ok(Session::Anonymous);
        };

        let claims = self.decode_claims(token)?;

        if now >= claims.exp {
            warn!("Session token for user {} expired at {}", claims.user_id, claims.exp);
            return Err(AuthError::Expired);
        }

        let user = self
            .user_store
            .get_enabled_user_by_id(claims.user_id)
            .await
            .map_err(|e| AuthError::Database(e.to_string()))?;

        let Some(user) = user else {
            warn!(
                "Session token names missing or disabled user {}",
                claims.user_id
            );
            return Ok(Session::Anonymous);
        };

        if user.auth_uuid.as_deref() != Some(claims.auth_uuid.as_str()) {
            warn!("Session token for user {} has a stale marker", user.id);
            return Err(AuthError::Revoked);
        }

        debug!("Session verified for user {}", user.id);
        Ok(Session::Authenticated(AuthenticatedUser::new(user)))
    }

    /// Verify the signature and decode the claims without any other check.
    pub fn decode_claims(&self, token: &str) -> Result<SessionClaims, AuthError> {
        decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                warn!("Rejected malformed session token: {}", e);
                AuthError::Malformed
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::providers::{Provider, ProviderIdentity};
    use crate::auth::token::TokenIssuer;
    use crate::db::schema::UserRecord;
    use crate::db::{DatabaseConfig, create_connection, ensure_schema};
    use crate::types::{AuthUuid, SessionToken};
    use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};

    const SECRET: &str = "validator-test-secret";

    struct Fixture {
        validator: SessionValidator,
        issuer: TokenIssuer,
        store: Arc<UserStore>,
    }

    async fn setup() -> Fixture {
        let db = create_connection(DatabaseConfig::memory()).await.unwrap();
        ensure_schema(&db).await.unwrap();
        let store = Arc::new(UserStore::new(db));
        let config = AuthConfig::with_secret(SECRET);

        Fixture {
            validator: SessionValidator::new(&config, store.clone()),
            issuer: TokenIssuer::new(&config),
            store,
        }
    }

    /// Create a user and log them in once, returning the user and a token.
    async fn logged_in_user(fx: &Fixture, kakao_id: i64, issued_at: u64) -> (UserRecord, SessionToken) {
        let identity = ProviderIdentity {
            provider: Provider::Kakao,
            provider_user_id: kakao_id,
            display_name: format!("user-{}", kakao_id),
        };
        let user = fx.store.get_or_create_user(&identity).await.unwrap();
        let marker = fx.store.rotate_auth_uuid(user.id, &user.name).await.unwrap();
        let token = fx
            .issuer
            .issue_at(user.id, &user.name, &marker, issued_at)
            .unwrap();
        (user, token)
    }

    fn tamper_signature(token: &SessionToken) -> String {
        let (head, signature) = token.as_str().rsplit_once('.').unwrap();
        let mut chars: Vec<char> = signature.chars().collect();
        chars[0] = if chars[0] == 'A' { 'B' } else { 'A' };
        format!("{}.{}", head, chars.into_iter().collect::<String>())
    }

    #[tokio::test]
    async fn test_no_token_is_anonymous() {
        let fx = setup().await;
        let session = fx.validator.validate(None).await.unwrap();
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_valid_token_returns_user() {
        let fx = setup().await;
        let (user, token) = logged_in_user(&fx, 1, unix_now()).await;

        let session = fx.validator.validate(Some(token.as_str())).await.unwrap();

        let authenticated = session.user().expect("should be authenticated");
        assert_eq!(authenticated.id(), user.id);
        assert_eq!(authenticated.name(), "user-1");
    }

    #[tokio::test]
    async fn test_tampered_signature_is_malformed() {
        let fx = setup().await;
        let (_, token) = logged_in_user(&fx, 1, unix_now()).await;

        let result = fx.validator.validate(Some(&tamper_signature(&token))).await;
        assert!(matches!(result, Err(AuthError::Malformed)));
    }

    #[tokio::test]
    async fn test_foreign_secret_is_malformed_regardless_of_payload() {
        let fx = setup().await;
        let (user, _) = logged_in_user(&fx, 1, unix_now()).await;
        let stored = fx.store.get_user_by_id(user.id).await.unwrap().unwrap();

        // Claims are otherwise perfect: right user, current marker, future expiry
        let claims = SessionClaims {
            user_id: user.id,
            user_name: user.name.clone(),
            auth_uuid: AuthUuid::new(stored.auth_uuid.unwrap()),
            exp: unix_now() + 3600,
        };
        let forged = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(b"someone-else"),
        )
        .unwrap();

        let result = fx.validator.validate(Some(&forged)).await;
        assert!(matches!(result, Err(AuthError::Malformed)));
    }

    #[tokio::test]
    async fn test_wrong_algorithm_is_malformed() {
        let fx = setup().await;
        let claims = SessionClaims {
            user_id: 1,
            user_name: "x".to_string(),
            auth_uuid: AuthUuid::generate(),
            exp: unix_now() + 3600,
        };
        let hs256 = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        let result = fx.validator.validate(Some(&hs256)).await;
        assert!(matches!(result, Err(AuthError::Malformed)));
    }

    #[tokio::test]
    async fn test_garbage_and_empty_tokens_are_malformed() {
        let fx = setup().await;
        for raw in ["", "not-a-token", "a.b.c"] {
            let result = fx.validator.validate(Some(raw)).await;
            assert!(matches!(result, Err(AuthError::Malformed)), "token {:?}", raw);
        }
    }

    #[tokio::test]
    async fn test_missing_claims_are_malformed() {
        let fx = setup().await;
        let partial = encode(
            &Header::new(Algorithm::HS512),
            &serde_json::json!({"user_id": 1, "exp": unix_now() + 3600}),
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        let result = fx.validator.validate(Some(&partial)).await;
        assert!(matches!(result, Err(AuthError::Malformed)));
    }

    #[tokio::test]
    async fn test_expiry_window_is_exactly_one_day() {
        let fx = setup().await;
        let issued_at = unix_now();
        let (_, token) = logged_in_user(&fx, 1, issued_at).await;

        let inside = fx
            .validator
            .validate_at(Some(token.as_str()), issued_at + 86400 - 1)
            .await
            .unwrap();
        assert!(inside.is_authenticated());

        let after = fx
            .validator
            .validate_at(Some(token.as_str()), issued_at + 86400 + 1)
            .await;
        assert!(matches!(after, Err(AuthError::Expired)));
    }

    #[tokio::test]
    async fn test_expired_takes_precedence_over_revoked() {
        let fx = setup().await;
        let issued_at = unix_now();
        let (user, token) = logged_in_user(&fx, 1, issued_at).await;
        fx.store.rotate_auth_uuid(user.id, &user.name).await.unwrap();

        let result = fx
            .validator
            .validate_at(Some(token.as_str()), issued_at + 86400 + 1)
            .await;
        assert!(matches!(result, Err(AuthError::Expired)));
    }

    #[tokio::test]
    async fn test_second_login_revokes_first_token() {
        let fx = setup().await;
        let (user, first) = logged_in_user(&fx, 1, unix_now()).await;

        let marker = fx.store.rotate_auth_uuid(user.id, &user.name).await.unwrap();
        let second = fx.issuer.issue(user.id, &user.name, &marker).unwrap();

        let result = fx.validator.validate(Some(first.as_str())).await;
        assert!(matches!(result, Err(AuthError::Revoked)));

        let session = fx.validator.validate(Some(second.as_str())).await.unwrap();
        assert!(session.is_authenticated());
    }

    #[tokio::test]
    async fn test_disabled_user_is_not_authenticated() {
        let fx = setup().await;
        let (user, token) = logged_in_user(&fx, 1, unix_now()).await;

        fx.store.disable_user(user.id).await.unwrap();

        let session = fx.validator.validate(Some(token.as_str())).await.unwrap();
        assert!(!session.is_authenticated());

        // Re-enabling restores the same, unrevoked token
        fx.store.enable_user(user.id).await.unwrap();
        let session = fx.validator.validate(Some(token.as_str())).await.unwrap();
        assert!(session.is_authenticated());
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_authenticated() {
        let fx = setup().await;
        let token = fx
            .issuer
            .issue(404, "nobody", &AuthUuid::generate())
            .unwrap();

        let session = fx.validator.validate(Some(token.as_str())).await.unwrap();
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_auth_error_display() {
        assert_eq!(
            AuthError::Malformed.to_string(),
            "Failed to decode JWT! Please provide correct JWT!"
        );
        assert_eq!(
            AuthError::Expired.to_string(),
            "Your sign-in state has been expired! Please sign-in again!"
        );
        assert_eq!(
            AuthError::Revoked.to_string(),
            "Your sign-in state has been invalidated! Please sign-in again!"
        );
    }
}
