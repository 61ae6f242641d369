//! Social login: provider exchange, user provisioning and token issuance.

use std::fmt;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::auth::providers::{IdentityProviders, Provider, ProviderError, ProviderIdentity};
use crate::auth::token::TokenIssuer;
use crate::auth::user_store::UserStore;
use crate::types::{ProviderAccessToken, SessionToken};

/// Errors from a login attempt.
#[derive(Debug)]
pub enum LoginError {
    /// The identity provider refused the token or could not be reached
    Provider(ProviderError),
    /// The local account exists but has been disabled
    Disabled,
    /// Reading or writing the user row failed
    Database(String),
    /// The session token could not be signed
    Signing(String),
}

impl fmt::Display for LoginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Provider(e) => write!(f, "{}", e),
            Self::Disabled => write!(
                f,
                "This account has been disabled. Please contact system administrator!"
            ),
            Self::Database(msg) => write!(f, "Database error: {}", msg),
            Self::Signing(msg) => write!(f, "Failed to sign session token: {}", msg),
        }
    }
}

impl std::error::Error for LoginError {}

impl From<ProviderError> for LoginError {
    fn from(e: ProviderError) -> Self {
        Self::Provider(e)
    }
}

/// Turns a provider access token into a session token.
pub struct LoginService {
    users: Arc<UserStore>,
    providers: IdentityProviders,
    issuer: TokenIssuer,
}

impl LoginService {
    pub fn new(users: Arc<UserStore>, providers: IdentityProviders, issuer: TokenIssuer) -> Self {
        Self {
            users,
            providers,
            issuer,
        }
    }

    /// Verify the access token with the provider and log the user in.
    pub async fn login(
        &self,
        provider: Provider,
        access_token: &ProviderAccessToken,
    ) -> Result<SessionToken, LoginError> {
        let identity = self.providers.verify(provider, access_token).await?;
        self.login_identity(&identity).await
    }

    /// Log in an identity the provider has already confirmed.
    ///
    /// Rotating the marker invalidates every token issued to this user before.
    pub async fn login_identity(
        &self,
        identity: &ProviderIdentity,
    ) -> Result<SessionToken, LoginError> {
        let user = self
            .users
            .get_or_create_user(identity)
            .await
            .map_err(|e| {
                error!("Failed to load user for {} login: {}", identity.provider, e);
                LoginError::Database(e.to_string())
            })?;

        if !user.enabled {
            warn!("Login refused for disabled user {}", user.id);
            return Err(LoginError::Disabled);
        }

        let auth_uuid = self
            .users
            .rotate_auth_uuid(user.id, &identity.display_name)
            .await
            .map_err(|e| {
                error!("Failed to rotate marker for user {}: {}", user.id, e);
                LoginError::Database(e.to_string())
            })?;

        let token = self
            .issuer
            .issue(user.id, &identity.display_name, &auth_uuid)
            .map_err(|e| LoginError::Signing(e.to_string()))?;

        info!("User {} logged in via {}", user.id, identity.provider);
        Ok(token)
    }
}
