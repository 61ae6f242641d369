use serde::{Deserialize, Serialize};
use std::{env, fmt};
use url::Url;

/// Session tokens are valid for 24 hours after issuance.
pub const DEFAULT_TOKEN_TTL_SECONDS: u64 = 86400;

pub const DEFAULT_KAKAO_PROFILE_URL: &str = "https://kapi.kakao.com/v1/user/me";
pub const DEFAULT_FACEBOOK_PROFILE_URL: &str = "https://graph.facebook.com/v2.9/me";

/// Outbound provider calls give up after this many seconds.
pub const DEFAULT_PROVIDER_TIMEOUT_SECONDS: u64 = 10;

/// Signing configuration shared by the token issuer and the validator.
///
/// Loaded once at startup and handed to both sides explicitly.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for HS512 signatures
    pub jwt_secret: String,
    /// Lifetime of an issued token in seconds
    #[serde(default = "default_token_ttl_seconds")]
    pub token_ttl_seconds: u64,
}

fn default_token_ttl_seconds() -> u64 {
    DEFAULT_TOKEN_TTL_SECONDS
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: env::var("GROUPS_JWT_SECRET").unwrap_or_default(),
            token_ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl_seconds", &self.token_ttl_seconds)
            .finish()
    }
}

impl AuthConfig {
    /// Create a config with the given secret and the default 24h lifetime.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: secret.into(),
            token_ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.jwt_secret.trim().is_empty() {
            return Err(anyhow::anyhow!(
                "JWT secret is empty (pass --jwt-secret or set GROUPS_JWT_SECRET)"
            ));
        }
        if self.token_ttl_seconds == 0 {
            return Err(anyhow::anyhow!("token lifetime must be greater than zero"));
        }
        Ok(())
    }
}

/// Profile endpoints of the external identity providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub kakao_profile_url: String,
    pub facebook_profile_url: String,
    #[serde(default = "default_provider_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_provider_timeout_seconds() -> u64 {
    DEFAULT_PROVIDER_TIMEOUT_SECONDS
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kakao_profile_url: env::var("KAKAO_PROFILE_URL")
                .unwrap_or_else(|_| DEFAULT_KAKAO_PROFILE_URL.to_string()),
            facebook_profile_url: env::var("FACEBOOK_PROFILE_URL")
                .unwrap_or_else(|_| DEFAULT_FACEBOOK_PROFILE_URL.to_string()),
            timeout_seconds: DEFAULT_PROVIDER_TIMEOUT_SECONDS,
        }
    }
}

impl ProviderConfig {
    /// Point both providers at a single base URL (`{base}/kakao`, `{base}/facebook`).
    ///
    /// Used to run against a local stand-in for the real endpoints.
    pub fn with_base_url(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            kakao_profile_url: format!("{}/kakao", base),
            facebook_profile_url: format!("{}/facebook", base),
            timeout_seconds: DEFAULT_PROVIDER_TIMEOUT_SECONDS,
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, raw) in [
            ("kakao_profile_url", &self.kakao_profile_url),
            ("facebook_profile_url", &self.facebook_profile_url),
        ] {
            let parsed = Url::parse(raw)
                .map_err(|e| anyhow::anyhow!("`{}` is not a valid URL ({}): {}", name, raw, e))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(anyhow::anyhow!(
                    "`{}` must use http or https, got `{}`",
                    name,
                    parsed.scheme()
                ));
            }
        }
        Ok(())
    }
}
