//! External identity providers (Kakao, Facebook).
//!
//! Each provider exposes a profile endpoint that, given the access token the
//! client obtained through the provider's own OAuth flow, returns a numeric
//! account id and a display name. Nothing here is retried: a provider refusal
//! is handed back to the caller with the provider's status code.

use std::fmt;
use std::time::Duration;

use http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};
use url::Url;

use crate::config::ProviderConfig;
use crate::types::ProviderAccessToken;

/// Supported identity providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Kakao,
    Facebook,
}

impl Provider {
    /// Parse the `type` query value of the login endpoint.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "kakao" => Some(Self::Kakao),
            "facebook" => Some(Self::Facebook),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kakao => "kakao",
            Self::Facebook => "facebook",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A profile confirmed by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderIdentity {
    pub provider: Provider,
    /// Provider-specific numeric account id
    pub provider_user_id: i64,
    pub display_name: String,
}

/// Errors from a provider profile lookup.
#[derive(Debug, Clone)]
pub enum ProviderError {
    /// The provider answered with a non-success status.
    ///
    /// `body` is what the client should see, already in the shape the
    /// provider-specific login response uses.
    Rejected { status: StatusCode, body: Value },
    /// The provider could not be reached
    Transport(String),
    /// The provider answered 2xx with a body we cannot use
    InvalidResponse(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected { status, body } => {
                write!(f, "Provider rejected the access token ({}): {}", status, body)
            }
            Self::Transport(msg) => write!(f, "Provider unreachable: {}", msg),
            Self::InvalidResponse(msg) => write!(f, "Invalid provider response: {}", msg),
        }
    }
}

impl std::error::Error for ProviderError {}

#[derive(Debug, Deserialize)]
struct KakaoProfile {
    id: i64,
    #[serde(default)]
    properties: Option<KakaoProperties>,
}

#[derive(Debug, Deserialize)]
struct KakaoProperties {
    nickname: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FacebookProfile {
    id: String,
    name: String,
}

/// HTTP client for the provider profile endpoints.
pub struct IdentityProviders {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl IdentityProviders {
    pub fn new(config: ProviderConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { config, client })
    }

    /// Exchange a provider access token for the provider's profile.
    pub async fn verify(
        &self,
        provider: Provider,
        access_token: &ProviderAccessToken,
    ) -> Result<ProviderIdentity, ProviderError> {
        match provider {
            Provider::Kakao => self.fetch_kakao(access_token).await,
            Provider::Facebook => self.fetch_facebook(access_token).await,
        }
    }

    async fn fetch_kakao(
        &self,
        access_token: &ProviderAccessToken,
    ) -> Result<ProviderIdentity, ProviderError> {
        debug!("Fetching Kakao profile from {}", self.config.kakao_profile_url);

        let request = self
            .client
            .get(&self.config.kakao_profile_url)
            .bearer_auth(access_token.as_str());
        let (status, body) = send(request).await?;

        if !status.is_success() {
            // Kakao errors look like {"msg": "...", "code": -401}
            let message = body
                .get("msg")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| fallback_message(status));
            warn!("Kakao rejected access token: {} {}", status, message);
            return Err(ProviderError::Rejected {
                status,
                body: json!({ "message": message }),
            });
        }

        let profile: KakaoProfile = serde_json::from_value(body)
            .map_err(|e| ProviderError::InvalidResponse(format!("Kakao profile: {}", e)))?;
        let nickname = profile
            .properties
            .and_then(|p| p.nickname)
            .ok_or_else(|| {
                ProviderError::InvalidResponse("Kakao profile has no nickname".to_string())
            })?;

        Ok(ProviderIdentity {
            provider: Provider::Kakao,
            provider_user_id: profile.id,
            display_name: nickname,
        })
    }

    async fn fetch_facebook(
        &self,
        access_token: &ProviderAccessToken,
    ) -> Result<ProviderIdentity, ProviderError> {
        let url = Url::parse_with_params(
            &self.config.facebook_profile_url,
            &[("access_token", access_token.as_str()), ("fields", "id,name")],
        )
        .map_err(|e| ProviderError::Transport(format!("Invalid Facebook URL: {}", e)))?;

        debug!(
            "Fetching Facebook profile from {}",
            self.config.facebook_profile_url
        );

        let (status, body) = send(self.client.get(url)).await?;

        if !status.is_success() {
            // Graph API errors are {"error": {...}}; the inner object goes back as-is
            let error = match body.get("error") {
                Some(error) => error.clone(),
                None => json!({ "message": fallback_message(status) }),
            };
            warn!("Facebook rejected access token: {} {}", status, error);
            return Err(ProviderError::Rejected {
                status,
                body: error,
            });
        }

        let profile: FacebookProfile = serde_json::from_value(body)
            .map_err(|e| ProviderError::InvalidResponse(format!("Facebook profile: {}", e)))?;
        let provider_user_id = profile.id.parse::<i64>().map_err(|_| {
            ProviderError::InvalidResponse(format!("Facebook id `{}` is not numeric", profile.id))
        })?;

        Ok(ProviderIdentity {
            provider: Provider::Facebook,
            provider_user_id,
            display_name: profile.name,
        })
    }
}

/// Send a request and read the body as JSON.
///
/// Non-JSON bodies become `Value::Null` so that error statuses still
/// propagate; a success status with such a body fails later on parsing.
async fn send(request: reqwest::RequestBuilder) -> Result<(StatusCode, Value), ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|e| ProviderError::Transport(e.to_string()))?;

    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|e| ProviderError::Transport(e.to_string()))?;

    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    Ok((status, body))
}

fn fallback_message(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("Identity provider error")
        .to_string()
}
