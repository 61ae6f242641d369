//! NewType wrappers for strong typing throughout the service.
//!
//! These types prevent accidental mixing of semantically different strings
//! (e.g., passing a provider access token where a session token is expected).

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Macro to generate a NewType wrapper with standard trait implementations.
macro_rules! newtype_string {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the inner value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner String.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

newtype_string!(
    /// Per-user revocation marker stored in `users.auth_uuid`.
    ///
    /// A fresh marker is written on every successful login. Tokens carry a
    /// snapshot of the marker and stop validating once it changes.
    AuthUuid
);

newtype_string!(
    /// Signed session token handed to clients after login.
    SessionToken
);

newtype_string!(
    /// Access token issued by an external identity provider (Kakao, Facebook).
    ///
    /// Only ever forwarded to the provider's profile endpoint; never stored.
    ProviderAccessToken
);

impl AuthUuid {
    /// Generate a new random marker (UUID v4).
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_uuid_generate_is_unique() {
        let a = AuthUuid::generate();
        let b = AuthUuid::generate();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(a.as_str()).is_ok());
    }

    #[test]
    fn test_session_token_from_string() {
        let token: SessionToken = "abc.def.ghi".into();
        assert_eq!(token.as_str(), "abc.def.ghi");
        assert_eq!(token.to_string(), "abc.def.ghi");

        let token: SessionToken = String::from("x.y.z").into();
        assert_eq!(token.into_inner(), "x.y.z");
    }

    #[test]
    fn test_newtype_serde_is_transparent() {
        let marker = AuthUuid::new("2f1c0f7e-6a0c-4d51-9d38-4f1b3f0b9a11");
        let json = serde_json::to_string(&marker).unwrap();
        assert_eq!(json, "\"2f1c0f7e-6a0c-4d51-9d38-4f1b3f0b9a11\"");

        let parsed: AuthUuid = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, marker);
    }

    #[test]
    fn test_as_ref() {
        let token = ProviderAccessToken::new("kakao-token");
        let s: &str = token.as_ref();
        assert_eq!(s, "kakao-token");
    }
}
