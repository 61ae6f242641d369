//! Request-scoped session outcome.

use serde::{Deserialize, Serialize};

use crate::db::schema::UserRecord;

/// The user behind a validated session token.
///
/// Built only by the validator after every check has passed. It is immutable
/// and handed to handlers explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    user: UserRecord,
}

impl AuthenticatedUser {
    pub(crate) fn new(user: UserRecord) -> Self {
        Self { user }
    }

    /// Get the database user ID.
    pub fn id(&self) -> i64 {
        self.user.id
    }

    /// Get the display name.
    pub fn name(&self) -> &str {
        &self.user.name
    }

    /// Get the full user record as loaded during validation.
    pub fn record(&self) -> &UserRecord {
        &self.user
    }

    /// Whether this user created the resource owned by `creator_id`.
    pub fn is_creator_of(&self, creator_id: i64) -> bool {
        self.user.id == creator_id
    }
}

/// Outcome of validating a request's credentials.
///
/// `Anonymous` covers both "no token supplied" and "token names a user that
/// is missing or disabled". Handlers that require a user reject it.
#[derive(Debug, Clone)]
pub enum Session {
    Authenticated(AuthenticatedUser),
    Anonymous,
}

impl Session {
    pub fn user(&self) -> Option<&AuthenticatedUser> {
        match self {
            Self::Authenticated(user) => Some(user),
            Self::Anonymous => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}
