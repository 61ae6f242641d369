use chrono::{NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize, Serializer};

/// Persisted user record.
///
/// One row per provider identity. `auth_uuid` is the revocation marker that
/// every issued session token must match.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRecord {
    /// Database identifier
    pub id: i64,
    /// Display name, refreshed from the provider on every login
    pub name: String,
    /// Kakao account id, when the user signed in with Kakao
    pub kakao_id: Option<i64>,
    /// Facebook account id, when the user signed in with Facebook
    pub fb_id: Option<i64>,
    /// Disabled users cannot log in and their tokens stop validating
    pub enabled: bool,
    /// Current revocation marker; `None` until the first login completes
    pub auth_uuid: Option<String>,
    /// When the user was first seen
    #[serde(serialize_with = "serialize_utc")]
    pub created_at: NaiveDateTime,
}

/// Payload for creating a new user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCreate {
    pub name: String,
    pub kakao_id: Option<i64>,
    pub fb_id: Option<i64>,
}

/// Persisted group record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GroupRecord {
    pub id: i64,
    pub name: String,
    pub creator_id: i64,
    /// Code new members must present; `None` closes the group to signups
    pub signup_code: Option<String>,
    pub is_enabled: bool,
    #[serde(serialize_with = "serialize_utc")]
    pub created_at: NaiveDateTime,
}

/// Payload for creating a new group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupCreate {
    pub name: String,
    pub creator_id: i64,
}

/// One row of a user's group listing: the group joined with the caller's role.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GroupListingRow {
    pub id: i64,
    pub name: String,
    pub creator_id: i64,
    pub role: i64,
    pub signup_code: Option<String>,
    #[serde(serialize_with = "serialize_utc")]
    pub created_at: NaiveDateTime,
}

/// Role of a member inside a group.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    /// Regular member
    Member,
    /// Intermediate manager
    Manager,
    /// Top-level administrator; assigned to the group creator
    Owner,
}

impl MemberRole {
    pub fn as_i64(&self) -> i64 {
        match self {
            Self::Member => 0,
            Self::Manager => 1,
            Self::Owner => 2,
        }
    }
}

/// Timestamps are stored as naive UTC and rendered as RFC 3339 with an
/// explicit `+00:00` offset.
fn serialize_utc<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&Utc.from_utc_datetime(value).to_rfc3339())
}
