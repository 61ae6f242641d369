//! User storage and management.

use anyhow::Result;

use crate::auth::providers::{Provider, ProviderIdentity};
use crate::db::Db;
use crate::db::schema::{UserCreate, UserRecord};
use crate::types::AuthUuid;

const USER_COLUMNS: &str =
    "`id`, `name`, `kakao_id`, `fb_id`, `enabled`, `auth_uuid`, `created_at`";

fn provider_column(provider: Provider) -> &'static str {
    match provider {
        Provider::Kakao => "kakao_id",
        Provider::Facebook => "fb_id",
    }
}

/// User store for database operations.
pub struct UserStore {
    db: Db,
}

impl UserStore {
    /// Create a new user store.
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Get or create a user by provider identity.
    ///
    /// New users are created enabled, named after the provider profile. The
    /// `enabled` flag of an existing user is returned untouched; the caller
    /// decides what a disabled account means. Concurrent first logins of the
    /// same identity resolve to a single row.
    pub async fn get_or_create_user(&self, identity: &ProviderIdentity) -> Result<UserRecord> {
        if let Some(user) = self.get_user_by_provider(identity).await? {
            return Ok(user);
        }

        let (kakao_id, fb_id) = match identity.provider {
            Provider::Kakao => (Some(identity.provider_user_id), None),
            Provider::Facebook => (None, Some(identity.provider_user_id)),
        };

        let create = UserCreate {
            name: identity.display_name.clone(),
            kakao_id,
            fb_id,
        };

        self.create_user(&create, provider_column(identity.provider))
            .await?;

        self.get_user_by_provider(identity)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to create user"))
    }

    /// Get a user by provider-specific numeric key.
    pub async fn get_user_by_provider(
        &self,
        identity: &ProviderIdentity,
    ) -> Result<Option<UserRecord>> {
        let query = format!(
            "SELECT {} FROM `users` WHERE `{}` = ? LIMIT 1",
            USER_COLUMNS,
            provider_column(identity.provider)
        );

        let user = sqlx::query_as::<_, UserRecord>(&query)
            .bind(identity.provider_user_id)
            .fetch_optional(&self.db)
            .await?;

        Ok(user)
    }

    /// Get a user by database ID regardless of the `enabled` flag.
    pub async fn get_user_by_id(&self, user_id: i64) -> Result<Option<UserRecord>> {
        let query = format!("SELECT {} FROM `users` WHERE `id` = ? LIMIT 1", USER_COLUMNS);

        let user = sqlx::query_as::<_, UserRecord>(&query)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;

        Ok(user)
    }

    /// Get a user by database ID, skipping disabled accounts.
    pub async fn get_enabled_user_by_id(&self, user_id: i64) -> Result<Option<UserRecord>> {
        let query = format!(
            "SELECT {} FROM `users` WHERE `id` = ? AND `enabled` = 1 LIMIT 1",
            USER_COLUMNS
        );

        let user = sqlx::query_as::<_, UserRecord>(&query)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;

        Ok(user)
    }

    /// Insert a user unless one already holds the same provider key.
    async fn create_user(&self, create: &UserCreate, column: &str) -> Result<()> {
        let query = format!(
            "INSERT INTO `users` (`name`, `kakao_id`, `fb_id`) VALUES (?, ?, ?) \
             ON CONFLICT (`{}`) DO NOTHING",
            column
        );

        sqlx::query(&query)
            .bind(&create.name)
            .bind(create.kakao_id)
            .bind(create.fb_id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    /// Replace the user's revocation marker and refresh the display name.
    ///
    /// Every token issued before this call stops validating. Returns the
    /// freshly generated marker.
    pub async fn rotate_auth_uuid(&self, user_id: i64, name: &str) -> Result<AuthUuid> {
        let auth_uuid = AuthUuid::generate();

        let result = sqlx::query("UPDATE `users` SET `auth_uuid` = ?, `name` = ? WHERE `id` = ?")
            .bind(auth_uuid.as_str())
            .bind(name)
            .bind(user_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(anyhow::anyhow!("User {} not found", user_id));
        }

        Ok(auth_uuid)
    }

    /// Deactivate a user account. Returns false when no such user exists.
    pub async fn disable_user(&self, user_id: i64) -> Result<bool> {
        self.set_enabled(user_id, false).await
    }

    /// Reactivate a user account. Returns false when no such user exists.
    pub async fn enable_user(&self, user_id: i64) -> Result<bool> {
        self.set_enabled(user_id, true).await
    }

    async fn set_enabled(&self, user_id: i64, enabled: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE `users` SET `enabled` = ? WHERE `id` = ?")
            .bind(enabled)
            .bind(user_id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DatabaseConfig, create_connection, ensure_schema};
    use std::sync::Arc;

    async fn setup_test_db() -> Db {
        let db = create_connection(DatabaseConfig::memory()).await.unwrap();
        ensure_schema(&db).await.unwrap();
        db
    }

    fn kakao(id: i64, name: &str) -> ProviderIdentity {
        ProviderIdentity {
            provider: Provider::Kakao,
            provider_user_id: id,
            display_name: name.to_string(),
        }
    }

    fn facebook(id: i64, name: &str) -> ProviderIdentity {
        ProviderIdentity {
            provider: Provider::Facebook,
            provider_user_id: id,
            display_name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_get_or_create_user_creates_new() {
        let store = UserStore::new(setup_test_db().await);

        let user = store.get_or_create_user(&kakao(1001, "Minji")).await.unwrap();

        assert_eq!(user.name, "Minji");
        assert_eq!(user.kakao_id, Some(1001));
        assert_eq!(user.fb_id, None);
        assert!(user.enabled);
        assert!(user.auth_uuid.is_none());
    }

    #[tokio::test]
    async fn test_get_or_create_user_returns_existing() {
        let store = UserStore::new(setup_test_db().await);

        let user1 = store.get_or_create_user(&kakao(1001, "Minji")).await.unwrap();
        let user2 = store.get_or_create_user(&kakao(1001, "Minji Kim")).await.unwrap();

        assert_eq!(user1.id, user2.id);
        // Name is refreshed by the login flow, not by lookup
        assert_eq!(user2.name, "Minji");
    }

    #[tokio::test]
    async fn test_concurrent_first_logins_share_one_user() {
        let dir = tempfile::tempdir().unwrap();
        let db = create_connection(DatabaseConfig {
            url: format!("sqlite://{}", dir.path().join("users.db").display()),
            max_connections: 4,
        })
        .await
        .unwrap();
        ensure_schema(&db).await.unwrap();
        let store = Arc::new(UserStore::new(db));

        for round in 0..25 {
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    let store = store.clone();
                    tokio::spawn(async move {
                        store.get_or_create_user(&kakao(5000 + round, "Racer")).await
                    })
                })
                .collect();

            let mut ids = Vec::new();
            for handle in handles {
                ids.push(handle.await.unwrap().unwrap().id);
            }
            assert_eq!(ids[0], ids[1], "round {}", round);
        }

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM `users`")
            .fetch_one(&store.db)
            .await
            .unwrap();
        assert_eq!(count, 25);
    }

    #[tokio::test]
    async fn test_same_numeric_id_different_providers() {
        let store = UserStore::new(setup_test_db().await);

        let via_kakao = store.get_or_create_user(&kakao(77, "K")).await.unwrap();
        let via_facebook = store.get_or_create_user(&facebook(77, "F")).await.unwrap();

        assert_ne!(via_kakao.id, via_facebook.id);
        assert_eq!(via_facebook.fb_id, Some(77));
    }

    #[tokio::test]
    async fn test_rotate_auth_uuid_replaces_marker_and_name() {
        let store = UserStore::new(setup_test_db().await);
        let user = store.get_or_create_user(&facebook(5, "Old Name")).await.unwrap();

        let first = store.rotate_auth_uuid(user.id, "New Name").await.unwrap();
        let second = store.rotate_auth_uuid(user.id, "New Name").await.unwrap();
        assert_ne!(first, second);

        let stored = store.get_user_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.auth_uuid.as_deref(), Some(second.as_str()));
        assert_eq!(stored.name, "New Name");
    }

    #[tokio::test]
    async fn test_rotate_auth_uuid_unknown_user() {
        let store = UserStore::new(setup_test_db().await);
        assert!(store.rotate_auth_uuid(999, "ghost").await.is_err());
    }

    #[tokio::test]
    async fn test_user_deactivation() {
        let store = UserStore::new(setup_test_db().await);
        let user = store.get_or_create_user(&kakao(3, "Jun")).await.unwrap();

        assert!(store.disable_user(user.id).await.unwrap());
        let updated = store.get_user_by_id(user.id).await.unwrap().unwrap();
        assert!(!updated.enabled);
        assert!(store.get_enabled_user_by_id(user.id).await.unwrap().is_none());

        assert!(store.enable_user(user.id).await.unwrap());
        assert!(store.get_enabled_user_by_id(user.id).await.unwrap().is_some());

        assert!(!store.disable_user(12345).await.unwrap());
    }
}
