use anyhow::Result;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::env;
use std::str::FromStr;
use tracing::debug;

pub type Db = SqlitePool;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: env::var("GROUPS_DB_URL")
                .unwrap_or_else(|_| "sqlite::memory:".to_string()),
            max_connections: env::var("GROUPS_DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
        }
    }
}

impl DatabaseConfig {
    /// Private in-memory database, mostly for tests and throwaway runs.
    pub fn memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        }
    }

    pub fn is_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }
}

pub async fn create_connection(config: DatabaseConfig) -> Result<Db> {
    let options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(true)
        .foreign_keys(true);

    // Every connection to `:memory:` opens its own empty database, so the
    // pool must hold exactly one connection and never recycle it.
    let pool = if config.is_memory() {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .connect_with(options)
            .await?
    };

    debug!("Connected to database at {}", config.url);
    Ok(pool)
}

pub async fn ensure_schema(db: &Db) -> Result<()> {
    let schema_queries = [
        // Users, keyed by provider identity
        "CREATE TABLE IF NOT EXISTS `users` (
            `id` INTEGER PRIMARY KEY AUTOINCREMENT,
            `name` TEXT NOT NULL,
            `kakao_id` INTEGER UNIQUE,
            `fb_id` INTEGER UNIQUE,
            `enabled` INTEGER NOT NULL DEFAULT 1,
            `auth_uuid` TEXT,
            `created_at` DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        // Groups are soft-deleted through `is_enabled`
        "CREATE TABLE IF NOT EXISTS `groups` (
            `id` INTEGER PRIMARY KEY AUTOINCREMENT,
            `name` TEXT NOT NULL,
            `creator_id` INTEGER NOT NULL REFERENCES `users` (`id`),
            `signup_code` TEXT,
            `is_enabled` INTEGER NOT NULL DEFAULT 1,
            `created_at` DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        // Membership with role (0: member, 1: manager, 2: owner)
        "CREATE TABLE IF NOT EXISTS `members` (
            `group_id` INTEGER NOT NULL REFERENCES `groups` (`id`),
            `user_id` INTEGER NOT NULL REFERENCES `users` (`id`),
            `role` INTEGER NOT NULL DEFAULT 0,
            `created_at` DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (`group_id`, `user_id`)
        )",
        "CREATE INDEX IF NOT EXISTS `members_user_id` ON `members` (`user_id`)",
    ];

    for query in schema_queries {
        sqlx::query(query).execute(db).await?;
    }

    Ok(())
}
