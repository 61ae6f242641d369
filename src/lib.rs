// Core modules
pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod types;

// Re-export key types and functions
pub use api::{AppState, create_router};
pub use auth::{
    AuthError, AuthenticatedUser, IdentityProviders, LoginService, Session, SessionValidator,
    TokenIssuer, UserStore,
};
pub use config::{AuthConfig, ProviderConfig};
pub use db::{DatabaseConfig, QueryBuilder, create_connection, ensure_schema};

use anyhow::Result;
use std::sync::Arc;

/// Convenience function to build the shared application state.
///
/// Opens the database, makes sure the schema exists, and wires the validator
/// and login service to the same user store and signing secret.
pub async fn create_state(
    db_config: DatabaseConfig,
    auth_config: AuthConfig,
    provider_config: ProviderConfig,
) -> Result<AppState> {
    auth_config.validate()?;
    provider_config.validate()?;

    let db = create_connection(db_config).await?;
    ensure_schema(&db).await?;

    let users = Arc::new(UserStore::new(db.clone()));
    let providers = IdentityProviders::new(provider_config)?;

    let validator = SessionValidator::new(&auth_config, users.clone());
    let login = LoginService::new(users, providers, TokenIssuer::new(&auth_config));

    Ok(AppState {
        db,
        validator: Arc::new(validator),
        login: Arc::new(login),
    })
}
