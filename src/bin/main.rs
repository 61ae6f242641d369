use anyhow::Result;
use clap::{Parser, Subcommand};
use groups_api::config::{DEFAULT_FACEBOOK_PROFILE_URL, DEFAULT_KAKAO_PROFILE_URL};
use groups_api::{AuthConfig, DatabaseConfig, ProviderConfig, UserStore, create_state};
use tracing::{Level, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "groups-api")]
#[command(about = "Group membership REST backend with Kakao/Facebook sign-in")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST server
    Serve {
        #[arg(short, long, default_value = "8080")]
        port: u16,
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        #[arg(long, env = "GROUPS_DB_URL", default_value = "sqlite::memory:")]
        db_url: String,
        /// HMAC secret used to sign and verify session tokens
        #[arg(long, env = "GROUPS_JWT_SECRET", hide_env_values = true)]
        jwt_secret: String,
        #[arg(long, env = "KAKAO_PROFILE_URL", default_value = DEFAULT_KAKAO_PROFILE_URL)]
        kakao_profile_url: String,
        #[arg(long, env = "FACEBOOK_PROFILE_URL", default_value = DEFAULT_FACEBOOK_PROFILE_URL)]
        facebook_profile_url: String,
    },
    /// Initialize the database
    Init {
        #[arg(long, env = "GROUPS_DB_URL", default_value = "sqlite::memory:")]
        db_url: String,
    },
    /// Disable a user; their tokens stop validating and they cannot log in
    DisableUser {
        user_id: i64,
        /// Database holding the user; required, an in-memory database is refused
        #[arg(long, env = "GROUPS_DB_URL")]
        db_url: String,
    },
    /// Re-enable a previously disabled user
    EnableUser {
        user_id: i64,
        /// Database holding the user; required, an in-memory database is refused
        #[arg(long, env = "GROUPS_DB_URL")]
        db_url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("groups_api=info".parse()?)
                .add_directive("sqlx=warn".parse()?),
        )
        .with_max_level(Level::INFO)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            port,
            host,
            db_url,
            jwt_secret,
            kakao_profile_url,
            facebook_profile_url,
        } => {
            let db_config = DatabaseConfig {
                url: db_url,
                ..Default::default()
            };
            info!("Using database url for REST server: {}", db_config.url);
            if db_config.is_memory() {
                warn!("In-memory database: all data is lost on shutdown");
            }

            let auth_config = AuthConfig::with_secret(jwt_secret);
            let provider_config = ProviderConfig {
                kakao_profile_url,
                facebook_profile_url,
                ..Default::default()
            };

            let state = create_state(db_config, auth_config, provider_config).await?;
            let app = groups_api::create_router(state);

            let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port)).await?;
            info!("Server listening on http://{}:{}", host, port);

            axum::serve(listener, app).await?;
        }
        Commands::Init { db_url } => {
            let db_config = DatabaseConfig {
                url: db_url,
                ..Default::default()
            };
            info!("Using database url for initialization: {}", db_config.url);

            info!("Initializing database...");
            let db = groups_api::create_connection(db_config).await?;
            groups_api::ensure_schema(&db).await?;
            info!("Database initialized successfully");
        }
        Commands::DisableUser { user_id, db_url } => {
            let store = open_user_store(db_url).await?;

            if store.disable_user(user_id).await? {
                println!("User {} has been disabled.", user_id);
            } else {
                println!("No user found with id {}.", user_id);
            }
        }
        Commands::EnableUser { user_id, db_url } => {
            let store = open_user_store(db_url).await?;

            if store.enable_user(user_id).await? {
                println!("User {} has been enabled.", user_id);
            } else {
                println!("No user found with id {}.", user_id);
            }
        }
    }

    Ok(())
}

async fn open_user_store(db_url: String) -> Result<UserStore> {
    let db_config = DatabaseConfig {
        url: db_url,
        ..Default::default()
    };
    if db_config.is_memory() {
        anyhow::bail!(
            "`{}` is an in-memory database; pass the server's --db-url or set GROUPS_DB_URL",
            db_config.url
        );
    }

    let db = groups_api::create_connection(db_config).await?;
    groups_api::ensure_schema(&db).await?;
    Ok(UserStore::new(db))
}
