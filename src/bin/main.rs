use anyhow::Result;
use catalog_auth::auth::{DEFAULT_BCRYPT_COST, TokenConfig, hash_password};
use catalog_auth::config::{DEFAULT_ACCESS_EXPIRES_IN, DEFAULT_REFRESH_EXPIRES_IN};
use catalog_auth::{AuthSettings, DatabaseConfig, create_app};
use clap::{Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "catalog-auth")]
#[command(about = "Token-based authentication service for the media catalog")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST server
    Server {
        /// Bind address, e.g. 0.0.0.0:8080
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: String,
        #[arg(long, env = "SURREALDB_URL", default_value = "memory")]
        db_url: String,
        /// Secret for access tokens
        #[arg(long, env = "JWT_ACCESS_SECRET", hide_env_values = true)]
        access_secret: String,
        /// Access token lifetime: <integer><d|h|m|s>
        #[arg(long, env = "JWT_ACCESS_EXPIRES_IN", default_value = DEFAULT_ACCESS_EXPIRES_IN)]
        access_expires_in: String,
        /// Secret for refresh tokens
        #[arg(long, env = "JWT_REFRESH_SECRET", hide_env_values = true)]
        refresh_secret: String,
        /// Refresh token lifetime: <integer><d|h|m|s>
        #[arg(long, env = "JWT_REFRESH_EXPIRES_IN", default_value = DEFAULT_REFRESH_EXPIRES_IN)]
        refresh_expires_in: String,
        #[arg(long, env = "BCRYPT_COST", default_value_t = DEFAULT_BCRYPT_COST)]
        bcrypt_cost: u32,
        /// Create the admin account if it does not exist
        #[arg(long, default_value_t = false)]
        seed: bool,
    },
    /// Print a bcrypt hash of a password, for seeding users by hand
    HashPassword {
        password: String,
        #[arg(long, env = "BCRYPT_COST", default_value_t = DEFAULT_BCRYPT_COST)]
        cost: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("catalog_auth=info".parse()?))
        .with_max_level(Level::INFO)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Server {
            bind,
            db_url,
            access_secret,
            access_expires_in,
            refresh_secret,
            refresh_expires_in,
            bcrypt_cost,
            seed,
        } => {
            let settings = AuthSettings::new(
                TokenConfig::new(access_secret, access_expires_in),
                TokenConfig::new(refresh_secret, refresh_expires_in),
            )
            .with_bcrypt_cost(bcrypt_cost);
            settings.validate()?;

            let db_config = DatabaseConfig {
                url: db_url,
                ..Default::default()
            };
            info!("Using database url: {}", db_config.url);

            let app = create_app(db_config, settings, seed).await?;

            let listener = tokio::net::TcpListener::bind(&bind).await?;
            info!("Auth server listening on http://{}", bind);

            axum::serve(listener, app).await?;
        }
        Commands::HashPassword { password, cost } => {
            let hashed = hash_password(&password, cost).await?;
            println!("{}", hashed);
        }
    }

    Ok(())
}
