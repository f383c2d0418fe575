// Core modules
pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod types;

// Re-export key types and functions
pub use api::{AppState, PublicRoutes, create_router};
pub use auth::{SessionService, UserContext};
pub use config::AuthSettings;
pub use db::{DatabaseConfig, create_connection, ensure_schema};

use anyhow::Result;

/// Convenience function to build the HTTP application.
///
/// Connects to the database, ensures the schema, optionally seeds the admin
/// account and returns the gated router.
pub async fn create_app(
    db_config: DatabaseConfig,
    settings: AuthSettings,
    seed_admin: bool,
) -> Result<axum::Router> {
    let db = create_connection(db_config).await?;
    ensure_schema(&db).await?;

    let bcrypt_cost = settings.bcrypt_cost;
    let sessions = SessionService::new(db, settings);

    if seed_admin {
        sessions.user_store().seed_admin(bcrypt_cost).await?;
    }

    let public_routes = PublicRoutes::catalog()?;
    Ok(create_router(AppState::new(sessions, public_routes)))
}
