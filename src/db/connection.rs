use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use surrealdb::Surreal;
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::Root;
use tracing::debug;

pub type Db = Surreal<Any>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: env::var("SURREALDB_URL").unwrap_or_else(|_| "memory".to_string()),
            namespace: env::var("SURREALDB_NAMESPACE").unwrap_or_else(|_| "catalog".to_string()),
            database: env::var("SURREALDB_DATABASE").unwrap_or_else(|_| "auth".to_string()),
            username: env::var("SURREALDB_USERNAME").ok(),
            password: env::var("SURREALDB_PASSWORD").ok(),
        }
    }
}

impl DatabaseConfig {
    /// Fresh in-memory database, used by tests and the default server mode.
    pub fn memory() -> Self {
        Self {
            url: "memory".to_string(),
            namespace: "catalog".to_string(),
            database: "auth".to_string(),
            username: None,
            password: None,
        }
    }
}

pub async fn create_connection(config: DatabaseConfig) -> Result<Db> {
    let db = surrealdb::engine::any::connect(config.url).await?;

    if let (Some(username), Some(password)) = (config.username, config.password) {
        db.signin(Root {
            username: &username,
            password: &password,
        })
        .await?;
    }

    db.use_ns(config.namespace).use_db(config.database).await?;

    Ok(db)
}

/// Define the tables and indexes the auth stores rely on.
///
/// Safe to run on every start: every statement is `IF NOT EXISTS`.
pub async fn ensure_schema(db: &Db) -> Result<()> {
    let schema_queries = [
        // Users are seeded, never created through the HTTP surface
        "DEFINE TABLE IF NOT EXISTS user SCHEMALESS;
         DEFINE INDEX IF NOT EXISTS user_email ON TABLE user COLUMNS email UNIQUE;",
        // Refresh tokens: token value is unique across all users
        "DEFINE TABLE IF NOT EXISTS refresh_token SCHEMALESS;
         DEFINE INDEX IF NOT EXISTS refresh_token_token ON TABLE refresh_token COLUMNS token UNIQUE;
         DEFINE INDEX IF NOT EXISTS refresh_token_user ON TABLE refresh_token COLUMNS user_id;
         DEFINE INDEX IF NOT EXISTS refresh_token_expires ON TABLE refresh_token COLUMNS expires_at;",
    ];

    for query in schema_queries {
        db.query(query).await?.check()?;
    }

    debug!("auth schema ensured");
    Ok(())
}
