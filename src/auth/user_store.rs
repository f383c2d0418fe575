//! User lookups and seeding.

use anyhow::{Result, anyhow};
use chrono::Utc;
use tracing::info;

use crate::auth::password::hash_password;
use crate::db::Db;
use crate::db::schema::{UserCreate, UserRecord};
use crate::types::UserId;

/// Credentials of the administrator created by [`UserStore::seed_admin`].
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin123";
pub const ADMIN_NAME: &str = "Admin User";

const USER_FIELDS: &str = "record::id(id) AS id, email, name, password_hash";

/// User store for database operations.
#[derive(Clone)]
pub struct UserStore {
    db: Db,
}

impl UserStore {
    /// Create a new user store.
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Find a user by email. Emails match exactly, case included.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let query = format!("SELECT {USER_FIELDS} FROM user WHERE email = $email LIMIT 1");

        let mut res = self
            .db
            .query(&query)
            .bind(("email", email.to_string()))
            .await?;

        let users: Vec<UserRecord> = res.take(0)?;
        Ok(users.into_iter().next())
    }

    /// Find a user by id.
    pub async fn find_by_id(&self, user_id: &UserId) -> Result<Option<UserRecord>> {
        let query = format!("SELECT {USER_FIELDS} FROM type::thing('user', $id)");

        let mut res = self
            .db
            .query(&query)
            .bind(("id", user_id.to_string()))
            .await?;

        let users: Vec<UserRecord> = res.take(0)?;
        Ok(users.into_iter().next())
    }

    /// Create a new user. Fails if the email is already taken.
    pub async fn create_user(&self, create: UserCreate) -> Result<UserRecord> {
        let id = UserId::generate();

        let query = r#"
            CREATE type::thing('user', $id) CONTENT {
                email: $email,
                name: $name,
                password_hash: $password_hash,
                created_at: $created_at,
                updated_at: $created_at
            }
        "#;

        self.db
            .query(query)
            .bind(("id", id.to_string()))
            .bind(("email", create.email.clone()))
            .bind(("name", create.name.clone()))
            .bind(("password_hash", create.password_hash.clone()))
            .bind(("created_at", Utc::now()))
            .await?
            .check()?;

        Ok(UserRecord {
            id,
            email: create.email,
            name: create.name,
            password_hash: create.password_hash,
        })
    }

    /// Delete a user together with every refresh token they own.
    pub async fn delete_user(&self, user_id: &UserId) -> Result<()> {
        let query = r#"
            BEGIN TRANSACTION;
            DELETE refresh_token WHERE user_id = $id;
            DELETE type::thing('user', $id);
            COMMIT TRANSACTION;
        "#;

        self.db
            .query(query)
            .bind(("id", user_id.to_string()))
            .await?
            .check()?;

        Ok(())
    }

    /// Create the administrator account unless one already exists.
    ///
    /// Returns the existing or newly created record.
    pub async fn seed_admin(&self, cost: u32) -> Result<UserRecord> {
        if let Some(existing) = self.find_by_email(ADMIN_EMAIL).await? {
            return Ok(existing);
        }

        let password_hash = hash_password(ADMIN_PASSWORD, cost).await?;
        let user = self
            .create_user(UserCreate {
                email: ADMIN_EMAIL.to_string(),
                name: ADMIN_NAME.to_string(),
                password_hash,
            })
            .await
            .map_err(|e| anyhow!("failed to create admin user: {}", e))?;

        info!(user_id = %user.id, "seeded admin user");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::verify_password;
    use crate::db::{DatabaseConfig, create_connection, ensure_schema};

    async fn setup_test_db() -> Db {
        let db = create_connection(DatabaseConfig::memory()).await.unwrap();
        ensure_schema(&db).await.unwrap();
        db
    }

    fn new_user(email: &str) -> UserCreate {
        UserCreate {
            email: email.to_string(),
            name: "Test User".to_string(),
            password_hash: "$2b$04$placeholder".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_find_user() {
        let store = UserStore::new(setup_test_db().await);

        let created = store.create_user(new_user("test@example.com")).await.unwrap();

        let by_email = store.find_by_email("test@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, created.id);
        assert_eq!(by_email.name, "Test User");

        let by_id = store.find_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "test@example.com");
    }

    #[tokio::test]
    async fn test_email_lookup_is_case_sensitive() {
        let store = UserStore::new(setup_test_db().await);
        store.create_user(new_user("test@example.com")).await.unwrap();

        assert!(store.find_by_email("TEST@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_user_is_none() {
        let store = UserStore::new(setup_test_db().await);

        assert!(store.find_by_email("nobody@example.com").await.unwrap().is_none());
        assert!(store.find_by_id(&UserId::generate()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = UserStore::new(setup_test_db().await);
        store.create_user(new_user("dup@example.com")).await.unwrap();

        assert!(store.create_user(new_user("dup@example.com")).await.is_err());
    }

    #[tokio::test]
    async fn test_seed_admin_is_idempotent() {
        let store = UserStore::new(setup_test_db().await);

        let first = store.seed_admin(4).await.unwrap();
        let second = store.seed_admin(4).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.name, ADMIN_NAME);
        assert!(verify_password(ADMIN_PASSWORD, &first.password_hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_user() {
        let store = UserStore::new(setup_test_db().await);
        let user = store.create_user(new_user("gone@example.com")).await.unwrap();

        store.delete_user(&user.id).await.unwrap();

        assert!(store.find_by_id(&user.id).await.unwrap().is_none());
    }
}
