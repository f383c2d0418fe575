//! Persistent refresh-token records.
//!
//! Records are only ever revoked, never deleted (except together with their
//! owning user, see `UserStore::delete_user`).

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::db::Db;
use crate::db::schema::RefreshTokenRecord;
use crate::types::{RefreshTokenId, UserId};

const TOKEN_FIELDS: &str =
    "record::id(id) AS id, token, user_id, expires_at, created_at, revoked_at";

/// Thrown inside the rotation transaction when the consumed record was
/// already revoked.
const ALREADY_CONSUMED: &str = "refresh token already consumed";

/// Projection returned by bulk revocations.
#[derive(Deserialize)]
struct RevokedRow {
    id: RefreshTokenId,
}

/// Refresh token store for database operations.
#[derive(Clone)]
pub struct RefreshTokenStore {
    db: Db,
}

impl RefreshTokenStore {
    /// Create a new refresh token store.
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Persist a newly issued refresh token as an active record.
    pub async fn insert(
        &self,
        token: &str,
        user_id: &UserId,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshTokenRecord> {
        let record = new_record(token, user_id, expires_at);

        let query = r#"
            CREATE type::thing('refresh_token', $id) CONTENT {
                token: $value,
                user_id: $user_id,
                expires_at: $expires_at,
                created_at: $created_at
            }
        "#;

        self.db
            .query(query)
            .bind(("id", record.id.to_string()))
            .bind(("value", record.token.clone()))
            .bind(("user_id", record.user_id.to_string()))
            .bind(("expires_at", record.expires_at))
            .bind(("created_at", record.created_at))
            .await?
            .check()?;

        Ok(record)
    }

    /// Look up a token owned by `user_id` that is neither expired nor revoked.
    pub async fn find_active(
        &self,
        token: &str,
        user_id: &UserId,
    ) -> Result<Option<RefreshTokenRecord>> {
        let query = format!(
            "SELECT {TOKEN_FIELDS} FROM refresh_token \
             WHERE token = $value AND user_id = $user_id LIMIT 1"
        );

        let mut res = self
            .db
            .query(&query)
            .bind(("value", token.to_string()))
            .bind(("user_id", user_id.to_string()))
            .await?;

        let records: Vec<RefreshTokenRecord> = res.take(0)?;
        let now = Utc::now();

        Ok(records.into_iter().find(|r| r.is_active_at(now)))
    }

    /// Look up a token by value regardless of its state.
    ///
    /// Not used by the session flows; kept for operators inspecting a token.
    pub async fn find_by_token(&self, token: &str) -> Result<Option<RefreshTokenRecord>> {
        let query = format!("SELECT {TOKEN_FIELDS} FROM refresh_token WHERE token = $value LIMIT 1");

        let mut res = self
            .db
            .query(&query)
            .bind(("value", token.to_string()))
            .await?;

        let records: Vec<RefreshTokenRecord> = res.take(0)?;
        Ok(records.into_iter().next())
    }

    /// All records owned by a user, newest first, for inspecting sessions.
    pub async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<RefreshTokenRecord>> {
        let query = format!(
            "SELECT {TOKEN_FIELDS} FROM refresh_token \
             WHERE user_id = $user_id ORDER BY created_at DESC"
        );

        let mut res = self
            .db
            .query(&query)
            .bind(("user_id", user_id.to_string()))
            .await?;

        let records: Vec<RefreshTokenRecord> = res.take(0)?;
        Ok(records)
    }

    /// Mark a record revoked by id. Revoking twice only moves the timestamp.
    ///
    /// Session flows revoke by token value or by owner; this is the
    /// administrative path for a record found through [`Self::list_for_user`].
    pub async fn revoke(&self, token_id: &RefreshTokenId) -> Result<()> {
        let query = "UPDATE type::thing('refresh_token', $id) SET revoked_at = $now";

        self.db
            .query(query)
            .bind(("id", token_id.to_string()))
            .bind(("now", Utc::now()))
            .await?
            .check()?;

        debug!(token_id = %token_id, "refresh token revoked");
        Ok(())
    }

    /// Revoke the record holding `token`. Returns `false` if no such record exists.
    pub async fn revoke_by_token(&self, token: &str) -> Result<bool> {
        let query = r#"
            UPDATE refresh_token SET revoked_at = $now
            WHERE token = $value
            RETURN record::id(id) AS id
        "#;

        let mut res = self
            .db
            .query(query)
            .bind(("value", token.to_string()))
            .bind(("now", Utc::now()))
            .await?;

        let updated: Vec<RevokedRow> = res.take(0)?;
        for row in &updated {
            debug!(token_id = %row.id, "refresh token revoked");
        }
        Ok(!updated.is_empty())
    }

    /// Revoke every not-yet-revoked record of a user; returns how many changed.
    pub async fn revoke_all_for_user(&self, user_id: &UserId) -> Result<usize> {
        let query = r#"
            UPDATE refresh_token SET revoked_at = $now
            WHERE user_id = $user_id AND revoked_at = NONE
            RETURN record::id(id) AS id
        "#;

        let mut res = self
            .db
            .query(query)
            .bind(("user_id", user_id.to_string()))
            .bind(("now", Utc::now()))
            .await?;

        let updated: Vec<RevokedRow> = res.take(0)?;
        for row in &updated {
            debug!(token_id = %row.id, user_id = %user_id, "refresh token revoked");
        }
        Ok(updated.len())
    }

    /// Revoke a consumed record and persist its replacement in one transaction.
    ///
    /// The consumed record is only revoked if it is still unrevoked. When
    /// another rotation or a logout got there first the transaction is
    /// cancelled, nothing is written, and `Ok(None)` is returned.
    pub async fn rotate(
        &self,
        consumed: &RefreshTokenId,
        token: &str,
        user_id: &UserId,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<RefreshTokenRecord>> {
        let record = new_record(token, user_id, expires_at);

        let query = format!(
            r#"
            BEGIN TRANSACTION;
            LET $consumed_rows = (
                UPDATE type::thing('refresh_token', $consumed) SET revoked_at = $now
                WHERE revoked_at = NONE
                RETURN record::id(id) AS id
            );
            IF array::len($consumed_rows) = 0 {{
                THROW "{ALREADY_CONSUMED}";
            }};
            CREATE type::thing('refresh_token', $id) CONTENT {{
                token: $value,
                user_id: $user_id,
                expires_at: $expires_at,
                created_at: $now
            }};
            COMMIT TRANSACTION;
        "#
        );

        let mut res = self
            .db
            .query(&query)
            .bind(("consumed", consumed.to_string()))
            .bind(("id", record.id.to_string()))
            .bind(("value", record.token.clone()))
            .bind(("user_id", record.user_id.to_string()))
            .bind(("expires_at", record.expires_at))
            .bind(("now", record.created_at))
            .await?;

        let errors = res.take_errors();
        if errors
            .values()
            .any(|e| e.to_string().contains(ALREADY_CONSUMED))
        {
            debug!(consumed = %consumed, "refresh token already consumed, rotation cancelled");
            return Ok(None);
        }
        if let Some(err) = errors.into_values().next() {
            return Err(err.into());
        }

        debug!(consumed = %consumed, replacement = %record.id, "refresh token rotated");
        Ok(Some(record))
    }
}

fn new_record(token: &str, user_id: &UserId, expires_at: DateTime<Utc>) -> RefreshTokenRecord {
    RefreshTokenRecord {
        id: RefreshTokenId::generate(),
        token: token.to_string(),
        user_id: user_id.clone(),
        expires_at,
        created_at: Utc::now(),
        revoked_at: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DatabaseConfig, create_connection, ensure_schema};
    use chrono::Duration;

    async fn setup_store() -> RefreshTokenStore {
        let db = create_connection(DatabaseConfig::memory()).await.unwrap();
        ensure_schema(&db).await.unwrap();
        RefreshTokenStore::new(db)
    }

    fn in_days(days: i64) -> DateTime<Utc> {
        Utc::now() + Duration::days(days)
    }

    #[tokio::test]
    async fn test_insert_then_find_active() {
        let store = setup_store().await;
        let user = UserId::generate();

        let inserted = store.insert("tok-1", &user, in_days(7)).await.unwrap();
        let found = store.find_active("tok-1", &user).await.unwrap().unwrap();

        assert_eq!(found.id, inserted.id);
        assert_eq!(found.user_id, user);
        assert!(found.revoked_at.is_none());
    }

    #[tokio::test]
    async fn test_find_active_requires_matching_user() {
        let store = setup_store().await;
        let owner = UserId::generate();
        let other = UserId::generate();

        store.insert("tok-1", &owner, in_days(7)).await.unwrap();

        assert!(store.find_active("tok-1", &other).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_token_not_active() {
        let store = setup_store().await;
        let user = UserId::generate();

        store.insert("old", &user, in_days(-1)).await.unwrap();

        assert!(store.find_active("old", &user).await.unwrap().is_none());
        assert!(store.find_by_token("old").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_duplicate_token_rejected() {
        let store = setup_store().await;
        let user = UserId::generate();

        store.insert("same", &user, in_days(7)).await.unwrap();
        assert!(store.insert("same", &user, in_days(7)).await.is_err());
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let store = setup_store().await;
        let user = UserId::generate();
        let rec = store.insert("tok", &user, in_days(7)).await.unwrap();

        store.revoke(&rec.id).await.unwrap();
        store.revoke(&rec.id).await.unwrap();

        assert!(store.find_active("tok", &user).await.unwrap().is_none());
        let stored = store.find_by_token("tok").await.unwrap().unwrap();
        assert!(stored.revoked_at.is_some());
    }

    #[tokio::test]
    async fn test_revoke_by_token() {
        let store = setup_store().await;
        let user = UserId::generate();
        store.insert("tok", &user, in_days(7)).await.unwrap();

        assert!(store.revoke_by_token("tok").await.unwrap());
        assert!(store.revoke_by_token("tok").await.unwrap());
        assert!(!store.revoke_by_token("missing").await.unwrap());
        assert!(store.find_active("tok", &user).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_revoke_all_for_user_does_not_touch_others() {
        let store = setup_store().await;
        let alice = UserId::generate();
        let bob = UserId::generate();

        store.insert("a1", &alice, in_days(7)).await.unwrap();
        store.insert("a2", &alice, in_days(7)).await.unwrap();
        store.insert("b1", &bob, in_days(7)).await.unwrap();

        assert_eq!(store.revoke_all_for_user(&alice).await.unwrap(), 2);

        assert!(store.find_active("a1", &alice).await.unwrap().is_none());
        assert!(store.find_active("a2", &alice).await.unwrap().is_none());
        assert!(store.find_active("b1", &bob).await.unwrap().is_some());

        // Already revoked records are not counted again
        assert_eq!(store.revoke_all_for_user(&alice).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_rotate() {
        let store = setup_store().await;
        let user = UserId::generate();
        let old = store.insert("old", &user, in_days(7)).await.unwrap();

        let new = store
            .rotate(&old.id, "new", &user, in_days(7))
            .await
            .unwrap()
            .unwrap();

        assert_ne!(new.id, old.id);
        assert!(store.find_active("old", &user).await.unwrap().is_none());
        assert!(store.find_active("new", &user).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rotate_consumed_record_twice_is_cancelled() {
        let store = setup_store().await;
        let user = UserId::generate();
        let old = store.insert("old", &user, in_days(7)).await.unwrap();

        assert!(
            store
                .rotate(&old.id, "new-1", &user, in_days(7))
                .await
                .unwrap()
                .is_some()
        );
        let second = store.rotate(&old.id, "new-2", &user, in_days(7)).await.unwrap();

        assert!(second.is_none());
        assert!(store.find_active("new-1", &user).await.unwrap().is_some());
        // The cancelled transaction must not have persisted its replacement
        assert!(store.find_by_token("new-2").await.unwrap().is_none());
        assert_eq!(store.list_for_user(&user).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_rotate_after_logout_is_cancelled() {
        let store = setup_store().await;
        let user = UserId::generate();
        let old = store.insert("old", &user, in_days(7)).await.unwrap();

        assert!(store.revoke_by_token("old").await.unwrap());

        let rotated = store.rotate(&old.id, "new", &user, in_days(7)).await.unwrap();
        assert!(rotated.is_none());
        assert!(store.find_by_token("new").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_for_user() {
        let store = setup_store().await;
        let user = UserId::generate();

        store.insert("t1", &user, in_days(7)).await.unwrap();
        store.insert("t2", &user, in_days(7)).await.unwrap();
        store.insert("t3", &UserId::generate(), in_days(7)).await.unwrap();

        let records = store.list_for_user(&user).await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.user_id == user));
    }
}
