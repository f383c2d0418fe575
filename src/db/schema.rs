//! Row types for the `user` and `refresh_token` tables.
//!
//! Record keys are selected with `record::id(id) AS id`, so ids arrive here
//! as the plain UUID strings the rest of the crate uses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{RefreshTokenId, UserId};

/// Persisted user row, including the password hash.
///
/// Never serialized into an HTTP response; use [`UserProfile`] for that.
#[derive(Debug, Clone, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub password_hash: String,
}

impl UserRecord {
    /// Public view of this user, without the password hash.
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// Identity fields safe to hand to clients and to embed in access tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

/// Payload for seeding a user.
#[derive(Debug, Clone)]
pub struct UserCreate {
    pub email: String,
    pub name: String,
    pub password_hash: String,
}

/// Lifecycle state of a stored refresh token at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTokenState {
    /// Usable for exactly one refresh.
    Active,
    /// Revoked by logout, rotation or logout-all. Terminal.
    Revoked,
    /// Past `expires_at`. Terminal.
    Expired,
}

/// Persisted refresh token row.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshTokenRecord {
    pub id: RefreshTokenId,
    pub token: String,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshTokenRecord {
    /// Revocation wins over expiry so a revoked token reports as revoked
    /// even after its natural lifetime ends.
    pub fn state_at(&self, now: DateTime<Utc>) -> RefreshTokenState {
        if self.revoked_at.is_some() {
            RefreshTokenState::Revoked
        } else if now >= self.expires_at {
            RefreshTokenState::Expired
        } else {
            RefreshTokenState::Active
        }
    }

    /// `now < expires_at AND revoked_at IS NULL`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.state_at(now) == RefreshTokenState::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(expires_in: Duration, revoked: bool) -> RefreshTokenRecord {
        let now = Utc::now();
        RefreshTokenRecord {
            id: RefreshTokenId::new("rt1"),
            token: "token".to_string(),
            user_id: UserId::new("u1"),
            expires_at: now + expires_in,
            created_at: now,
            revoked_at: revoked.then_some(now),
        }
    }

    #[test]
    fn test_fresh_record_is_active() {
        let rec = record(Duration::days(7), false);
        assert_eq!(rec.state_at(Utc::now()), RefreshTokenState::Active);
        assert!(rec.is_active_at(Utc::now()));
    }

    #[test]
    fn test_expired_record() {
        let rec = record(Duration::seconds(-1), false);
        assert_eq!(rec.state_at(Utc::now()), RefreshTokenState::Expired);
        assert!(!rec.is_active_at(Utc::now()));
    }

    #[test]
    fn test_expiry_boundary_is_exclusive() {
        let rec = record(Duration::days(1), false);
        assert!(!rec.is_active_at(rec.expires_at));
    }

    #[test]
    fn test_revoked_beats_expired() {
        let rec = record(Duration::seconds(-1), true);
        assert_eq!(rec.state_at(Utc::now()), RefreshTokenState::Revoked);
    }

    #[test]
    fn test_profile_omits_password_hash() {
        let user = UserRecord {
            id: UserId::new("u1"),
            email: "admin@example.com".to_string(),
            name: "Admin User".to_string(),
            password_hash: "$2b$10$secret".to_string(),
        };

        let json = serde_json::to_value(user.profile()).unwrap();
        assert_eq!(json["id"], "u1");
        assert_eq!(json["email"], "admin@example.com");
        assert!(json.get("password_hash").is_none());
        assert!(!json.to_string().contains("secret"));
    }
}
