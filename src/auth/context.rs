//! User context for request-scoped identity.

use crate::auth::tokens::AccessClaims;
use crate::types::UserId;
use serde::{Deserialize, Serialize};

/// User context extracted from a verified access token.
///
/// The request gate inserts this into the request extensions; handlers read
/// it back through the [`crate::api::CurrentUser`] extractor. It is immutable
/// once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    /// Identifier of the authenticated user
    user_id: UserId,
    /// Email as embedded in the access token
    email: String,
    /// Display name as embedded in the access token
    name: String,
}

impl UserContext {
    /// Create a new user context.
    pub fn new(user_id: UserId, email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            user_id,
            email: email.into(),
            name: name.into(),
        }
    }

    /// Get the user ID.
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Get the email.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Get the display name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl From<AccessClaims> for UserContext {
    fn from(claims: AccessClaims) -> Self {
        Self {
            user_id: claims.user_id,
            email: claims.email,
            name: claims.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_context_new() {
        let ctx = UserContext::new(UserId::new("u1"), "user@example.com", "Test User");

        assert_eq!(ctx.user_id().as_str(), "u1");
        assert_eq!(ctx.email(), "user@example.com");
        assert_eq!(ctx.name(), "Test User");
    }

    #[test]
    fn test_user_context_from_claims() {
        let claims = AccessClaims {
            user_id: UserId::new("u1"),
            email: "admin@example.com".to_string(),
            name: "Admin User".to_string(),
            iat: 0,
            exp: 900,
        };

        let ctx = UserContext::from(claims);
        assert_eq!(ctx, UserContext::new(UserId::new("u1"), "admin@example.com", "Admin User"));
    }
}
