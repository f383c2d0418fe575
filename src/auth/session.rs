//! Session lifecycle: login, refresh rotation, logout, logout-all and me.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::auth::context::UserContext;
use crate::auth::error::AuthError;
use crate::auth::password::verify_password;
use crate::auth::token_store::RefreshTokenStore;
use crate::auth::tokens::{
    compute_expiry, issue_access_token, issue_refresh_token, verify_access_token,
    verify_refresh_token,
};
use crate::auth::user_store::UserStore;
use crate::config::AuthSettings;
use crate::db::{Db, UserProfile};
use crate::types::UserId;

const MSG_CREDENTIALS_REQUIRED: &str = "Email and password are required";
const MSG_INVALID_CREDENTIALS: &str = "Invalid email or password";
const MSG_REFRESH_REQUIRED: &str = "Refresh token is required";
const MSG_INVALID_REFRESH: &str = "Invalid or expired refresh token";
const MSG_USER_NOT_FOUND: &str = "User not found";
const MSG_REFRESH_NOT_FOUND: &str = "Refresh token not found";
const MSG_TOKEN_REQUIRED: &str = "Authorization token is required";
const MSG_INVALID_TOKEN: &str = "Invalid or expired token";

/// Message returned when a protected flow runs without an identity.
pub const MSG_NO_USER_IN_CONTEXT: &str = "User not found in context";

/// Login body. Missing and empty fields are treated alike.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Refresh and logout body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Access and refresh token handed to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Orchestrates the credential verifier, token issuer and both stores.
#[derive(Clone)]
pub struct SessionService {
    users: UserStore,
    tokens: RefreshTokenStore,
    settings: Arc<AuthSettings>,
}

impl SessionService {
    pub fn new(db: Db, settings: AuthSettings) -> Self {
        Self {
            users: UserStore::new(db.clone()),
            tokens: RefreshTokenStore::new(db),
            settings: Arc::new(settings),
        }
    }

    /// Get reference to the user store.
    pub fn user_store(&self) -> &UserStore {
        &self.users
    }

    /// Get reference to the refresh token store.
    pub fn token_store(&self) -> &RefreshTokenStore {
        &self.tokens
    }

    pub fn settings(&self) -> &AuthSettings {
        &self.settings
    }

    /// Exchange credentials for a fresh token pair.
    pub async fn login(&self, request: LoginRequest) -> Result<TokenPair, AuthError> {
        const FLOW: &str = "Failed to login";

        let (Some(email), Some(password)) = (non_empty(request.email), non_empty(request.password))
        else {
            return Err(AuthError::validation(MSG_CREDENTIALS_REQUIRED));
        };

        let user = self
            .users
            .find_by_email(&email)
            .await
            .map_err(|e| internal(FLOW, e))?;

        let Some(user) = user else {
            info!("login rejected: unknown email");
            return Err(AuthError::unauthorized(MSG_INVALID_CREDENTIALS));
        };

        let valid = verify_password(&password, &user.password_hash)
            .await
            .map_err(|e| internal(FLOW, e))?;

        if !valid {
            info!(user_id = %user.id, "login rejected: wrong password");
            return Err(AuthError::unauthorized(MSG_INVALID_CREDENTIALS));
        }

        let pair = self.issue_pair(&user.profile()).map_err(|e| internal(FLOW, e))?;
        let expires_at = compute_expiry(&self.settings.refresh.expires_in);

        self.tokens
            .insert(&pair.refresh_token, &user.id, expires_at)
            .await
            .map_err(|e| internal(FLOW, e))?;

        info!(user_id = %user.id, "login succeeded");
        Ok(pair)
    }

    /// Rotate a refresh token: the presented token is revoked and a new pair
    /// is returned.
    pub async fn refresh(&self, request: RefreshRequest) -> Result<TokenPair, AuthError> {
        const FLOW: &str = "Failed to refresh token";

        let Some(presented) = non_empty(request.refresh_token) else {
            return Err(AuthError::validation(MSG_REFRESH_REQUIRED));
        };

        let Some(claims) = verify_refresh_token(&presented, &self.settings.refresh) else {
            return Err(AuthError::unauthorized(MSG_INVALID_REFRESH));
        };

        let record = self
            .tokens
            .find_active(&presented, &claims.user_id)
            .await
            .map_err(|e| internal(FLOW, e))?;

        let Some(record) = record else {
            warn!(user_id = %claims.user_id, "refresh rejected: token revoked, expired or unknown");
            return Err(AuthError::unauthorized(MSG_INVALID_REFRESH));
        };

        let user = self
            .users
            .find_by_id(&claims.user_id)
            .await
            .map_err(|e| internal(FLOW, e))?
            .ok_or_else(|| AuthError::not_found(MSG_USER_NOT_FOUND))?;

        let pair = self.issue_pair(&user.profile()).map_err(|e| internal(FLOW, e))?;
        let expires_at = compute_expiry(&self.settings.refresh.expires_in);

        let rotated = self
            .tokens
            .rotate(&record.id, &pair.refresh_token, &user.id, expires_at)
            .await
            .map_err(|e| internal(FLOW, e))?;

        if rotated.is_none() {
            warn!(user_id = %user.id, "refresh rejected: token consumed concurrently");
            return Err(AuthError::unauthorized(MSG_INVALID_REFRESH));
        }

        info!(user_id = %user.id, "refresh token rotated");
        Ok(pair)
    }

    /// Revoke a single refresh token. Revoking an already revoked token succeeds.
    pub async fn logout(&self, request: RefreshRequest) -> Result<(), AuthError> {
        let Some(token) = non_empty(request.refresh_token) else {
            return Err(AuthError::validation(MSG_REFRESH_REQUIRED));
        };

        let found = self
            .tokens
            .revoke_by_token(&token)
            .await
            .map_err(|e| internal("Failed to logout", e))?;

        if !found {
            return Err(AuthError::not_found(MSG_REFRESH_NOT_FOUND));
        }

        info!("refresh token revoked by logout");
        Ok(())
    }

    /// Revoke every refresh token of the authenticated user.
    pub async fn logout_all(&self, user_id: &UserId) -> Result<usize, AuthError> {
        let revoked = self
            .tokens
            .revoke_all_for_user(user_id)
            .await
            .map_err(|e| internal("Failed to logout from all devices", e))?;

        info!(user_id = %user_id, revoked, "logged out from all devices");
        Ok(revoked)
    }

    /// Public profile of the authenticated user.
    pub async fn me(&self, user_id: &UserId) -> Result<UserProfile, AuthError> {
        self.users
            .find_by_id(user_id)
            .await
            .map_err(|e| internal("Failed to fetch user", e))?
            .map(|user| user.profile())
            .ok_or_else(|| AuthError::not_found(MSG_USER_NOT_FOUND))
    }

    /// Resolve an `Authorization` header value into a user context.
    pub fn authenticate(&self, authorization: Option<&str>) -> Result<UserContext, AuthError> {
        let token = authorization
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| AuthError::unauthorized(MSG_TOKEN_REQUIRED))?;

        let claims = verify_access_token(token, &self.settings.access)
            .ok_or_else(|| AuthError::unauthorized(MSG_INVALID_TOKEN))?;

        debug!(user_id = %claims.user_id, "access token accepted");
        Ok(UserContext::from(claims))
    }

    fn issue_pair(&self, user: &UserProfile) -> anyhow::Result<TokenPair> {
        Ok(TokenPair {
            access_token: issue_access_token(user, &self.settings.access)?,
            refresh_token: issue_refresh_token(&user.id, &self.settings.refresh)?,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn internal(flow: &'static str, err: impl Into<anyhow::Error>) -> AuthError {
    let err = err.into();
    error!("{}: {:#}", flow, err);
    AuthError::internal(flow)
}
