//! Access/refresh token issuance and verification (HS256 JWT).

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::db::UserProfile;
use crate::types::UserId;

/// Discriminator embedded in every refresh token.
pub const REFRESH_TOKEN_TYPE: &str = "refresh";

/// Lifetime used by [`compute_expiry`] when the configured duration cannot be parsed.
pub const DEFAULT_REFRESH_LIFETIME_DAYS: i64 = 7;

/// Signing secret and lifetime for one kind of token.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    pub secret: String,
    /// Duration expression: `<integer><unit>`, unit one of `d`, `h`, `m`, `s`.
    pub expires_in: String,
}

impl TokenConfig {
    pub fn new(secret: impl Into<String>, expires_in: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            expires_in: expires_in.into(),
        }
    }
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
    pub user_id: UserId,
    pub email: String,
    pub name: String,
    pub iat: i64,
    pub exp: i64,
}

/// Claims carried by a refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub token_type: String,
    /// Random per-token id; keeps tokens minted in the same second distinct.
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

/// Errors raised while signing a token.
#[derive(Debug, Clone)]
pub enum TokenError {
    /// The configured lifetime is not `<integer><unit>`.
    InvalidDuration(String),
    /// The JWT library refused to sign.
    Signing(String),
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDuration(expr) => write!(f, "Invalid token lifetime: {:?}", expr),
            Self::Signing(msg) => write!(f, "Failed to sign token: {}", msg),
        }
    }
}

impl std::error::Error for TokenError {}

/// Parse a `<integer><unit>` duration expression (`15m`, `7d`, `3600s`).
pub fn parse_expires_in(expr: &str) -> Option<Duration> {
    let expr = expr.trim();
    let unit = expr.chars().last()?;
    let digits = &expr[..expr.len() - unit.len_utf8()];

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let value: i64 = digits.parse().ok()?;
    let seconds_per_unit = match unit {
        'd' => 86_400,
        'h' => 3_600,
        'm' => 60,
        's' => 1,
        _ => return None,
    };

    Duration::try_seconds(value.checked_mul(seconds_per_unit)?)
}

/// Absolute expiry for a token issued now.
///
/// Falls back to [`DEFAULT_REFRESH_LIFETIME_DAYS`] when `expires_in` is malformed.
pub fn compute_expiry(expires_in: &str) -> DateTime<Utc> {
    compute_expiry_from(Utc::now(), expires_in)
}

pub(crate) fn compute_expiry_from(now: DateTime<Utc>, expires_in: &str) -> DateTime<Utc> {
    parse_expires_in(expires_in)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .unwrap_or_else(|| now + Duration::days(DEFAULT_REFRESH_LIFETIME_DAYS))
}

/// Expiry instant for a token issued at `now`. A lifetime that parses but
/// runs past the representable date range is rejected like a malformed one.
pub(crate) fn expiry_after(
    now: DateTime<Utc>,
    config: &TokenConfig,
) -> Result<DateTime<Utc>, TokenError> {
    parse_expires_in(&config.expires_in)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| TokenError::InvalidDuration(config.expires_in.clone()))
}

fn sign<T: Serialize>(claims: &T, secret: &str) -> Result<String, TokenError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| TokenError::Signing(e.to_string()))
}

fn validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation
}

/// Sign an access token for `user`.
pub fn issue_access_token(user: &UserProfile, config: &TokenConfig) -> Result<String, TokenError> {
    let now = Utc::now();
    let claims = AccessClaims {
        user_id: user.id.clone(),
        email: user.email.clone(),
        name: user.name.clone(),
        iat: now.timestamp(),
        exp: expiry_after(now, config)?.timestamp(),
    };

    sign(&claims, &config.secret)
}

/// Sign a refresh token for `user_id`.
pub fn issue_refresh_token(user_id: &UserId, config: &TokenConfig) -> Result<String, TokenError> {
    let now = Utc::now();
    let claims = RefreshClaims {
        user_id: user_id.clone(),
        token_type: REFRESH_TOKEN_TYPE.to_string(),
        jti: Uuid::new_v4().to_string(),
        iat: now.timestamp(),
        exp: expiry_after(now, config)?.timestamp(),
    };

    sign(&claims, &config.secret)
}

/// Verify signature and expiry of an access token.
///
/// Any failure (bad signature, malformed, expired, wrong token kind) is `None`.
pub fn verify_access_token(token: &str, config: &TokenConfig) -> Option<AccessClaims> {
    let key = DecodingKey::from_secret(config.secret.as_bytes());

    match decode::<AccessClaims>(token, &key, &validation()) {
        Ok(data) => Some(data.claims),
        Err(e) => {
            debug!("access token rejected: {}", e);
            None
        }
    }
}

/// Verify a refresh token, additionally requiring the refresh discriminator.
pub fn verify_refresh_token(token: &str, config: &TokenConfig) -> Option<RefreshClaims> {
    let key = DecodingKey::from_secret(config.secret.as_bytes());

    let claims = match decode::<RefreshClaims>(token, &key, &validation()) {
        Ok(data) => data.claims,
        Err(e) => {
            debug!("refresh token rejected: {}", e);
            return None;
        }
    };

    if claims.token_type != REFRESH_TOKEN_TYPE {
        debug!("refresh token rejected: type {:?}", claims.token_type);
        return None;
    }

    Some(claims)
}
