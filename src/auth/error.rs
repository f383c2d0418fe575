//! Errors surfaced by the session flows and the request gate.

use std::fmt;

/// Authentication errors.
///
/// Each variant carries the client-facing message. Internal failures carry a
/// flow-level message only; the underlying cause is logged where it happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Required input missing from the request
    Validation(String),
    /// Bad credentials, bad token, or no identity in context
    Unauthorized(String),
    /// The referenced user or refresh token does not exist
    NotFound(String),
    /// Store, hashing or signing failure
    Internal(String),
}

impl AuthError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Client-facing message.
    pub fn message(&self) -> &str {
        match self {
            Self::Validation(msg)
            | Self::Unauthorized(msg)
            | Self::NotFound(msg)
            | Self::Internal(msg) => msg,
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(msg) => write!(f, "Validation error: {}", msg),
            Self::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            Self::NotFound(msg) => write!(f, "Not found: {}", msg),
            Self::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_display() {
        assert_eq!(
            AuthError::validation("Email and password are required").to_string(),
            "Validation error: Email and password are required"
        );
        assert_eq!(
            AuthError::unauthorized("Invalid or expired token").to_string(),
            "Unauthorized: Invalid or expired token"
        );
        assert_eq!(
            AuthError::not_found("User not found").to_string(),
            "Not found: User not found"
        );
        assert_eq!(
            AuthError::internal("Failed to login").to_string(),
            "Internal error: Failed to login"
        );
    }

    #[test]
    fn test_message_is_bare() {
        assert_eq!(AuthError::not_found("Refresh token not found").message(), "Refresh token not found");
    }
}
