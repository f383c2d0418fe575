//! Password hashing and verification (bcrypt).

use anyhow::{Context, Result};
use bcrypt::{hash, verify};

/// Work factor used when no cost is configured.
pub const DEFAULT_BCRYPT_COST: u32 = 10;

/// Range of work factors bcrypt accepts.
pub const MIN_BCRYPT_COST: u32 = 4;
pub const MAX_BCRYPT_COST: u32 = 31;

/// Hash a password with a fresh random salt.
///
/// Runs on the blocking thread pool; bcrypt is deliberately slow.
pub async fn hash_password(password: &str, cost: u32) -> Result<String> {
    let password = password.to_string();

    tokio::task::spawn_blocking(move || hash(password, cost))
        .await
        .context("password hashing task failed")?
        .context("failed to hash password")
}

/// Check a plaintext password against a stored bcrypt hash.
///
/// `Ok(false)` on mismatch. A stored hash that bcrypt cannot parse is an
/// error rather than a mismatch, so corrupt rows surface as internal errors.
pub async fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    let password = password.to_string();
    let password_hash = password_hash.to_string();

    tokio::task::spawn_blocking(move || verify(password, &password_hash))
        .await
        .context("password verification task failed")?
        .context("stored password hash is invalid")
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_COST: u32 = 4;

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hashed = hash_password("admin123", TEST_COST).await.unwrap();

        assert!(hashed.starts_with("$2"));
        assert!(verify_password("admin123", &hashed).await.unwrap());
        assert!(!verify_password("admin124", &hashed).await.unwrap());
    }

    #[tokio::test]
    async fn test_hashes_are_salted() {
        let a = hash_password("same-password", TEST_COST).await.unwrap();
        let b = hash_password("same-password", TEST_COST).await.unwrap();

        assert_ne!(a, b);
        assert!(verify_password("same-password", &a).await.unwrap());
        assert!(verify_password("same-password", &b).await.unwrap());
    }

    #[tokio::test]
    async fn test_malformed_hash_is_error() {
        let result = verify_password("admin123", "not-a-bcrypt-hash").await;
        assert!(result.is_err());
    }
}
