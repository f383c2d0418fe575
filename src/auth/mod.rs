//! Authentication and session lifecycle.
//!
//! - **Credentials**: bcrypt hashing and verification ([`password`])
//! - **Tokens**: HS256 access and refresh tokens ([`tokens`])
//! - **Stores**: users and persisted refresh tokens
//! - **Sessions**: login, refresh rotation, logout, logout-all, me
//!
//! ## Refresh token lifecycle
//!
//! A refresh token is issued and persisted on login, consumed exactly once by
//! a refresh (which persists its replacement in the same transaction), and
//! revoked by logout or logout-all. Revoked and expired tokens are terminal.
//!
//! ## Usage
//!
//! ```ignore
//! let sessions = SessionService::new(db, settings);
//! let pair = sessions.login(LoginRequest { email, password }).await?;
//! let ctx = sessions.authenticate(Some(&format!("Bearer {}", pair.access_token)))?;
//! let profile = sessions.me(ctx.user_id()).await?;
//! ```

mod context;
mod error;
pub mod password;
mod session;
mod token_store;
pub mod tokens;
mod user_store;

pub use context::UserContext;
pub use error::AuthError;
pub use password::{DEFAULT_BCRYPT_COST, hash_password, verify_password};
pub use session::{
    LoginRequest, MSG_NO_USER_IN_CONTEXT, RefreshRequest, SessionService, TokenPair,
};
pub use token_store::RefreshTokenStore;
pub use tokens::{AccessClaims, RefreshClaims, TokenConfig, TokenError};
pub use user_store::{ADMIN_EMAIL, ADMIN_NAME, ADMIN_PASSWORD, UserStore};
