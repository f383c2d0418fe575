//! Runtime settings for token issuance and password hashing.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::auth::password::{DEFAULT_BCRYPT_COST, MAX_BCRYPT_COST, MIN_BCRYPT_COST};
use crate::auth::tokens::{TokenConfig, expiry_after};

pub const DEFAULT_ACCESS_EXPIRES_IN: &str = "15m";
pub const DEFAULT_REFRESH_EXPIRES_IN: &str = "7d";

/// Secrets, lifetimes and work factor shared by every session flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    pub access: TokenConfig,
    pub refresh: TokenConfig,
    pub bcrypt_cost: u32,
}

impl AuthSettings {
    pub fn new(access: TokenConfig, refresh: TokenConfig) -> Self {
        Self {
            access,
            refresh,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
        }
    }

    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    /// Reject settings that would make every login fail at signing time.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (kind, config) in [("access", &self.access), ("refresh", &self.refresh)] {
            if config.secret.is_empty() {
                return Err(anyhow::anyhow!("{} token secret must not be empty", kind));
            }
            if expiry_after(Utc::now(), config).is_err() {
                return Err(anyhow::anyhow!(
                    "{} token lifetime `{}` must be <integer><d|h|m|s> within the supported date range",
                    kind,
                    config.expires_in
                ));
            }
        }

        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&self.bcrypt_cost) {
            return Err(anyhow::anyhow!(
                "bcrypt cost {} is outside {}..={}",
                self.bcrypt_cost,
                MIN_BCRYPT_COST,
                MAX_BCRYPT_COST
            ));
        }

        if self.access.secret == self.refresh.secret {
            warn!("access and refresh tokens share a signing secret");
        }

        Ok(())
    }
}
