//! Refresh-token configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Longest accepted refresh-token lifetime: ten years.
pub const MAX_REFRESH_TTL_SECONDS: i64 = 10 * 365 * 24 * 60 * 60;

/// What to do when a session that already holds a current refresh token is
/// asked to issue another one outside of rotation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssuancePolicy {
    /// Fail with `TokenAlreadyCurrent`.
    #[default]
    Reject,
    /// Revoke the existing current token and issue the new one atomically.
    Supersede,
}

/// Refresh-token issuance and rotation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Lifetime of every newly issued refresh token, in seconds.
    #[serde(default = "default_refresh_ttl")]
    pub refresh_ttl_seconds: i64,
    /// Conflict policy for explicit issuance.
    #[serde(default)]
    pub issuance_policy: IssuancePolicy,
    /// How many fresh values to try when a token hash collides.
    #[serde(default = "default_max_issue_attempts")]
    pub max_issue_attempts: u32,
}

impl TokenConfig {
    /// Refresh-token lifetime as a [`chrono::Duration`].
    pub fn refresh_ttl(&self) -> Result<Duration, AppError> {
        if !(1..=MAX_REFRESH_TTL_SECONDS).contains(&self.refresh_ttl_seconds) {
            return Err(AppError::configuration(format!(
                "tokens.refresh_ttl_seconds must be between 1 and {MAX_REFRESH_TTL_SECONDS}"
            )));
        }
        Duration::try_seconds(self.refresh_ttl_seconds).ok_or_else(|| {
            AppError::configuration("tokens.refresh_ttl_seconds is out of range")
        })
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            refresh_ttl_seconds: default_refresh_ttl(),
            issuance_policy: IssuancePolicy::default(),
            max_issue_attempts: default_max_issue_attempts(),
        }
    }
}

fn default_refresh_ttl() -> i64 {
    30 * 24 * 60 * 60
}

fn default_max_issue_attempts() -> u32 {
    3
}
