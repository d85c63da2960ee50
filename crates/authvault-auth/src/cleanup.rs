//! Retention cleanup of expired refresh-token rows.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use authvault_core::config::CleanupConfig;
use authvault_core::error::AppError;
use authvault_core::result::AppResult;
use authvault_core::traits::Clock;

use crate::store::AuthStore;

/// Outcome of one cleanup run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    /// Rows expired before this instant were eligible.
    pub cutoff: DateTime<Utc>,
    /// Rows deleted.
    pub deleted: u64,
    /// Purge statements that deleted at least one row.
    pub passes: u32,
}

/// Deletes non-current refresh tokens that expired longer than the
/// retention window ago.
#[derive(Clone)]
pub struct TokenCleanup {
    store: Arc<dyn AuthStore>,
    clock: Arc<dyn Clock>,
    config: CleanupConfig,
}

impl std::fmt::Debug for TokenCleanup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCleanup")
            .field("config", &self.config)
            .finish()
    }
}

impl TokenCleanup {
    /// Creates a new cleanup handler.
    pub fn new(store: Arc<dyn AuthStore>, clock: Arc<dyn Clock>, config: CleanupConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// Cleanup settings in effect.
    pub fn config(&self) -> &CleanupConfig {
        &self.config
    }

    /// Run one cleanup cycle, deleting at most `batch_size` rows.
    ///
    /// Each purge pass only removes rows nothing points at, so long chains
    /// are trimmed one generation per pass until the budget is spent or a
    /// pass finds nothing.
    pub async fn run_once(&self) -> AppResult<CleanupReport> {
        let budget = u64::try_from(self.config.batch_size)
            .ok()
            .filter(|b| *b > 0)
            .ok_or_else(|| AppError::configuration("cleanup.batch_size must be at least 1"))?;
        let cutoff = self
            .clock
            .now()
            .checked_sub_signed(self.config.retention()?)
            .ok_or_else(|| AppError::configuration("cleanup.retention_hours is out of range"))?;

        let mut deleted = 0u64;
        let mut passes = 0u32;
        while deleted < budget {
            let remaining = i64::try_from(budget - deleted).unwrap_or(i64::MAX);
            let removed = self.store.purge_expired_tokens(cutoff, remaining).await?;
            if removed == 0 {
                break;
            }
            deleted += removed;
            passes += 1;
            debug!(pass = passes, removed, "Cleanup pass completed");
        }

        info!(deleted, passes, cutoff = %cutoff, "Refresh token cleanup completed");
        Ok(CleanupReport {
            cutoff,
            deleted,
            passes,
        })
    }
}
