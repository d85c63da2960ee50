//! Retention cleanup configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Longest accepted retention window: ten years.
pub const MAX_RETENTION_HOURS: i64 = 10 * 365 * 24;

/// Settings for the periodic purge of expired refresh-token rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupConfig {
    /// Whether the daemon schedules the cleanup job.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Six-field cron expression (seconds first).
    #[serde(default = "default_schedule")]
    pub schedule: String,
    /// How long expired rows are kept for audit before deletion.
    #[serde(default = "default_retention_hours")]
    pub retention_hours: i64,
    /// Upper bound on rows deleted per run.
    #[serde(default = "default_batch_size")]
    pub batch_size: i64,
}

impl CleanupConfig {
    /// Retention window as a [`chrono::Duration`].
    pub fn retention(&self) -> Result<Duration, AppError> {
        if !(0..=MAX_RETENTION_HOURS).contains(&self.retention_hours) {
            return Err(AppError::configuration(format!(
                "cleanup.retention_hours must be between 0 and {MAX_RETENTION_HOURS}"
            )));
        }
        Duration::try_hours(self.retention_hours)
            .ok_or_else(|| AppError::configuration("cleanup.retention_hours is out of range"))
    }
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            schedule: default_schedule(),
            retention_hours: default_retention_hours(),
            batch_size: default_batch_size(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_schedule() -> String {
    "0 */15 * * * *".to_string()
}

fn default_retention_hours() -> i64 {
    168
}

fn default_batch_size() -> i64 {
    10_000
}
