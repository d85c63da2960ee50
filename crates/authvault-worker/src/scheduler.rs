//! Cron scheduler for periodic maintenance tasks.

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};

use authvault_core::config::CleanupConfig;
use authvault_core::error::AppError;

use crate::jobs::TokenCleanupJob;

/// Cron-based scheduler running the refresh-token retention job.
pub struct CleanupScheduler {
    /// The underlying job scheduler
    scheduler: JobScheduler,
}

impl std::fmt::Debug for CleanupScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CleanupScheduler").finish()
    }
}

impl CleanupScheduler {
    /// Create an empty scheduler.
    pub async fn new() -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;

        Ok(Self { scheduler })
    }

    /// Register the token cleanup job on the configured cron expression.
    pub async fn register_token_cleanup(
        &self,
        job: TokenCleanupJob,
        config: &CleanupConfig,
    ) -> Result<(), AppError> {
        let cron = CronJob::new_async(config.schedule.as_str(), move |_uuid, _lock| {
            let job = job.clone();
            Box::pin(async move {
                tracing::debug!("Running scheduled token cleanup");
                if let Err(e) = job.run().await {
                    tracing::error!(error = %e, "Scheduled token cleanup failed");
                }
            })
        })
        .map_err(|e| {
            AppError::configuration(format!(
                "Invalid cleanup schedule '{}': {e}",
                config.schedule
            ))
        })?;

        self.scheduler.add(cron).await.map_err(|e| {
            AppError::internal(format!("Failed to add token_cleanup schedule: {e}"))
        })?;

        tracing::info!(schedule = %config.schedule, "Registered: token_cleanup");
        Ok(())
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;

        tracing::info!("Cron scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler
    pub async fn shutdown(&mut self) -> Result<(), AppError> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {e}")))?;

        tracing::info!("Cron scheduler shut down");
        Ok(())
    }
}
