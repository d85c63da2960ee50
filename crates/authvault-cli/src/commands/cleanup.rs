//! Retention cleanup commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use super::Services;
use crate::output::{self, OutputFormat};
use authvault_core::error::AppError;
use tracing::info;

/// Arguments for cleanup commands
#[derive(Debug, Args)]
pub struct CleanupArgs {
    /// Cleanup subcommand
    #[command(subcommand)]
    pub command: CleanupCommand,
}

/// Cleanup subcommands
#[derive(Debug, Subcommand)]
pub enum CleanupCommand {
    /// Delete expired, non-current refresh tokens past the retention window
    Run {
        /// Skip confirmation
        #[arg(long)]
        force: bool,
    },
}

/// Cleanup result row
#[derive(Debug, Serialize, Tabled)]
struct ReportRow {
    /// Cutoff
    cutoff: String,
    /// Deleted rows
    deleted: u64,
    /// Passes
    passes: u32,
}

/// Execute cleanup commands
pub async fn execute(
    args: &CleanupArgs,
    services: &Services,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        CleanupCommand::Run { force } => {
            let config = services.cleanup.config();
            let prompt = format!(
                "Delete up to {} refresh tokens expired more than {}h ago?",
                config.batch_size, config.retention_hours
            );
            if !output::confirm(&prompt, *force)? {
                return Ok(());
            }

            let report = services.cleanup.run_once().await?;
            info!(deleted = report.deleted, passes = report.passes, "Manual cleanup finished");
            output::print_item(
                &ReportRow {
                    cutoff: output::timestamp(report.cutoff),
                    deleted: report.deleted,
                    passes: report.passes,
                },
                format,
            );
        }
    }

    Ok(())
}
