//! Database migration management commands.

use clap::{Args, Subcommand};

use crate::output;
use authvault_core::error::AppError;
use authvault_database::DatabasePool;
use tracing::info;

/// Arguments for the migrate command
#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Migration subcommand
    #[command(subcommand)]
    pub command: MigrateCommand,
}

/// Migration subcommands
#[derive(Debug, Subcommand)]
pub enum MigrateCommand {
    /// Run all pending migrations
    Run,
}

/// Execute migration commands
pub async fn execute(args: &MigrateArgs, db: &DatabasePool) -> Result<(), AppError> {
    match &args.command {
        MigrateCommand::Run => {
            println!("Running database migrations...");
            authvault_database::run_migrations(db.pool()).await?;
            info!("Migrations applied");
            output::print_success("All migrations applied successfully.");
        }
    }

    Ok(())
}
