//! CLI command definitions and dispatch.

pub mod cleanup;
pub mod migrate;
pub mod session;
pub mod token;
pub mod user;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::output::OutputFormat;
use authvault_auth::{
    AuthStore, PgAuthStore, RefreshTokenService, SessionManager, TokenCleanup,
};
use authvault_core::config::AppConfig;
use authvault_core::error::AppError;
use authvault_core::traits::{Clock, SystemClock};
use authvault_database::DatabasePool;

/// AuthVault: session and refresh-token store administration
#[derive(Debug, Parser)]
#[command(name = "authvault", version, about, long_about = None)]
pub struct Cli {
    /// Directory holding default.toml and the environment overlays
    #[arg(short, long, default_value = "config")]
    pub config: String,

    /// Environment overlay to apply (falls back to AUTHVAULT_ENV)
    #[arg(short, long)]
    pub env: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// User management
    User(user::UserArgs),
    /// Session management
    Session(session::SessionArgs),
    /// Refresh-token management
    Token(token::TokenArgs),
    /// Retention cleanup
    Cleanup(cleanup::CleanupArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        let config = self.load_config()?;
        let db = DatabasePool::connect(&config.database).await?;

        let result = match &self.command {
            Commands::Migrate(args) => migrate::execute(args, &db).await,
            Commands::User(args) => user::execute(args, &db, self.format).await,
            Commands::Session(args) => {
                session::execute(args, &Services::new(&config, &db), self.format).await
            }
            Commands::Token(args) => {
                token::execute(args, &Services::new(&config, &db), self.format).await
            }
            Commands::Cleanup(args) => {
                cleanup::execute(args, &Services::new(&config, &db), self.format).await
            }
        };

        db.close().await;
        result
    }

    fn load_config(&self) -> Result<AppConfig, AppError> {
        let env = self
            .env
            .clone()
            .or_else(|| std::env::var("AUTHVAULT_ENV").ok())
            .unwrap_or_else(|| "production".to_string());
        AppConfig::load_from(&self.config, &env)
    }
}

/// Services wired over the Postgres store.
#[derive(Debug)]
pub struct Services {
    /// Session lifecycle.
    pub sessions: SessionManager,
    /// Token issuance and rotation.
    pub tokens: RefreshTokenService,
    /// Retention cleanup.
    pub cleanup: TokenCleanup,
}

impl Services {
    /// Build the services from configuration and an open pool.
    pub fn new(config: &AppConfig, db: &DatabasePool) -> Self {
        let store: Arc<dyn AuthStore> = Arc::new(PgAuthStore::new(db.pool().clone()));
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let tokens = RefreshTokenService::new(store.clone(), clock.clone(), config.tokens.clone());
        Self {
            sessions: SessionManager::new(store.clone(), clock.clone(), tokens.clone()),
            tokens,
            cleanup: TokenCleanup::new(store, clock, config.cleanup.clone()),
        }
    }
}

/// Parse a UUID argument.
pub fn parse_uuid(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|e| AppError::validation(format!("Invalid UUID: {e}")))
}
