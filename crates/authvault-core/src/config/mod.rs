//! Application configuration schemas.
//!
//! Configuration is merged from `config/default.toml`, an optional
//! environment overlay (`config/{env}.toml`) and `AUTHVAULT__*` environment
//! variables, in that order.

pub mod cleanup;
pub mod database;
pub mod logging;
pub mod tokens;

use serde::{Deserialize, Serialize};

pub use self::cleanup::{CleanupConfig, MAX_RETENTION_HOURS};
pub use self::database::DatabaseConfig;
pub use self::logging::LoggingConfig;
pub use self::tokens::{IssuancePolicy, MAX_REFRESH_TTL_SECONDS, TokenConfig};

use crate::error::AppError;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database connection settings.
    pub database: DatabaseConfig,
    /// Refresh-token issuance and rotation settings.
    #[serde(default)]
    pub tokens: TokenConfig,
    /// Retention cleanup settings.
    #[serde(default)]
    pub cleanup: CleanupConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration for the given environment name.
    pub fn load(env: &str) -> Result<Self, AppError> {
        Self::load_from("config", env)
    }

    /// Load configuration from an explicit directory.
    pub fn load_from(dir: &str, env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(&format!("{dir}/default")).required(false))
            .add_source(config::File::with_name(&format!("{dir}/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("AUTHVAULT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let parsed: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// Reject values that would make the store misbehave at runtime.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.database.url.trim().is_empty() {
            return Err(AppError::configuration("database.url must not be empty"));
        }
        if self.database.min_connections > self.database.max_connections {
            return Err(AppError::configuration(
                "database.min_connections exceeds database.max_connections",
            ));
        }
        self.tokens.refresh_ttl()?;
        if self.tokens.max_issue_attempts == 0 {
            return Err(AppError::configuration(
                "tokens.max_issue_attempts must be at least 1",
            ));
        }
        if self.cleanup.batch_size < 1 {
            return Err(AppError::configuration("cleanup.batch_size must be at least 1"));
        }
        self.cleanup.retention()?;
        Ok(())
    }
}
