//! AuthVault daemon.
//!
//! Owns the database pool and runs the refresh-token retention cleanup on
//! its cron schedule until interrupted. Request handlers embed the
//! `authvault-auth` services directly; the daemon only does maintenance.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use authvault_auth::{AuthStore, PgAuthStore, TokenCleanup};
use authvault_core::config::AppConfig;
use authvault_core::error::AppError;
use authvault_core::traits::{Clock, SystemClock};
use authvault_database::DatabasePool;
use authvault_worker::{CleanupScheduler, TokenCleanupJob};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Daemon error");
        std::process::exit(1);
    }
}

/// Load configuration from the config directory and environment.
fn load_configuration() -> Result<AppConfig, AppError> {
    let dir = std::env::var("AUTHVAULT_CONFIG").unwrap_or_else(|_| "config".to_string());
    let env = std::env::var("AUTHVAULT_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load_from(&dir, &env)
}

/// Initialize tracing. `RUST_LOG` overrides the configured level.
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    if config.logging.is_json() {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .pretty()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting AuthVault v{}", env!("CARGO_PKG_VERSION"));

    let db = DatabasePool::connect(&config.database).await?;

    tracing::info!("Running database migrations...");
    authvault_database::run_migrations(db.pool()).await?;

    let store: Arc<dyn AuthStore> = Arc::new(PgAuthStore::new(db.pool().clone()));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let cleanup = Arc::new(TokenCleanup::new(store, clock, config.cleanup.clone()));

    let mut scheduler = if config.cleanup.enabled {
        let scheduler = CleanupScheduler::new().await?;
        scheduler
            .register_token_cleanup(TokenCleanupJob::new(cleanup), &config.cleanup)
            .await?;
        scheduler.start().await?;
        Some(scheduler)
    } else {
        tracing::warn!("Refresh token cleanup is disabled");
        None
    };

    tracing::info!("AuthVault daemon ready");
    shutdown_signal().await;
    tracing::info!("Shutdown signal received");

    if let Some(scheduler) = scheduler.as_mut() {
        scheduler.shutdown().await?;
    }
    db.close().await;

    tracing::info!("AuthVault daemon stopped");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
