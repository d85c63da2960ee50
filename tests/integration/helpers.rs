//! Shared helpers for the Postgres integration suite.
//!
//! Every test connects to `AUTHVAULT_TEST_DATABASE_URL` and returns early
//! when it is unset. Tests share one database, so each one works on its own
//! freshly created user.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use authvault_auth::{AuthStore, PgAuthStore, RefreshTokenService, SessionManager, TokenCleanup};
use authvault_core::config::{CleanupConfig, IssuancePolicy, TokenConfig};
use authvault_core::traits::{Clock, ManualClock, SystemClock};
use authvault_database::DatabasePool;
use authvault_database::repositories::UserRepository;
use authvault_entity::user::CreateUser;

/// Environment variable naming the test database.
pub const DATABASE_URL_VAR: &str = "AUTHVAULT_TEST_DATABASE_URL";

/// A migrated database plus one dedicated user.
pub struct TestDb {
    pub db: DatabasePool,
    pub user_id: Uuid,
}

impl TestDb {
    /// Connect and migrate, or `None` when no test database is configured.
    pub async fn connect() -> Option<Self> {
        let Ok(url) = std::env::var(DATABASE_URL_VAR) else {
            eprintln!("{DATABASE_URL_VAR} not set, skipping");
            return None;
        };

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(&url)
            .await
            .expect("connect to test database");
        let db = DatabasePool::from_pool(pool);
        authvault_database::run_migrations(db.pool())
            .await
            .expect("run migrations");

        let user_id = create_user(&db, "it").await;
        Some(Self { db, user_id })
    }

    /// Session and token services on the system clock.
    pub fn services(&self, policy: IssuancePolicy) -> Services {
        self.services_with_clock(policy, Arc::new(SystemClock))
    }

    /// Session and token services on an explicit clock.
    pub fn services_with_clock(&self, policy: IssuancePolicy, clock: Arc<dyn Clock>) -> Services {
        let store: Arc<dyn AuthStore> = Arc::new(PgAuthStore::new(self.db.pool().clone()));
        let config = TokenConfig {
            refresh_ttl_seconds: 3600,
            issuance_policy: policy,
            max_issue_attempts: 3,
        };
        let tokens = RefreshTokenService::new(store.clone(), clock.clone(), config);
        Services {
            sessions: SessionManager::new(store.clone(), clock.clone(), tokens.clone()),
            cleanup: TokenCleanup::new(
                store.clone(),
                clock,
                CleanupConfig {
                    retention_hours: 24,
                    batch_size: 10_000,
                    ..CleanupConfig::default()
                },
            ),
            tokens,
            store,
        }
    }
}

/// Wired services for one test.
pub struct Services {
    pub store: Arc<dyn AuthStore>,
    pub tokens: RefreshTokenService,
    pub sessions: SessionManager,
    pub cleanup: TokenCleanup,
}

/// Insert a user with a unique name.
pub async fn create_user(db: &DatabasePool, prefix: &str) -> Uuid {
    let name = format!("{prefix}-{}", Uuid::new_v4().simple());
    UserRepository::new(db.pool().clone())
        .create(&CreateUser {
            user_name: name,
            image_url: None,
        })
        .await
        .expect("create user")
        .user_id
}

/// A manual clock far in the past, so cleanup runs on it never touch rows
/// written by concurrently running tests.
pub fn past_clock() -> ManualClock {
    let start: DateTime<Utc> = "2001-01-01T00:00:00Z".parse().expect("timestamp");
    ManualClock::new(start)
}
