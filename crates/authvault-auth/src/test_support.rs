//! Fixtures shared by the unit tests.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use uuid::Uuid;

use authvault_core::config::{CleanupConfig, IssuancePolicy, TokenConfig};
use authvault_core::traits::ManualClock;

use crate::cleanup::TokenCleanup;
use crate::session::SessionManager;
use crate::store::MemoryAuthStore;
use crate::token::RefreshTokenService;

pub(crate) struct Harness {
    pub store: MemoryAuthStore,
    pub clock: ManualClock,
    pub tokens: RefreshTokenService,
    pub sessions: SessionManager,
    pub cleanup: TokenCleanup,
    pub user_id: Uuid,
}

pub(crate) async fn harness() -> Harness {
    harness_with(IssuancePolicy::Reject).await
}

pub(crate) async fn harness_with(policy: IssuancePolicy) -> Harness {
    let store = MemoryAuthStore::new();
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
    let config = TokenConfig {
        refresh_ttl_seconds: 3600,
        issuance_policy: policy,
        max_issue_attempts: 3,
    };

    let tokens = RefreshTokenService::new(Arc::new(store.clone()), Arc::new(clock.clone()), config);
    let sessions = SessionManager::new(
        Arc::new(store.clone()),
        Arc::new(clock.clone()),
        tokens.clone(),
    );
    let cleanup = TokenCleanup::new(
        Arc::new(store.clone()),
        Arc::new(clock.clone()),
        CleanupConfig {
            retention_hours: 24,
            batch_size: 100,
            ..CleanupConfig::default()
        },
    );

    let user_id = Uuid::new_v4();
    store.add_user(user_id).await;

    Harness {
        store,
        clock,
        tokens,
        sessions,
        cleanup,
        user_id,
    }
}
