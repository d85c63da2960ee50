//! PostgreSQL-backed [`AuthStore`] delegating to the repositories.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use authvault_core::config::IssuancePolicy;
use authvault_core::result::AppResult;
use authvault_database::repositories::{AuthSessionRepository, RefreshTokenRepository};
use authvault_entity::session::AuthSession;
use authvault_entity::token::{RefreshToken, TokenIssue, TokenRotation};

use super::AuthStore;

/// Store backed by the `auth_sessions` and `refresh_tokens` tables.
#[derive(Debug, Clone)]
pub struct PgAuthStore {
    sessions: AuthSessionRepository,
    tokens: RefreshTokenRepository,
}

impl PgAuthStore {
    /// Build the store over a pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            sessions: AuthSessionRepository::new(pool.clone()),
            tokens: RefreshTokenRepository::new(pool),
        }
    }
}

#[async_trait]
impl AuthStore for PgAuthStore {
    async fn create_session(&self, session: &AuthSession) -> AppResult<AuthSession> {
        self.sessions.create(session).await
    }

    async fn find_session(&self, id: Uuid) -> AppResult<Option<AuthSession>> {
        self.sessions.find_by_id(id).await
    }

    async fn list_user_sessions(
        &self,
        user_id: Uuid,
        include_revoked: bool,
    ) -> AppResult<Vec<AuthSession>> {
        self.sessions.list_by_user(user_id, include_revoked).await
    }

    async fn bind_thumbprint(&self, id: Uuid, jkt: &str) -> AppResult<AuthSession> {
        self.sessions.bind_thumbprint(id, jkt).await
    }

    async fn touch_session(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        self.sessions.touch(id, now).await
    }

    async fn revoke_session(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<AuthSession> {
        self.sessions.revoke(id, now).await
    }

    async fn revoke_user_sessions(&self, user_id: Uuid, now: DateTime<Utc>) -> AppResult<u64> {
        self.sessions.revoke_all_for_user(user_id, now).await
    }

    async fn issue_token(
        &self,
        token: &RefreshToken,
        policy: IssuancePolicy,
        now: DateTime<Utc>,
    ) -> AppResult<TokenIssue> {
        self.tokens.issue(token, policy, now).await
    }

    async fn rotate_token(
        &self,
        presented: &[u8],
        replacement_hash: Vec<u8>,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> AppResult<TokenRotation> {
        self.tokens.rotate(presented, replacement_hash, now, ttl).await
    }

    async fn revoke_token(&self, token_hash: &[u8], now: DateTime<Utc>) -> AppResult<RefreshToken> {
        self.tokens.revoke_by_hash(token_hash, now).await
    }

    async fn find_token(&self, token_hash: &[u8]) -> AppResult<Option<RefreshToken>> {
        self.tokens.find_by_hash(token_hash).await
    }

    async fn is_current_and_valid(
        &self,
        token_hash: &[u8],
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        self.tokens.is_current_and_valid(token_hash, now).await
    }

    async fn session_tokens(&self, session_id: Uuid) -> AppResult<Vec<RefreshToken>> {
        self.tokens.list_by_session(session_id).await
    }

    async fn purge_expired_tokens(&self, cutoff: DateTime<Utc>, limit: i64) -> AppResult<u64> {
        self.tokens.purge_expired(cutoff, limit).await
    }
}
