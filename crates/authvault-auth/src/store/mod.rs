//! Persistence seam for sessions and refresh tokens.
//!
//! Each method is one atomic unit: either all of its writes become visible
//! or none do. The one exception is replay handling inside
//! [`AuthStore::rotate_token`], which commits the session-wide revocation and
//! then reports `ReplayDetected`.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use authvault_core::config::IssuancePolicy;
use authvault_core::result::AppResult;
use authvault_entity::session::AuthSession;
use authvault_entity::token::{RefreshToken, TokenIssue, TokenRotation};

pub use memory::MemoryAuthStore;
pub use postgres::PgAuthStore;

/// Storage operations needed by the session manager and rotation engine.
#[async_trait]
pub trait AuthStore: Send + Sync + std::fmt::Debug + 'static {
    /// Insert a new session. Unknown user → `NotFound`.
    async fn create_session(&self, session: &AuthSession) -> AppResult<AuthSession>;

    /// Look up a session.
    async fn find_session(&self, id: Uuid) -> AppResult<Option<AuthSession>>;

    /// A user's sessions, newest first.
    async fn list_user_sessions(
        &self,
        user_id: Uuid,
        include_revoked: bool,
    ) -> AppResult<Vec<AuthSession>>;

    /// Set the key thumbprint once. Same value again is a no-op; a different
    /// value → `AlreadyBound`.
    async fn bind_thumbprint(&self, id: Uuid, jkt: &str) -> AppResult<AuthSession>;

    /// Set `last_used_at` on an active session.
    async fn touch_session(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<()>;

    /// Set `revoked_at` if unset. Unknown session → `NotFound`.
    async fn revoke_session(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<AuthSession>;

    /// Revoke every active session of a user.
    async fn revoke_user_sessions(&self, user_id: Uuid, now: DateTime<Utc>) -> AppResult<u64>;

    /// Insert `token` as its session's only current token.
    async fn issue_token(
        &self,
        token: &RefreshToken,
        policy: IssuancePolicy,
        now: DateTime<Utc>,
    ) -> AppResult<TokenIssue>;

    /// Consume the token hashed as `presented` and insert its successor.
    async fn rotate_token(
        &self,
        presented: &[u8],
        replacement_hash: Vec<u8>,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> AppResult<TokenRotation>;

    /// Revoke one token. Unknown hash → `InvalidToken`.
    async fn revoke_token(&self, token_hash: &[u8], now: DateTime<Utc>) -> AppResult<RefreshToken>;

    /// Look up a token by hash.
    async fn find_token(&self, token_hash: &[u8]) -> AppResult<Option<RefreshToken>>;

    /// Whether the hash names a usable token of an active session.
    async fn is_current_and_valid(&self, token_hash: &[u8], now: DateTime<Utc>)
    -> AppResult<bool>;

    /// All tokens of a session in issue order.
    async fn session_tokens(&self, session_id: Uuid) -> AppResult<Vec<RefreshToken>>;

    /// Delete up to `limit` purgeable rows expired before `cutoff`. Only rows
    /// no other row references are eligible.
    async fn purge_expired_tokens(&self, cutoff: DateTime<Utc>, limit: i64) -> AppResult<u64>;
}
