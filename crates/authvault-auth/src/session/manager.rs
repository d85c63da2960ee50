//! Session lifecycle manager: create, bind, touch, revoke.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use authvault_core::error::AppError;
use authvault_core::result::AppResult;
use authvault_core::traits::Clock;
use authvault_entity::session::AuthSession;
use authvault_entity::token::IssuedRefreshToken;

use crate::store::AuthStore;
use crate::token::RefreshTokenService;

/// Manages logical sessions per user and device.
#[derive(Clone)]
pub struct SessionManager {
    /// Session persistence.
    store: Arc<dyn AuthStore>,
    /// Time source for every write.
    clock: Arc<dyn Clock>,
    /// Used to hand out the first refresh token of a new session.
    tokens: RefreshTokenService,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("store", &self.store)
            .finish()
    }
}

impl SessionManager {
    /// Creates a new session manager.
    pub fn new(
        store: Arc<dyn AuthStore>,
        clock: Arc<dyn Clock>,
        tokens: RefreshTokenService,
    ) -> Self {
        Self {
            store,
            clock,
            tokens,
        }
    }

    /// Start a session for `user_id`, optionally already key-bound.
    pub async fn create(&self, user_id: Uuid, dpop_jkt: Option<&str>) -> AppResult<AuthSession> {
        let jkt = dpop_jkt.map(normalize_thumbprint).transpose()?;
        let session = AuthSession::new(user_id, jkt, self.clock.now());
        let created = self.store.create_session(&session).await?;

        info!(
            session_id = %created.id,
            user_id = %user_id,
            bound = created.is_bound(),
            "Session created"
        );
        Ok(created)
    }

    /// Start a session and issue its first refresh token with the
    /// configured lifetime.
    pub async fn open(
        &self,
        user_id: Uuid,
        dpop_jkt: Option<&str>,
    ) -> AppResult<(AuthSession, IssuedRefreshToken)> {
        let session = self.create(user_id, dpop_jkt).await?;
        let issued = self.tokens.issue_default(session.id).await?;
        Ok((session, issued))
    }

    /// Bind a key thumbprint to a session. Binding the same value twice is
    /// accepted; a different value fails with `AlreadyBound`.
    pub async fn bind_key_thumbprint(&self, session_id: Uuid, thumbprint: &str) -> AppResult<()> {
        let jkt = normalize_thumbprint(thumbprint)?;
        self.store.bind_thumbprint(session_id, &jkt).await?;
        info!(session_id = %session_id, "Key thumbprint bound");
        Ok(())
    }

    /// Record activity on an active session.
    pub async fn touch(&self, session_id: Uuid) -> AppResult<()> {
        self.store.touch_session(session_id, self.clock.now()).await?;
        debug!(session_id = %session_id, "Session touched");
        Ok(())
    }

    /// Revoke a session. Its tokens stay in place but are no longer usable.
    pub async fn revoke(&self, session_id: Uuid) -> AppResult<()> {
        let session = self.store.revoke_session(session_id, self.clock.now()).await?;
        info!(
            session_id = %session_id,
            user_id = %session.user_id,
            "Session revoked"
        );
        Ok(())
    }

    /// Fetch a session.
    pub async fn get(&self, session_id: Uuid) -> AppResult<AuthSession> {
        self.store
            .find_session(session_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Session {session_id} not found")))
    }

    /// A user's sessions, newest first.
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        include_revoked: bool,
    ) -> AppResult<Vec<AuthSession>> {
        self.store.list_user_sessions(user_id, include_revoked).await
    }

    /// Revoke every active session of a user. Returns how many were revoked.
    pub async fn revoke_all_for_user(&self, user_id: Uuid) -> AppResult<u64> {
        let count = self
            .store
            .revoke_user_sessions(user_id, self.clock.now())
            .await?;
        info!(user_id = %user_id, count, "Revoked all user sessions");
        Ok(count)
    }
}

fn normalize_thumbprint(raw: &str) -> AppResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("Key thumbprint must not be blank"));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use authvault_core::ErrorKind;
    use authvault_core::traits::Clock;
    use chrono::Duration;

    use crate::test_support::harness;

    #[tokio::test]
    async fn test_create_requires_existing_user() {
        let h = harness().await;
        let err = h
            .sessions
            .create(uuid::Uuid::new_v4(), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_create_with_thumbprint() {
        let h = harness().await;
        let session = h.sessions.create(h.user_id, Some(" jkt-a ")).await.unwrap();
        assert_eq!(session.dpop_jkt.as_deref(), Some("jkt-a"));
        assert_eq!(session.created_at, h.clock.now());
        assert!(!session.is_revoked());

        let err = h.sessions.create(h.user_id, Some("   ")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_bind_thumbprint_once() {
        let h = harness().await;
        let session = h.sessions.create(h.user_id, None).await.unwrap();

        h.sessions.bind_key_thumbprint(session.id, "jkt-a").await.unwrap();
        h.sessions.bind_key_thumbprint(session.id, "jkt-a").await.unwrap();

        let err = h
            .sessions
            .bind_key_thumbprint(session.id, "jkt-b")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::AlreadyBound);

        let stored = h.sessions.get(session.id).await.unwrap();
        assert_eq!(stored.dpop_jkt.as_deref(), Some("jkt-a"));
    }

    #[tokio::test]
    async fn test_bind_thumbprint_errors() {
        let h = harness().await;
        let err = h
            .sessions
            .bind_key_thumbprint(uuid::Uuid::new_v4(), "jkt")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);

        let session = h.sessions.create(h.user_id, None).await.unwrap();
        let err = h.sessions.bind_key_thumbprint(session.id, "").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        h.sessions.revoke(session.id).await.unwrap();
        let err = h
            .sessions
            .bind_key_thumbprint(session.id, "jkt")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::SessionRevoked);
    }

    #[tokio::test]
    async fn test_touch_updates_last_used() {
        let h = harness().await;
        let session = h.sessions.create(h.user_id, None).await.unwrap();

        h.clock.advance(Duration::minutes(3));
        h.sessions.touch(session.id).await.unwrap();
        let stored = h.sessions.get(session.id).await.unwrap();
        assert_eq!(stored.last_used_at, Some(h.clock.now()));

        h.sessions.revoke(session.id).await.unwrap();
        let err = h.sessions.touch(session.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::SessionRevoked);

        let err = h.sessions.touch(uuid::Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let h = harness().await;
        let session = h.sessions.create(h.user_id, None).await.unwrap();

        h.sessions.revoke(session.id).await.unwrap();
        let first = h.sessions.get(session.id).await.unwrap().revoked_at;

        h.clock.advance(Duration::minutes(1));
        h.sessions.revoke(session.id).await.unwrap();
        let second = h.sessions.get(session.id).await.unwrap().revoked_at;
        assert_eq!(first, second);

        let err = h.sessions.revoke(uuid::Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_list_and_revoke_all() {
        let h = harness().await;
        let older = h.sessions.create(h.user_id, None).await.unwrap();
        h.clock.advance(Duration::seconds(1));
        let newer = h.sessions.create(h.user_id, None).await.unwrap();
        h.clock.advance(Duration::seconds(1));
        let gone = h.sessions.create(h.user_id, None).await.unwrap();
        h.sessions.revoke(gone.id).await.unwrap();

        let active = h.sessions.list_for_user(h.user_id, false).await.unwrap();
        let ids: Vec<_> = active.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);

        let all = h.sessions.list_for_user(h.user_id, true).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].id, gone.id);

        assert_eq!(h.sessions.revoke_all_for_user(h.user_id).await.unwrap(), 2);
        assert_eq!(h.sessions.revoke_all_for_user(h.user_id).await.unwrap(), 0);
        assert!(
            h.sessions
                .list_for_user(h.user_id, false)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_open_issues_first_token() {
        let h = harness().await;
        let (session, issued) = h.sessions.open(h.user_id, Some("jkt")).await.unwrap();
        assert_eq!(issued.record.session_id, session.id);
        assert_eq!(issued.record.expires_at, h.clock.now() + Duration::hours(1));
        assert!(h.tokens.is_current_and_valid(&issued.opaque).await.unwrap());
    }
}
