//! In-memory [`AuthStore`] for tests and single-process embedding.
//!
//! Every operation runs inside one critical section of a Tokio mutex, which
//! gives the same atomicity the PostgreSQL backend gets from transactions.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use authvault_core::config::IssuancePolicy;
use authvault_core::error::AppError;
use authvault_core::result::AppResult;
use authvault_entity::session::AuthSession;
use authvault_entity::token::{RefreshToken, TokenIssue, TokenRotation};

use super::AuthStore;

#[derive(Debug, Default)]
struct InnerState {
    users: HashSet<Uuid>,
    sessions: HashMap<Uuid, AuthSession>,
    tokens: HashMap<Uuid, RefreshToken>,
    by_hash: HashMap<Vec<u8>, Uuid>,
}

impl InnerState {
    fn session(&self, id: Uuid) -> AppResult<&AuthSession> {
        self.sessions
            .get(&id)
            .ok_or_else(|| AppError::not_found(format!("Session {id} not found")))
    }

    fn current_token_of(&self, session_id: Uuid) -> Option<Uuid> {
        self.tokens
            .values()
            .find(|t| t.session_id == session_id && t.is_current())
            .map(|t| t.id)
    }

    fn insert_token(&mut self, token: RefreshToken) -> AppResult<RefreshToken> {
        if self.by_hash.contains_key(&token.token_hash) {
            return Err(AppError::constraint_violation("Refresh token hash collision"));
        }
        if token.is_current() && self.current_token_of(token.session_id).is_some() {
            return Err(AppError::token_already_current(format!(
                "Session {} already holds a current token",
                token.session_id
            )));
        }
        self.by_hash.insert(token.token_hash.clone(), token.id);
        self.tokens.insert(token.id, token.clone());
        Ok(token)
    }

    fn token_by_hash(&self, hash: &[u8]) -> Option<&RefreshToken> {
        self.by_hash.get(hash).and_then(|id| self.tokens.get(id))
    }
}

/// Store holding all rows in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuthStore {
    state: Arc<Mutex<InnerState>>,
}

impl MemoryAuthStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user id so sessions can reference it.
    pub async fn add_user(&self, user_id: Uuid) {
        self.state.lock().await.users.insert(user_id);
    }

    /// Drop a user together with its sessions and their tokens.
    pub async fn remove_user(&self, user_id: Uuid) -> bool {
        let mut state = self.state.lock().await;
        if !state.users.remove(&user_id) {
            return false;
        }
        let sessions: HashSet<Uuid> = state
            .sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .map(|s| s.id)
            .collect();
        state.sessions.retain(|id, _| !sessions.contains(id));
        let doomed: Vec<(Uuid, Vec<u8>)> = state
            .tokens
            .values()
            .filter(|t| sessions.contains(&t.session_id))
            .map(|t| (t.id, t.token_hash.clone()))
            .collect();
        for (id, hash) in doomed {
            state.tokens.remove(&id);
            state.by_hash.remove(&hash);
        }
        true
    }

    /// Number of stored token rows.
    pub async fn token_count(&self) -> usize {
        self.state.lock().await.tokens.len()
    }
}

#[async_trait]
impl AuthStore for MemoryAuthStore {
    async fn create_session(&self, session: &AuthSession) -> AppResult<AuthSession> {
        let mut state = self.state.lock().await;
        if !state.users.contains(&session.user_id) {
            return Err(AppError::not_found(format!(
                "User {} not found",
                session.user_id
            )));
        }
        if state.sessions.contains_key(&session.id) {
            return Err(AppError::conflict(format!(
                "Session {} already exists",
                session.id
            )));
        }
        state.sessions.insert(session.id, session.clone());
        Ok(session.clone())
    }

    async fn find_session(&self, id: Uuid) -> AppResult<Option<AuthSession>> {
        Ok(self.state.lock().await.sessions.get(&id).cloned())
    }

    async fn list_user_sessions(
        &self,
        user_id: Uuid,
        include_revoked: bool,
    ) -> AppResult<Vec<AuthSession>> {
        let state = self.state.lock().await;
        let mut sessions: Vec<AuthSession> = state
            .sessions
            .values()
            .filter(|s| s.user_id == user_id && (include_revoked || !s.is_revoked()))
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(sessions)
    }

    async fn bind_thumbprint(&self, id: Uuid, jkt: &str) -> AppResult<AuthSession> {
        let mut state = self.state.lock().await;
        let session = state
            .sessions
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Session {id} not found")))?;
        if session.is_revoked() {
            return Err(AppError::session_revoked(format!("Session {id} is revoked")));
        }
        match session.dpop_jkt.as_deref() {
            Some(existing) if existing == jkt => {}
            Some(_) => {
                return Err(AppError::already_bound(format!(
                    "Session {id} is bound to a different key"
                )));
            }
            None => session.dpop_jkt = Some(jkt.to_string()),
        }
        Ok(session.clone())
    }

    async fn touch_session(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let session = state
            .sessions
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Session {id} not found")))?;
        if session.is_revoked() {
            return Err(AppError::session_revoked(format!("Session {id} is revoked")));
        }
        session.last_used_at = Some(now);
        Ok(())
    }

    async fn revoke_session(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<AuthSession> {
        let mut state = self.state.lock().await;
        let session = state
            .sessions
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Session {id} not found")))?;
        session.revoked_at.get_or_insert(now);
        Ok(session.clone())
    }

    async fn revoke_user_sessions(&self, user_id: Uuid, now: DateTime<Utc>) -> AppResult<u64> {
        let mut state = self.state.lock().await;
        let mut count = 0;
        for session in state.sessions.values_mut() {
            if session.user_id == user_id && !session.is_revoked() {
                session.revoked_at = Some(now);
                count += 1;
            }
        }
        Ok(count)
    }

    async fn issue_token(
        &self,
        token: &RefreshToken,
        policy: IssuancePolicy,
        now: DateTime<Utc>,
    ) -> AppResult<TokenIssue> {
        let mut state = self.state.lock().await;
        let session = state.session(token.session_id)?;
        if session.is_revoked() {
            return Err(AppError::session_revoked(format!(
                "Session {} is revoked",
                session.id
            )));
        }
        if state.by_hash.contains_key(&token.token_hash) {
            return Err(AppError::constraint_violation("Refresh token hash collision"));
        }

        let superseded = match (state.current_token_of(token.session_id), policy) {
            (None, _) => None,
            (Some(current), IssuancePolicy::Reject) => {
                return Err(AppError::token_already_current(format!(
                    "Session {} already holds current token {current}",
                    token.session_id
                )));
            }
            (Some(current), IssuancePolicy::Supersede) => {
                if let Some(existing) = state.tokens.get_mut(&current) {
                    existing.revoked_at = Some(now);
                }
                Some(current)
            }
        };

        let inserted = state.insert_token(token.clone())?;
        Ok(TokenIssue {
            token: inserted,
            superseded,
        })
    }

    async fn rotate_token(
        &self,
        presented: &[u8],
        replacement_hash: Vec<u8>,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> AppResult<TokenRotation> {
        let mut state = self.state.lock().await;
        let token = state
            .token_by_hash(presented)
            .cloned()
            .ok_or_else(|| AppError::invalid_token("Unknown refresh token"))?;
        let session_id = token.session_id;

        if state.session(session_id)?.is_revoked() {
            return Err(AppError::session_revoked(format!(
                "Session {session_id} is revoked"
            )));
        }

        if token.is_spent() {
            if let Some(session) = state.sessions.get_mut(&session_id) {
                session.revoked_at.get_or_insert(now);
            }
            let mut revoked = 0u64;
            for t in state.tokens.values_mut() {
                if t.session_id == session_id && t.revoked_at.is_none() {
                    t.revoked_at = Some(now);
                    revoked += 1;
                }
            }
            warn!(
                session_id = %session_id,
                token_id = %token.id,
                revoked_tokens = revoked,
                "Refresh token replay detected, session revoked"
            );
            return Err(AppError::replay_detected(format!(
                "Refresh token {} was already used; session {session_id} revoked",
                token.id
            )));
        }

        if token.is_expired_at(now) {
            return Err(AppError::token_expired(format!(
                "Refresh token {} expired at {}",
                token.id, token.expires_at
            )));
        }

        if state.by_hash.contains_key(&replacement_hash) {
            return Err(AppError::constraint_violation("Refresh token hash collision"));
        }

        let next = RefreshToken::new(session_id, replacement_hash, now, ttl)?;
        let previous = {
            let old = state
                .tokens
                .get_mut(&token.id)
                .ok_or_else(|| AppError::invalid_token("Unknown refresh token"))?;
            old.used_at = Some(now);
            old.replaced_by = Some(next.id);
            old.clone()
        };
        let replacement = state.insert_token(next)?;

        let session = state
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| AppError::not_found(format!("Session {session_id} not found")))?;
        session.last_used_at = Some(now);
        let session = session.clone();

        debug!(
            session_id = %session_id,
            previous = %previous.id,
            replacement = %replacement.id,
            "Rotated refresh token"
        );

        Ok(TokenRotation {
            previous,
            replacement,
            session,
        })
    }

    async fn revoke_token(&self, token_hash: &[u8], now: DateTime<Utc>) -> AppResult<RefreshToken> {
        let mut state = self.state.lock().await;
        let id = *state
            .by_hash
            .get(token_hash)
            .ok_or_else(|| AppError::invalid_token("Unknown refresh token"))?;
        let token = state
            .tokens
            .get_mut(&id)
            .ok_or_else(|| AppError::invalid_token("Unknown refresh token"))?;
        token.revoked_at.get_or_insert(now);
        Ok(token.clone())
    }

    async fn find_token(&self, token_hash: &[u8]) -> AppResult<Option<RefreshToken>> {
        Ok(self.state.lock().await.token_by_hash(token_hash).cloned())
    }

    async fn is_current_and_valid(
        &self,
        token_hash: &[u8],
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let state = self.state.lock().await;
        let Some(token) = state.token_by_hash(token_hash) else {
            return Ok(false);
        };
        let session_active = state
            .sessions
            .get(&token.session_id)
            .is_some_and(|s| !s.is_revoked());
        Ok(session_active && !token.is_spent() && !token.is_expired_at(now))
    }

    async fn session_tokens(&self, session_id: Uuid) -> AppResult<Vec<RefreshToken>> {
        let state = self.state.lock().await;
        let mut tokens: Vec<RefreshToken> = state
            .tokens
            .values()
            .filter(|t| t.session_id == session_id)
            .cloned()
            .collect();
        tokens.sort_by(|a, b| a.issued_at.cmp(&b.issued_at).then(a.id.cmp(&b.id)));
        Ok(tokens)
    }

    async fn purge_expired_tokens(&self, cutoff: DateTime<Utc>, limit: i64) -> AppResult<u64> {
        let mut state = self.state.lock().await;
        let referenced: HashSet<Uuid> = state.tokens.values().filter_map(|t| t.replaced_by).collect();

        let mut doomed: Vec<&RefreshToken> = state
            .tokens
            .values()
            .filter(|t| t.expires_at < cutoff && !t.is_current() && !referenced.contains(&t.id))
            .collect();
        doomed.sort_by_key(|t| t.expires_at);
        let doomed: Vec<(Uuid, Vec<u8>)> = doomed
            .into_iter()
            .take(usize::try_from(limit.max(0)).unwrap_or(usize::MAX))
            .map(|t| (t.id, t.token_hash.clone()))
            .collect();

        for (id, hash) in &doomed {
            state.tokens.remove(id);
            state.by_hash.remove(hash);
        }
        Ok(doomed.len() as u64)
    }
}
