//! Refresh-token rotation engine.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use authvault_core::config::TokenConfig;
use authvault_core::error::{AppError, ErrorKind};
use authvault_core::result::AppResult;
use authvault_core::traits::Clock;
use authvault_entity::token::{IssuedRefreshToken, RefreshToken, TokenState};

use super::codec::{fingerprint, generate_opaque_token, hash_token};
use crate::store::AuthStore;

/// A successful rotation: the new opaque value plus the context an
/// access-token minter needs.
#[derive(Debug, Clone)]
pub struct RotatedToken {
    /// The value to hand back to the client. Shown once.
    pub opaque: String,
    /// The new current token row.
    pub record: RefreshToken,
    /// The row that was consumed.
    pub previous_id: Uuid,
    /// Owner of the session.
    pub user_id: Uuid,
    /// The session the token belongs to.
    pub session_id: Uuid,
    /// Key thumbprint bound to the session, if any.
    pub dpop_jkt: Option<String>,
}

/// Read-only view of a presented token.
#[derive(Debug, Clone, Serialize)]
pub struct TokenStatus {
    /// The stored row.
    pub token: RefreshToken,
    /// Lifecycle state at the time of inspection.
    pub state: TokenState,
    /// Whether the owning session has been revoked.
    pub session_revoked: bool,
}

impl TokenStatus {
    /// Whether a rotation with this token would currently succeed.
    pub fn is_usable(&self) -> bool {
        self.state == TokenState::Current && !self.session_revoked
    }
}

/// Issues, rotates and revokes opaque refresh tokens.
#[derive(Clone)]
pub struct RefreshTokenService {
    store: Arc<dyn AuthStore>,
    clock: Arc<dyn Clock>,
    config: TokenConfig,
}

impl std::fmt::Debug for RefreshTokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshTokenService")
            .field("config", &self.config)
            .finish()
    }
}

impl RefreshTokenService {
    /// Creates a new rotation engine.
    pub fn new(store: Arc<dyn AuthStore>, clock: Arc<dyn Clock>, config: TokenConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// Token settings in effect.
    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// Issue a token with the configured lifetime.
    pub async fn issue_default(&self, session_id: Uuid) -> AppResult<IssuedRefreshToken> {
        self.issue(session_id, self.config.refresh_ttl()?).await
    }

    /// Issue a new current token for `session_id` valid for `ttl`.
    ///
    /// A hash collision is retried with fresh randomness up to
    /// `max_issue_attempts` times before `ConstraintViolation` is returned.
    pub async fn issue(&self, session_id: Uuid, ttl: Duration) -> AppResult<IssuedRefreshToken> {
        if ttl <= Duration::zero() {
            return Err(AppError::validation("Token lifetime must be positive"));
        }

        let mut attempt = 1;
        loop {
            let opaque = generate_opaque_token();
            let now = self.clock.now();
            let token = RefreshToken::new(session_id, hash_token(&opaque), now, ttl)?;

            match self
                .store
                .issue_token(&token, self.config.issuance_policy, now)
                .await
            {
                Ok(issued) => {
                    if let Some(superseded) = issued.superseded {
                        info!(
                            session_id = %session_id,
                            superseded = %superseded,
                            "Superseded current refresh token"
                        );
                    }
                    info!(
                        session_id = %session_id,
                        token_id = %issued.token.id,
                        expires_at = %issued.token.expires_at,
                        "Issued refresh token"
                    );
                    return Ok(IssuedRefreshToken {
                        opaque,
                        record: issued.token,
                    });
                }
                Err(e) if self.should_retry(&e, attempt) => {
                    warn!(session_id = %session_id, attempt, "Token hash collision, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Exchange a current token for a new one.
    ///
    /// Presenting a consumed or revoked token revokes the whole session and
    /// fails with `ReplayDetected`.
    pub async fn rotate(&self, opaque: &str) -> AppResult<RotatedToken> {
        let presented = presented_hash(opaque)?;
        let ttl = self.config.refresh_ttl()?;

        let mut attempt = 1;
        loop {
            let next = generate_opaque_token();
            let now = self.clock.now();

            match self
                .store
                .rotate_token(&presented, hash_token(&next), now, ttl)
                .await
            {
                Ok(rotation) => {
                    info!(
                        session_id = %rotation.session.id,
                        user_id = %rotation.session.user_id,
                        previous = %rotation.previous.id,
                        token_id = %rotation.replacement.id,
                        "Rotated refresh token"
                    );
                    return Ok(RotatedToken {
                        opaque: next,
                        previous_id: rotation.previous.id,
                        user_id: rotation.session.user_id,
                        session_id: rotation.session.id,
                        dpop_jkt: rotation.session.dpop_jkt,
                        record: rotation.replacement,
                    });
                }
                Err(e) if self.should_retry(&e, attempt) => {
                    warn!(attempt, "Replacement token hash collision, retrying");
                    attempt += 1;
                }
                Err(e) => {
                    debug!(
                        token = %fingerprint(&presented),
                        kind = %e.kind,
                        "Rotation rejected"
                    );
                    return Err(e);
                }
            }
        }
    }

    /// Revoke a token without issuing a replacement. Idempotent.
    pub async fn revoke(&self, opaque: &str) -> AppResult<()> {
        let hash = presented_hash(opaque)?;
        let token = self.store.revoke_token(&hash, self.clock.now()).await?;
        info!(
            session_id = %token.session_id,
            token_id = %token.id,
            "Revoked refresh token"
        );
        Ok(())
    }

    /// Whether the token is current, unexpired, and its session active.
    pub async fn is_current_and_valid(&self, opaque: &str) -> AppResult<bool> {
        if opaque.trim().is_empty() {
            return Ok(false);
        }
        self.store
            .is_current_and_valid(&hash_token(opaque), self.clock.now())
            .await
    }

    /// Describe a presented token without changing anything.
    pub async fn inspect(&self, opaque: &str) -> AppResult<TokenStatus> {
        let hash = presented_hash(opaque)?;
        let token = self
            .store
            .find_token(&hash)
            .await?
            .ok_or_else(|| AppError::invalid_token("Unknown refresh token"))?;
        let session_revoked = self
            .store
            .find_session(token.session_id)
            .await?
            .is_none_or(|s| s.is_revoked());

        Ok(TokenStatus {
            state: token.state_at(self.clock.now()),
            session_revoked,
            token,
        })
    }

    /// The session's tokens ordered along their `replaced_by` links.
    ///
    /// Each chain starts at a token nothing points to. A session that used
    /// superseding issuance can have several chains; they are returned one
    /// after another, oldest first.
    pub async fn chain(&self, session_id: Uuid) -> AppResult<Vec<RefreshToken>> {
        if self.store.find_session(session_id).await?.is_none() {
            return Err(AppError::not_found(format!("Session {session_id} not found")));
        }
        let tokens = self.store.session_tokens(session_id).await?;
        Ok(order_chain(tokens))
    }

    fn should_retry(&self, err: &AppError, attempt: u32) -> bool {
        err.kind == ErrorKind::ConstraintViolation && attempt < self.config.max_issue_attempts
    }
}

fn presented_hash(opaque: &str) -> AppResult<Vec<u8>> {
    if opaque.trim().is_empty() {
        return Err(AppError::invalid_token("Refresh token is empty"));
    }
    Ok(hash_token(opaque))
}

/// Walk `replaced_by` from every head. `tokens` must be in issue order.
fn order_chain(tokens: Vec<RefreshToken>) -> Vec<RefreshToken> {
    let referenced: HashSet<Uuid> = tokens.iter().filter_map(|t| t.replaced_by).collect();
    let heads: Vec<Uuid> = tokens
        .iter()
        .filter(|t| !referenced.contains(&t.id))
        .map(|t| t.id)
        .collect();
    let mut by_id: HashMap<Uuid, RefreshToken> = tokens.into_iter().map(|t| (t.id, t)).collect();

    let mut ordered = Vec::with_capacity(by_id.len());
    for head in heads {
        let mut cursor = Some(head);
        while let Some(id) = cursor {
            // Removing as we go also stops on any malformed loop.
            let Some(token) = by_id.remove(&id) else {
                break;
            };
            cursor = token.replaced_by;
            ordered.push(token);
        }
    }
    ordered
}
