//! Refresh-token repository implementation.
//!
//! Issuance and rotation each run in one transaction that locks the owning
//! session row first and the token row second. Every writer that touches
//! more than one token of a session follows that order.

use chrono::{DateTime, Duration, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use authvault_core::config::IssuancePolicy;
use authvault_core::error::AppError;
use authvault_core::result::AppResult;
use authvault_entity::session::AuthSession;
use authvault_entity::token::{RefreshToken, TokenIssue, TokenRotation};

use super::auth_session::lock_session;
use crate::error::classify;

/// Repository for the `refresh_tokens` table.
#[derive(Debug, Clone)]
pub struct RefreshTokenRepository {
    pool: PgPool,
}

impl RefreshTokenRepository {
    /// Create a new refresh-token repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert `token` as the session's current token.
    ///
    /// An existing current token is either reported as `TokenAlreadyCurrent`
    /// or revoked in the same transaction, depending on `policy`.
    pub async fn issue(
        &self,
        token: &RefreshToken,
        policy: IssuancePolicy,
        now: DateTime<Utc>,
    ) -> AppResult<TokenIssue> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| classify("Failed to begin transaction", e))?;

        let session = lock_session(&mut tx, token.session_id).await?;
        if session.is_revoked() {
            return Err(AppError::session_revoked(format!(
                "Session {} is revoked",
                session.id
            )));
        }

        let existing: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM refresh_tokens \
             WHERE session_id = $1 AND revoked_at IS NULL AND replaced_by IS NULL \
             FOR UPDATE",
        )
        .bind(session.id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| classify("Failed to look up current token", e))?;

        let superseded = match (existing, policy) {
            (None, _) => None,
            (Some(current), IssuancePolicy::Reject) => {
                return Err(AppError::token_already_current(format!(
                    "Session {} already holds current token {current}",
                    session.id
                )));
            }
            (Some(current), IssuancePolicy::Supersede) => {
                sqlx::query("UPDATE refresh_tokens SET revoked_at = $2 WHERE id = $1")
                    .bind(current)
                    .bind(now)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| classify("Failed to supersede current token", e))?;
                Some(current)
            }
        };

        let inserted = insert_token(&mut tx, token).await?;

        tx.commit()
            .await
            .map_err(|e| classify("Failed to commit token issuance", e))?;

        Ok(TokenIssue {
            token: inserted,
            superseded,
        })
    }

    /// Exchange the token hashed as `presented` for a new one hashed as
    /// `replacement_hash`.
    ///
    /// A presented token that is no longer current triggers replay handling:
    /// the session and all of its unrevoked tokens are revoked and committed
    /// before `ReplayDetected` is returned.
    pub async fn rotate(
        &self,
        presented: &[u8],
        replacement_hash: Vec<u8>,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> AppResult<TokenRotation> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| classify("Failed to begin transaction", e))?;

        let session_id: Uuid =
            sqlx::query_scalar("SELECT session_id FROM refresh_tokens WHERE token_hash = $1")
                .bind(presented)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| classify("Failed to find refresh token", e))?
                .ok_or_else(|| AppError::invalid_token("Unknown refresh token"))?;

        let session = lock_session(&mut tx, session_id).await?;

        // Re-read under lock: a concurrent rotation may have consumed it.
        let token = sqlx::query_as::<_, RefreshToken>(
            "SELECT * FROM refresh_tokens WHERE token_hash = $1 FOR UPDATE",
        )
        .bind(presented)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| classify("Failed to lock refresh token", e))?
        .ok_or_else(|| AppError::invalid_token("Unknown refresh token"))?;

        if session.is_revoked() {
            return Err(AppError::session_revoked(format!(
                "Session {session_id} is revoked"
            )));
        }

        if token.is_spent() {
            let revoked = revoke_session_family(&mut tx, session_id, now).await?;
            tx.commit()
                .await
                .map_err(|e| classify("Failed to commit replay revocation", e))?;
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

        let next = RefreshToken::new(session_id, replacement_hash, now, ttl)?;

        // The old row leaves the current set before the new one enters it.
        let previous = sqlx::query_as::<_, RefreshToken>(
            "UPDATE refresh_tokens SET used_at = $2, replaced_by = $3 WHERE id = $1 RETURNING *",
        )
        .bind(token.id)
        .bind(now)
        .bind(next.id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| classify("Failed to consume refresh token", e))?;

        let replacement = insert_token(&mut tx, &next).await?;

        let session = sqlx::query_as::<_, AuthSession>(
            "UPDATE auth_sessions SET last_used_at = $2 WHERE id = $1 RETURNING *",
        )
        .bind(session_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| classify("Failed to touch session", e))?;

        tx.commit()
            .await
            .map_err(|e| classify("Failed to commit rotation", e))?;

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

    /// Revoke one token without issuing a replacement. Repeats keep the
    /// first revocation time.
    pub async fn revoke_by_hash(
        &self,
        token_hash: &[u8],
        now: DateTime<Utc>,
    ) -> AppResult<RefreshToken> {
        sqlx::query_as::<_, RefreshToken>(
            "UPDATE refresh_tokens SET revoked_at = COALESCE(revoked_at, $2) \
             WHERE token_hash = $1 RETURNING *",
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| classify("Failed to revoke refresh token", e))?
        .ok_or_else(|| AppError::invalid_token("Unknown refresh token"))
    }

    /// Find a token by hash.
    pub async fn find_by_hash(&self, token_hash: &[u8]) -> AppResult<Option<RefreshToken>> {
        sqlx::query_as::<_, RefreshToken>("SELECT * FROM refresh_tokens WHERE token_hash = $1")
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify("Failed to find refresh token", e))
    }

    /// Whether the hash names a usable token of an active session at `now`.
    pub async fn is_current_and_valid(
        &self,
        token_hash: &[u8],
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        sqlx::query_scalar(
            "SELECT EXISTS ( \
                SELECT 1 FROM refresh_tokens t \
                JOIN auth_sessions s ON s.id = t.session_id \
                WHERE t.token_hash = $1 \
                  AND t.used_at IS NULL AND t.revoked_at IS NULL AND t.replaced_by IS NULL \
                  AND t.expires_at > $2 \
                  AND s.revoked_at IS NULL)",
        )
        .bind(token_hash)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify("Failed to check refresh token", e))
    }

    /// All tokens of a session in issue order.
    pub async fn list_by_session(&self, session_id: Uuid) -> AppResult<Vec<RefreshToken>> {
        sqlx::query_as::<_, RefreshToken>(
            "SELECT * FROM refresh_tokens WHERE session_id = $1 ORDER BY issued_at, id",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| classify("Failed to list session tokens", e))
    }

    /// Delete up to `limit` non-current tokens that expired before `cutoff`
    /// and that no other row points at through `replaced_by`.
    ///
    /// One call removes one generation from the old end of each chain. Rows
    /// locked by a concurrent rotation or replay are skipped until a later pass.
    pub async fn purge_expired(&self, cutoff: DateTime<Utc>, limit: i64) -> AppResult<u64> {
        let result = sqlx::query(
            "DELETE FROM refresh_tokens WHERE id IN ( \
                SELECT t.id FROM refresh_tokens t \
                WHERE t.expires_at < $1 \
                  AND (t.revoked_at IS NOT NULL OR t.replaced_by IS NOT NULL) \
                  AND NOT EXISTS (SELECT 1 FROM refresh_tokens r WHERE r.replaced_by = t.id) \
                ORDER BY t.expires_at \
                LIMIT $2 \
                FOR UPDATE OF t SKIP LOCKED)",
        )
        .bind(cutoff)
        .bind(limit)
        .execute(&self.pool)
        .await
        .map_err(|e| classify("Failed to purge expired refresh tokens", e))?;

        if result.rows_affected() > 0 {
            info!(
                deleted = result.rows_affected(),
                cutoff = %cutoff,
                "Purged expired refresh tokens"
            );
        }
        Ok(result.rows_affected())
    }
}

async fn insert_token(conn: &mut PgConnection, token: &RefreshToken) -> AppResult<RefreshToken> {
    sqlx::query_as::<_, RefreshToken>(
        "INSERT INTO refresh_tokens \
         (id, session_id, token_hash, issued_at, expires_at, used_at, revoked_at, replaced_by) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
    )
    .bind(token.id)
    .bind(token.session_id)
    .bind(&token.token_hash)
    .bind(token.issued_at)
    .bind(token.expires_at)
    .bind(token.used_at)
    .bind(token.revoked_at)
    .bind(token.replaced_by)
    .fetch_one(conn)
    .await
    .map_err(|e| classify("Failed to insert refresh token", e))
}

/// Revoke the session and every still-unrevoked token it owns.
async fn revoke_session_family(
    conn: &mut PgConnection,
    session_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<u64> {
    sqlx::query("UPDATE auth_sessions SET revoked_at = COALESCE(revoked_at, $2) WHERE id = $1")
        .bind(session_id)
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(|e| classify("Failed to revoke session", e))?;

    let result = sqlx::query(
        "UPDATE refresh_tokens SET revoked_at = $2 WHERE session_id = $1 AND revoked_at IS NULL",
    )
    .bind(session_id)
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(|e| classify("Failed to revoke session tokens", e))?;

    Ok(result.rows_affected())
}
