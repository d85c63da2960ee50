//! Auth session repository implementation.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::debug;
use uuid::Uuid;

use authvault_core::error::AppError;
use authvault_core::result::AppResult;
use authvault_entity::session::AuthSession;

use crate::error::classify;

/// Repository for the `auth_sessions` table.
#[derive(Debug, Clone)]
pub struct AuthSessionRepository {
    pool: PgPool,
}

impl AuthSessionRepository {
    /// Create a new auth session repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a session row. An unknown user yields `NotFound`.
    pub async fn create(&self, session: &AuthSession) -> AppResult<AuthSession> {
        sqlx::query_as::<_, AuthSession>(
            "INSERT INTO auth_sessions (id, user_id, dpop_jkt, created_at, last_used_at, revoked_at) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(&session.dpop_jkt)
        .bind(session.created_at)
        .bind(session.last_used_at)
        .bind(session.revoked_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            let err = classify("Failed to create session", e);
            if err.is(authvault_core::ErrorKind::NotFound) {
                AppError::not_found(format!("User {} not found", session.user_id))
            } else {
                err
            }
        })
    }

    /// Find a session by id.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<AuthSession>> {
        sqlx::query_as::<_, AuthSession>("SELECT * FROM auth_sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify("Failed to find session", e))
    }

    /// A user's sessions, newest first.
    pub async fn list_by_user(
        &self,
        user_id: Uuid,
        include_revoked: bool,
    ) -> AppResult<Vec<AuthSession>> {
        sqlx::query_as::<_, AuthSession>(
            "SELECT * FROM auth_sessions \
             WHERE user_id = $1 AND ($2 OR revoked_at IS NULL) \
             ORDER BY created_at DESC, id",
        )
        .bind(user_id)
        .bind(include_revoked)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| classify("Failed to list sessions", e))
    }

    /// Bind a key thumbprint once. Re-binding the same value succeeds.
    pub async fn bind_thumbprint(&self, id: Uuid, jkt: &str) -> AppResult<AuthSession> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| classify("Failed to begin transaction", e))?;

        let session = lock_session(&mut tx, id).await?;
        if session.is_revoked() {
            return Err(AppError::session_revoked(format!("Session {id} is revoked")));
        }

        let bound = match session.dpop_jkt.as_deref() {
            Some(existing) if existing == jkt => session,
            Some(_) => {
                return Err(AppError::already_bound(format!(
                    "Session {id} is bound to a different key"
                )));
            }
            None => sqlx::query_as::<_, AuthSession>(
                "UPDATE auth_sessions SET dpop_jkt = $2 WHERE id = $1 RETURNING *",
            )
            .bind(id)
            .bind(jkt)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| classify("Failed to bind thumbprint", e))?,
        };

        tx.commit()
            .await
            .map_err(|e| classify("Failed to commit thumbprint binding", e))?;
        Ok(bound)
    }

    /// Record activity on an active session.
    pub async fn touch(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE auth_sessions SET last_used_at = $2 WHERE id = $1 AND revoked_at IS NULL",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| classify("Failed to touch session", e))?;

        if result.rows_affected() == 0 {
            return match self.find_by_id(id).await? {
                Some(_) => Err(AppError::session_revoked(format!("Session {id} is revoked"))),
                None => Err(AppError::not_found(format!("Session {id} not found"))),
            };
        }
        Ok(())
    }

    /// Revoke a session, keeping the first revocation time on repeats.
    pub async fn revoke(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<AuthSession> {
        sqlx::query_as::<_, AuthSession>(
            "UPDATE auth_sessions SET revoked_at = COALESCE(revoked_at, $2) \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| classify("Failed to revoke session", e))?
        .ok_or_else(|| AppError::not_found(format!("Session {id} not found")))
    }

    /// Revoke every active session of a user. Returns how many changed.
    pub async fn revoke_all_for_user(&self, user_id: Uuid, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE auth_sessions SET revoked_at = $2 WHERE user_id = $1 AND revoked_at IS NULL",
        )
        .bind(user_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| classify("Failed to revoke user sessions", e))?;

        debug!(user_id = %user_id, count = result.rows_affected(), "Revoked user sessions");
        Ok(result.rows_affected())
    }
}

/// Lock a session row for the rest of the transaction.
pub(crate) async fn lock_session(conn: &mut PgConnection, id: Uuid) -> AppResult<AuthSession> {
    sqlx::query_as::<_, AuthSession>("SELECT * FROM auth_sessions WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_err(|e| classify("Failed to lock session", e))?
        .ok_or_else(|| AppError::not_found(format!("Session {id} not found")))
}
