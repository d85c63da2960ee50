//! Refresh-token entity model.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use authvault_core::error::AppError;
use authvault_core::result::AppResult;

use super::state::TokenState;

/// One issued refresh token. Rows are kept after rotation so the chain of
/// `replaced_by` pointers forms an audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct RefreshToken {
    /// Unique token row identifier.
    pub id: Uuid,
    /// The session this token belongs to.
    pub session_id: Uuid,
    /// SHA-256 digest of the opaque token value.
    #[serde(skip_serializing)]
    pub token_hash: Vec<u8>,
    /// When the token was issued.
    pub issued_at: DateTime<Utc>,
    /// When the token stops being accepted.
    pub expires_at: DateTime<Utc>,
    /// When the token was consumed by a rotation.
    pub used_at: Option<DateTime<Utc>>,
    /// When the token was revoked.
    pub revoked_at: Option<DateTime<Utc>>,
    /// The token that superseded this one on rotation.
    pub replaced_by: Option<Uuid>,
}

impl RefreshToken {
    /// Build a fresh current token row.
    ///
    /// Fails with `Validation` when `now + ttl` is not a representable
    /// timestamp.
    pub fn new(
        session_id: Uuid,
        token_hash: Vec<u8>,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> AppResult<Self> {
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| AppError::validation("Token lifetime is out of range"))?;
        Ok(Self {
            id: Uuid::new_v4(),
            session_id,
            token_hash,
            issued_at: now,
            expires_at,
            used_at: None,
            revoked_at: None,
            replaced_by: None,
        })
    }

    /// Neither revoked nor replaced. Expiry is not considered, matching the
    /// partial unique index.
    pub fn is_current(&self) -> bool {
        self.revoked_at.is_none() && self.replaced_by.is_none()
    }

    /// Whether the token has been consumed, revoked or replaced.
    pub fn is_spent(&self) -> bool {
        self.used_at.is_some() || self.revoked_at.is_some() || self.replaced_by.is_some()
    }

    /// Whether `expires_at` has passed at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Lifecycle state at `now`.
    pub fn state_at(&self, now: DateTime<Utc>) -> TokenState {
        if self.revoked_at.is_some() {
            TokenState::Revoked
        } else if self.used_at.is_some() || self.replaced_by.is_some() {
            TokenState::Used
        } else if self.is_expired_at(now) {
            TokenState::Expired
        } else {
            TokenState::Current
        }
    }
}

/// A freshly issued token together with its one-time opaque value.
///
/// The opaque value is never stored; callers must hand it to the client
/// immediately.
#[derive(Debug, Clone)]
pub struct IssuedRefreshToken {
    /// The value the client presents on rotation.
    pub opaque: String,
    /// The stored row.
    pub record: RefreshToken,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(now: DateTime<Utc>) -> RefreshToken {
        RefreshToken::new(Uuid::new_v4(), vec![0xab; 32], now, Duration::hours(1)).unwrap()
    }

    #[test]
    fn test_unrepresentable_expiry_is_rejected() {
        let err = RefreshToken::new(
            Uuid::new_v4(),
            vec![0xab; 32],
            Utc::now(),
            Duration::days(100_000_000),
        )
        .unwrap_err();
        assert_eq!(err.kind, authvault_core::ErrorKind::Validation);
    }

    #[test]
    fn test_fresh_token_is_current() {
        let now = Utc::now();
        let t = token(now);
        assert!(t.is_current());
        assert!(!t.is_spent());
        assert_eq!(t.state_at(now), TokenState::Current);
        assert_eq!(t.expires_at, now + Duration::hours(1));
    }

    #[test]
    fn test_state_precedence() {
        let now = Utc::now();
        let later = now + Duration::hours(2);

        let mut t = token(now);
        assert_eq!(t.state_at(later), TokenState::Expired);

        t.used_at = Some(now);
        t.replaced_by = Some(Uuid::new_v4());
        assert_eq!(t.state_at(later), TokenState::Used);
        assert!(!t.is_current());

        t.revoked_at = Some(now);
        assert_eq!(t.state_at(now), TokenState::Revoked);
        assert!(t.state_at(now).is_terminal());
    }
}
