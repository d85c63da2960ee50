//! Auth session entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One authenticated device, app, or browser context of a user.
///
/// A session is mutated only to bind its key thumbprint (once), to record
/// activity, or to revoke it. Revocation is permanent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct AuthSession {
    /// Unique session identifier.
    pub id: Uuid,
    /// The user this session belongs to.
    pub user_id: Uuid,
    /// DPoP key thumbprint bound to this session, if any.
    pub dpop_jkt: Option<String>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// Last successful token use.
    pub last_used_at: Option<DateTime<Utc>>,
    /// When the session was revoked.
    pub revoked_at: Option<DateTime<Utc>>,
}

impl AuthSession {
    /// Build a fresh, unrevoked session row.
    pub fn new(user_id: Uuid, dpop_jkt: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            dpop_jkt,
            created_at: now,
            last_used_at: None,
            revoked_at: None,
        }
    }

    /// Whether the session has been revoked.
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// Whether a key thumbprint is bound.
    pub fn is_bound(&self) -> bool {
        self.dpop_jkt.is_some()
    }
}
