//! Results of the atomic token writes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::model::RefreshToken;
use crate::session::AuthSession;

/// A committed issuance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenIssue {
    /// The newly inserted current token.
    pub token: RefreshToken,
    /// The previously current token revoked to make room, if any.
    pub superseded: Option<Uuid>,
}

/// A committed rotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRotation {
    /// The consumed token, now carrying `used_at` and `replaced_by`.
    pub previous: RefreshToken,
    /// The newly inserted current token.
    pub replacement: RefreshToken,
    /// The owning session after its `last_used_at` was refreshed.
    pub session: AuthSession,
}
