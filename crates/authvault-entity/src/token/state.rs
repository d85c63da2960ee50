//! Derived refresh-token lifecycle state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a refresh token sits in its lifecycle.
///
/// `Current` is the only non-terminal state. `Expired` is detected lazily by
/// comparing `expires_at` against the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenState {
    /// Unused, unrevoked, unexpired.
    Current,
    /// Consumed by a rotation.
    Used,
    /// Revoked explicitly or by replay detection.
    Revoked,
    /// Past `expires_at` without having been consumed or revoked.
    Expired,
}

impl TokenState {
    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Current)
    }
}

impl fmt::Display for TokenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Current => write!(f, "current"),
            Self::Used => write!(f, "used"),
            Self::Revoked => write!(f, "revoked"),
            Self::Expired => write!(f, "expired"),
        }
    }
}
