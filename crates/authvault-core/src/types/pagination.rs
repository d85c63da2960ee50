//! Limit/offset pagination for list queries.

use serde::{Deserialize, Serialize};

/// Default page size.
const DEFAULT_LIMIT: i64 = 50;
/// Maximum page size.
const MAX_LIMIT: i64 = 500;

/// Request parameters for paginated queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Number of rows to return.
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// Number of rows to skip.
    #[serde(default)]
    pub offset: i64,
}

impl PageRequest {
    /// Create a page request, clamping the limit into `1..=MAX_LIMIT` and the
    /// offset to non-negative.
    pub fn new(limit: i64, offset: i64) -> Self {
        Self {
            limit: limit.clamp(1, MAX_LIMIT),
            offset: offset.max(0),
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}
