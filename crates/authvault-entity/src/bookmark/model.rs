//! Bookmark entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A user's bookmark of a post. Unique per (user, post).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Bookmark {
    /// Database-assigned identifier.
    #[sqlx(rename = "bookmarkId")]
    pub bookmark_id: i64,
    /// Owning user.
    #[sqlx(rename = "userId")]
    pub user_id: Uuid,
    /// Bookmarked post.
    #[sqlx(rename = "postId")]
    pub post_id: i64,
    /// When the bookmark was added.
    #[sqlx(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}
