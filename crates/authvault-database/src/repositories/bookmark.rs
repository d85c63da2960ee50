//! Bookmark repository implementation.

use sqlx::PgPool;
use uuid::Uuid;

use authvault_core::result::AppResult;
use authvault_entity::bookmark::Bookmark;

use crate::error::classify;

/// Repository for user bookmarks.
#[derive(Debug, Clone)]
pub struct BookmarkRepository {
    pool: PgPool,
}

impl BookmarkRepository {
    /// Create a new bookmark repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Bookmark a post. Duplicates yield `Conflict`, unknown ids `NotFound`.
    pub async fn add(&self, user_id: Uuid, post_id: i64) -> AppResult<Bookmark> {
        sqlx::query_as::<_, Bookmark>(
            r#"INSERT INTO bookmarks ("userId", "postId") VALUES ($1, $2)
               RETURNING "bookmarkId", "userId", "postId", "createdAt""#,
        )
        .bind(user_id)
        .bind(post_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify("Failed to add bookmark", e))
    }

    /// Remove a bookmark. Returns whether one existed.
    pub async fn remove(&self, user_id: Uuid, post_id: i64) -> AppResult<bool> {
        let result = sqlx::query(r#"DELETE FROM bookmarks WHERE "userId" = $1 AND "postId" = $2"#)
            .bind(user_id)
            .bind(post_id)
            .execute(&self.pool)
            .await
            .map_err(|e| classify("Failed to remove bookmark", e))?;
        Ok(result.rows_affected() > 0)
    }

    /// A user's bookmarks, newest first.
    pub async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<Bookmark>> {
        sqlx::query_as::<_, Bookmark>(
            r#"SELECT "bookmarkId", "userId", "postId", "createdAt"
               FROM bookmarks WHERE "userId" = $1
               ORDER BY "createdAt" DESC, "bookmarkId" DESC"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| classify("Failed to list bookmarks", e))
    }
}
