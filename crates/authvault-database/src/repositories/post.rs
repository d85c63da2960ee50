//! Post repository implementation.

use sqlx::PgPool;
use validator::Validate;

use authvault_core::result::AppResult;
use authvault_core::types::PageRequest;
use authvault_entity::post::{CreatePost, Post, UpdatePost};

use crate::error::{classify, invalid_input};

const COLUMNS: &str = r#""postId", title, content, "authorId", "createdAt", "updatedAt""#;

/// Repository for post CRUD operations.
#[derive(Debug, Clone)]
pub struct PostRepository {
    pool: PgPool,
}

impl PostRepository {
    /// Create a new post repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List posts, newest first.
    pub async fn list(&self, page: PageRequest) -> AppResult<Vec<Post>> {
        sqlx::query_as::<_, Post>(&format!(
            r#"SELECT {COLUMNS} FROM posts ORDER BY "postId" DESC LIMIT $1 OFFSET $2"#
        ))
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| classify("Failed to list posts", e))
    }

    /// Insert a post. An unknown author yields `NotFound`.
    pub async fn create(&self, data: &CreatePost) -> AppResult<Post> {
        data.validate().map_err(invalid_input)?;

        sqlx::query_as::<_, Post>(&format!(
            r#"INSERT INTO posts (title, content, "authorId") VALUES ($1, $2, $3)
               RETURNING {COLUMNS}"#
        ))
        .bind(&data.title)
        .bind(&data.content)
        .bind(data.author_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify("Failed to create post", e))
    }

    /// Find a post by id.
    pub async fn find_by_id(&self, post_id: i64) -> AppResult<Option<Post>> {
        sqlx::query_as::<_, Post>(&format!(r#"SELECT {COLUMNS} FROM posts WHERE "postId" = $1"#))
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify("Failed to find post", e))
    }

    /// Apply a partial update. Returns `None` if the post does not exist.
    pub async fn update(&self, post_id: i64, data: &UpdatePost) -> AppResult<Option<Post>> {
        data.validate().map_err(invalid_input)?;

        sqlx::query_as::<_, Post>(&format!(
            r#"UPDATE posts SET
                 title = COALESCE($2, title),
                 content = COALESCE($3, content)
               WHERE "postId" = $1
               RETURNING {COLUMNS}"#
        ))
        .bind(post_id)
        .bind(&data.title)
        .bind(&data.content)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| classify("Failed to update post", e))
    }

    /// Delete a post; its bookmarks cascade.
    pub async fn delete(&self, post_id: i64) -> AppResult<bool> {
        let result = sqlx::query(r#"DELETE FROM posts WHERE "postId" = $1"#)
            .bind(post_id)
            .execute(&self.pool)
            .await
            .map_err(|e| classify("Failed to delete post", e))?;
        Ok(result.rows_affected() > 0)
    }
}
