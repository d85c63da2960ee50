//! User repository implementation.

use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use authvault_core::result::AppResult;
use authvault_core::types::PageRequest;
use authvault_entity::user::{CreateUser, UpdateUser, User};

use crate::error::{classify, invalid_input};

const COLUMNS: &str = r#""userId", "userName", "imageUrl", "createdAt", "updatedAt""#;

/// Repository for user CRUD operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new user. A taken name yields `Conflict`.
    pub async fn create(&self, data: &CreateUser) -> AppResult<User> {
        data.validate().map_err(invalid_input)?;

        sqlx::query_as::<_, User>(&format!(
            r#"INSERT INTO users ("userName", "imageUrl") VALUES ($1, $2) RETURNING {COLUMNS}"#
        ))
        .bind(data.user_name.trim())
        .bind(&data.image_url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify("Failed to create user", e))
    }

    /// Find a user by primary key.
    pub async fn find_by_id(&self, user_id: Uuid) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!(r#"SELECT {COLUMNS} FROM users WHERE "userId" = $1"#))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify("Failed to find user by id", e))
    }

    /// Find a user by exact name.
    pub async fn find_by_name(&self, user_name: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            r#"SELECT {COLUMNS} FROM users WHERE "userName" = $1"#
        ))
        .bind(user_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| classify("Failed to find user by name", e))
    }

    /// List users, oldest first.
    pub async fn list(&self, page: PageRequest) -> AppResult<Vec<User>> {
        sqlx::query_as::<_, User>(&format!(
            r#"SELECT {COLUMNS} FROM users ORDER BY "createdAt", "userId" LIMIT $1 OFFSET $2"#
        ))
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| classify("Failed to list users", e))
    }

    /// Apply a partial update. Returns `None` if the user does not exist.
    pub async fn update(&self, user_id: Uuid, data: &UpdateUser) -> AppResult<Option<User>> {
        data.validate().map_err(invalid_input)?;

        let (touch_image, image) = match &data.image_url {
            None => (false, None),
            Some(value) => (true, value.as_deref()),
        };

        sqlx::query_as::<_, User>(&format!(
            r#"UPDATE users SET
                 "userName" = COALESCE($2, "userName"),
                 "imageUrl" = CASE WHEN $3 THEN $4 ELSE "imageUrl" END
               WHERE "userId" = $1
               RETURNING {COLUMNS}"#
        ))
        .bind(user_id)
        .bind(data.user_name.as_deref().map(str::trim))
        .bind(touch_image)
        .bind(image)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| classify("Failed to update user", e))
    }

    /// Delete a user; sessions, tokens, posts and bookmarks cascade.
    pub async fn delete(&self, user_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(r#"DELETE FROM users WHERE "userId" = $1"#)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| classify("Failed to delete user", e))?;
        Ok(result.rows_affected() > 0)
    }
}
