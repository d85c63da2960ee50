//! Post entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// A post authored by a user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Post {
    /// Database-assigned identifier.
    #[sqlx(rename = "postId")]
    pub post_id: i64,
    /// Title.
    pub title: String,
    /// Body.
    pub content: String,
    /// Authoring user.
    #[sqlx(rename = "authorId")]
    pub author_id: Uuid,
    /// Creation timestamp.
    #[sqlx(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    /// Last update timestamp, trigger-maintained.
    #[sqlx(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Data required to create a post.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreatePost {
    /// Title.
    #[validate(length(min = 1, max = 200), custom(function = "crate::user::model::not_blank"))]
    pub title: String,
    /// Body.
    #[validate(length(min = 1), custom(function = "crate::user::model::not_blank"))]
    pub content: String,
    /// Authoring user.
    pub author_id: Uuid,
}

/// Partial post update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_update_post"))]
pub struct UpdatePost {
    /// New title.
    #[validate(length(max = 200))]
    pub title: Option<String>,
    /// New body.
    pub content: Option<String>,
}

fn validate_update_post(update: &UpdatePost) -> Result<(), ValidationError> {
    let blank = |v: &Option<String>| v.as_deref().is_some_and(|s| s.trim().is_empty());
    if blank(&update.title) || blank(&update.content) {
        return Err(ValidationError::new("blank").with_message("Fields cannot be blank".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_post_rejects_blank_title() {
        let post = CreatePost {
            title: "   ".to_string(),
            content: "body".to_string(),
            author_id: Uuid::new_v4(),
        };
        assert!(post.validate().is_err());
    }

    #[test]
    fn test_update_post_allows_partial() {
        let update = UpdatePost {
            title: Some("new title".to_string()),
            content: None,
        };
        assert!(update.validate().is_ok());

        let blank = UpdatePost {
            title: None,
            content: Some(String::new()),
        };
        assert!(blank.validate().is_err());
    }
}
