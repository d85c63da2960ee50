//! User entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Maximum length of an avatar reference.
pub const MAX_IMAGE_URL_LEN: u64 = 256;

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Unique user identifier.
    #[sqlx(rename = "userId")]
    pub user_id: Uuid,
    /// Unique display name.
    #[sqlx(rename = "userName")]
    pub user_name: String,
    /// Optional avatar reference.
    #[sqlx(rename = "imageUrl")]
    pub image_url: Option<String>,
    /// When the user was created.
    #[sqlx(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    #[sqlx(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Data required to create a new user.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateUser {
    /// Desired display name.
    #[validate(length(min = 1, max = 64), custom(function = "not_blank"))]
    pub user_name: String,
    /// Optional avatar reference.
    #[validate(length(max = 256))]
    pub image_url: Option<String>,
}

/// Partial update of a user's profile.
///
/// `image_url` is tri-state: `None` keeps the stored value, `Some(None)`
/// clears it, `Some(Some(v))` replaces it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_update_user"))]
pub struct UpdateUser {
    /// New display name.
    #[validate(length(min = 1, max = 64))]
    pub user_name: Option<String>,
    /// New avatar reference, or `Some(None)` to clear.
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_url: Option<Option<String>>,
}

impl UpdateUser {
    /// Whether the update would change nothing.
    pub fn is_empty(&self) -> bool {
        self.user_name.is_none() && self.image_url.is_none()
    }
}

/// Maps an explicit `null` to `Some(None)` so it can be told apart from a
/// missing field.
fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Reject strings made only of whitespace.
pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("Value cannot be blank".into()));
    }
    Ok(())
}

fn validate_update_user(update: &UpdateUser) -> Result<(), ValidationError> {
    if let Some(name) = &update.user_name {
        not_blank(name)?;
    }
    if let Some(Some(url)) = &update.image_url
        && url.chars().count() as u64 > MAX_IMAGE_URL_LEN
    {
        return Err(ValidationError::new("length")
            .with_message("imageUrl must be at most 256 characters".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_user_validation() {
        let ok = CreateUser {
            user_name: "alice".to_string(),
            image_url: None,
        };
        assert!(ok.validate().is_ok());

        let blank = CreateUser {
            user_name: "  ".to_string(),
            image_url: None,
        };
        assert!(blank.validate().is_err());

        let long_url = CreateUser {
            user_name: "bob".to_string(),
            image_url: Some("x".repeat(257)),
        };
        assert!(long_url.validate().is_err());
    }

    #[test]
    fn test_update_user_tri_state() {
        let clear = UpdateUser {
            user_name: None,
            image_url: Some(None),
        };
        assert!(clear.validate().is_ok());
        assert!(!clear.is_empty());

        let too_long = UpdateUser {
            user_name: None,
            image_url: Some(Some("y".repeat(300))),
        };
        assert!(too_long.validate().is_err());

        assert!(UpdateUser::default().is_empty());
    }

    #[test]
    fn test_update_user_tri_state_deserialization() {
        let missing: UpdateUser = serde_json::from_str(r#"{}"#).unwrap();
        assert!(missing.image_url.is_none());

        let null: UpdateUser = serde_json::from_str(r#"{"image_url": null}"#).unwrap();
        assert_eq!(null.image_url, Some(None));

        let set: UpdateUser = serde_json::from_str(r#"{"image_url": "a.png"}"#).unwrap();
        assert_eq!(set.image_url, Some(Some("a.png".to_string())));
    }
}
