//! Translation of PostgreSQL failures into [`AppError`] kinds.
//!
//! Constraint names come from `migrations/`; a rename there must be mirrored
//! here.

use authvault_core::error::{AppError, ErrorKind};

/// Unique index on `refresh_tokens.token_hash`.
pub const TOKEN_HASH_UNIQUE: &str = "refresh_tokens_token_hash_key";
/// Partial unique index allowing one current token per session.
pub const ONE_CURRENT_PER_SESSION: &str = "refresh_tokens_one_current_per_session";
/// Deferred self-reference from `replaced_by` to `id`.
pub const REPLACED_BY_FK: &str = "refresh_tokens_replaced_by_fkey";
/// Foreign key from `auth_sessions.user_id` to `users`.
pub const SESSION_USER_FK: &str = "auth_sessions_user_id_fkey";

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const CHECK_VIOLATION: &str = "23514";

/// Map a sqlx error to the matching [`ErrorKind`], keeping it as the source.
pub fn classify(message: &str, err: sqlx::Error) -> AppError {
    let kind = match &err {
        sqlx::Error::Database(db) => {
            let code = db.code();
            kind_for(code.as_deref(), db.constraint())
        }
        _ => ErrorKind::Database,
    };
    AppError::with_source(kind, format!("{message}: {err}"), err)
}

fn kind_for(code: Option<&str>, constraint: Option<&str>) -> ErrorKind {
    match (code, constraint) {
        (Some(UNIQUE_VIOLATION), Some(TOKEN_HASH_UNIQUE)) => ErrorKind::ConstraintViolation,
        (Some(UNIQUE_VIOLATION), Some(ONE_CURRENT_PER_SESSION)) => ErrorKind::TokenAlreadyCurrent,
        (Some(UNIQUE_VIOLATION), _) => ErrorKind::Conflict,
        (Some(FOREIGN_KEY_VIOLATION), Some(REPLACED_BY_FK)) => ErrorKind::ConstraintViolation,
        (Some(FOREIGN_KEY_VIOLATION), _) => ErrorKind::NotFound,
        (Some(CHECK_VIOLATION), _) => ErrorKind::ConstraintViolation,
        _ => ErrorKind::Database,
    }
}

/// Map `validator` failures to a [`ErrorKind::Validation`] error.
pub fn invalid_input(errors: validator::ValidationErrors) -> AppError {
    AppError::with_source(
        ErrorKind::Validation,
        format!("Invalid input: {errors}"),
        errors,
    )
}
