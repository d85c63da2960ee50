//! Convenience result type alias for AuthVault.

use crate::error::AppError;

/// A specialized `Result` type for AuthVault operations.
pub type AppResult<T> = Result<T, AppError>;
