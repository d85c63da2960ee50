//! # authvault-entity
//!
//! Row and value types for AuthVault. Every struct that mirrors a table row
//! derives `sqlx::FromRow`; lifecycle flags such as "current" or "revoked"
//! are derived from timestamps rather than stored.

pub mod bookmark;
pub mod post;
pub mod session;
pub mod token;
pub mod user;
