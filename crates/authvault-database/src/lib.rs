//! # authvault-database
//!
//! PostgreSQL connection management, the embedded migration runner, and the
//! repositories for users, posts, bookmarks, auth sessions and refresh
//! tokens. Refresh-token issuance and rotation run as single transactions
//! here; everything above this crate treats them as atomic primitives.

pub mod connection;
pub mod error;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
pub use migration::run_migrations;
