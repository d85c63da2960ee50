//! # authvault-auth
//!
//! Session lifecycle and refresh-token rotation for AuthVault.
//!
//! ## Modules
//!
//! - `token` - opaque token codec and the rotation engine
//! - `session` - session creation, key binding, activity and revocation
//! - `store` - the [`AuthStore`] seam with PostgreSQL and in-memory backends
//! - `cleanup` - retention purge of expired refresh-token rows

pub mod cleanup;
pub mod session;
pub mod store;
pub mod token;

pub use cleanup::{CleanupReport, TokenCleanup};
pub use session::SessionManager;
pub use store::{AuthStore, MemoryAuthStore, PgAuthStore};
pub use token::{RefreshTokenService, RotatedToken, TokenStatus};

#[cfg(test)]
pub(crate) mod test_support;
