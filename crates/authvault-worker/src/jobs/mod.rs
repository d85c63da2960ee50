//! Job implementations run by the scheduler.

pub mod token_cleanup;

pub use token_cleanup::TokenCleanupJob;
