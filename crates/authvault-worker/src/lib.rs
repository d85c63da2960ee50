//! Scheduled maintenance for AuthVault.
//!
//! This crate provides:
//! - A cron scheduler for periodic maintenance tasks
//! - The refresh-token retention job it runs

pub mod jobs;
pub mod scheduler;

pub use jobs::TokenCleanupJob;
pub use scheduler::CleanupScheduler;
