//! # authvault-core
//!
//! Core crate for AuthVault. Contains the configuration schema, the clock
//! abstraction used for every timestamp the store writes, pagination types,
//! and the unified error system.
//!
//! This crate has **no** internal dependencies on other AuthVault crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
