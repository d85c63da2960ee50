//! Core type definitions used across the AuthVault workspace.

pub mod pagination;

pub use pagination::PageRequest;
