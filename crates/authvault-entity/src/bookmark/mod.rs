//! Bookmark entities.

pub mod model;

pub use model::Bookmark;
