//! Post entities.

pub mod model;

pub use model::{CreatePost, Post, UpdatePost};
