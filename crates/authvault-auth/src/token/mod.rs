//! Opaque refresh tokens: generation, hashing, and rotation.

pub mod codec;
pub mod service;

pub use codec::{generate_opaque_token, hash_token};
pub use service::{RefreshTokenService, RotatedToken, TokenStatus};
