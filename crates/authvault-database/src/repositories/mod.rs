//! Repository implementations for all AuthVault tables.

pub mod auth_session;
pub mod bookmark;
pub mod post;
pub mod refresh_token;
pub mod user;

pub use auth_session::AuthSessionRepository;
pub use bookmark::BookmarkRepository;
pub use post::PostRepository;
pub use refresh_token::RefreshTokenRepository;
pub use user::UserRepository;
