//! Refresh-token domain entities.

pub mod model;
pub mod outcome;
pub mod state;

pub use model::{IssuedRefreshToken, RefreshToken};
pub use outcome::{TokenIssue, TokenRotation};
pub use state::TokenState;
