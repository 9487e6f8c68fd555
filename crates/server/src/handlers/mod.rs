//! HTTP request handlers.

pub mod auth;
pub mod comments;
pub mod common;
pub mod documents;
pub mod favorites;
pub mod feeds;
pub mod health;
pub mod taxonomy;
pub mod users;

pub use auth::*;
pub use comments::*;
pub use common::*;
pub use documents::*;
pub use favorites::*;
pub use feeds::*;
pub use health::*;
pub use taxonomy::*;
pub use users::*;
