//! Repository traits.

pub mod documents;
pub mod engagement;
pub mod taxonomy;
pub mod users;

pub use documents::{DocumentRepo, Visibility};
pub use engagement::{CommentRepo, FavoriteRepo};
pub use taxonomy::{CategoryRepo, TagRepo};
pub use users::{SessionRepo, SortOrder, UserFilter, UserQuery, UserRepo, UserSortField};
