//! User and session repositories.

use crate::error::StoreResult;
use crate::models::{SessionRow, UserRow};
use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

/// Column a user listing can be sorted by.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UserSortField {
    #[default]
    CreatedAt,
    LastLoginAt,
    Name,
    Email,
}

impl UserSortField {
    /// Parse the API spelling (`createdAt` or `created_at`, etc.).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "createdAt" | "created_at" => Some(Self::CreatedAt),
            "lastLoginAt" | "last_login_at" => Some(Self::LastLoginAt),
            "name" => Some(Self::Name),
            "email" => Some(Self::Email),
            _ => None,
        }
    }

    /// Column name; only ever one of a fixed set, so safe to interpolate.
    pub fn column(&self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::LastLoginAt => "last_login_at",
            Self::Name => "name",
            Self::Email => "email",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Filters shared by user listing and counting.
#[derive(Clone, Debug, Default)]
pub struct UserFilter {
    /// Case-insensitive substring of name or email.
    pub search: Option<String>,
    pub membership_level: Option<String>,
    pub status: Option<String>,
}

/// A page of users.
#[derive(Clone, Debug)]
pub struct UserQuery {
    pub filter: UserFilter,
    pub sort_by: UserSortField,
    pub sort_order: SortOrder,
    pub limit: i64,
    pub offset: i64,
}

impl Default for UserQuery {
    fn default() -> Self {
        Self {
            filter: UserFilter::default(),
            sort_by: UserSortField::default(),
            sort_order: SortOrder::default(),
            limit: 10,
            offset: 0,
        }
    }
}

/// Repository for user accounts.
#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Create a user. Duplicate email is `AlreadyExists`.
    async fn create_user(&self, user: &UserRow) -> StoreResult<()>;

    /// Get a user by ID.
    async fn get_user(&self, user_id: Uuid) -> StoreResult<Option<UserRow>>;

    /// Get a user by (normalized) email.
    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<UserRow>>;

    /// Persist profile fields: email, name, avatar, admin flag, membership, status.
    async fn update_user(&self, user: &UserRow) -> StoreResult<()>;

    /// Replace the password hash.
    async fn update_user_password(
        &self,
        user_id: Uuid,
        password_hash: &str,
        updated_at: OffsetDateTime,
    ) -> StoreResult<()>;

    /// Record a successful login.
    async fn record_login(&self, user_id: Uuid, at: OffsetDateTime) -> StoreResult<()>;

    /// Delete a user with their sessions, favorites and comments.
    ///
    /// Refuses with `Constraint` while the user still authors documents.
    async fn delete_user(&self, user_id: Uuid) -> StoreResult<()>;

    /// List a page of users.
    async fn list_users(&self, query: &UserQuery) -> StoreResult<Vec<UserRow>>;

    /// Count users matching a filter.
    async fn count_users(&self, filter: &UserFilter) -> StoreResult<u64>;
}

/// Repository for login sessions.
#[async_trait]
pub trait SessionRepo: Send + Sync {
    /// Create a session.
    async fn create_session(&self, session: &SessionRow) -> StoreResult<()>;

    /// Get a session by token hash.
    async fn get_session_by_hash(&self, token_hash: &str) -> StoreResult<Option<SessionRow>>;

    /// Delete a session.
    async fn delete_session(&self, session_id: Uuid) -> StoreResult<()>;

    /// Delete every session of a user except `keep`.
    async fn delete_user_sessions(&self, user_id: Uuid, keep: Option<Uuid>) -> StoreResult<u64>;

    /// Delete sessions that expired at or before `now`.
    async fn purge_expired_sessions(&self, now: OffsetDateTime) -> StoreResult<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_field_accepts_both_spellings() {
        assert_eq!(
            UserSortField::parse("lastLoginAt"),
            Some(UserSortField::LastLoginAt)
        );
        assert_eq!(
            UserSortField::parse("last_login_at"),
            Some(UserSortField::LastLoginAt)
        );
        assert_eq!(UserSortField::parse("password_hash"), None);
        assert_eq!(UserSortField::default().column(), "created_at");
    }

    #[test]
    fn sort_order_defaults_to_desc() {
        assert_eq!(SortOrder::default().as_sql(), "DESC");
        assert_eq!(SortOrder::parse("asc"), Some(SortOrder::Asc));
        assert_eq!(SortOrder::parse("ASC; DROP"), None);
    }
}
