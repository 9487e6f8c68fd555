//! Database models mapping to the Folio schema.

use folio_core::comment::Threaded;
use folio_core::{MembershipLevel, UserStatus};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

// =============================================================================
// Accounts
// =============================================================================

/// User account record.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub avatar: Option<String>,
    pub is_admin: bool,
    /// One of `free`, `premium`, `vip`.
    pub membership_level: String,
    /// One of `active`, `disabled`.
    pub status: String,
    pub last_login_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl UserRow {
    /// Parsed status. Unknown values are treated as disabled.
    pub fn status(&self) -> UserStatus {
        UserStatus::parse(&self.status).unwrap_or(UserStatus::Disabled)
    }

    /// Parsed membership level. Unknown values fall back to free.
    pub fn membership_level(&self) -> MembershipLevel {
        MembershipLevel::parse(&self.membership_level).unwrap_or_default()
    }
}

/// Login session. Only the token digest is stored.
#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
}

impl SessionRow {
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at <= now
    }
}

// =============================================================================
// Taxonomy
// =============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct CategoryRow {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub color: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub struct TagRow {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub color: String,
    pub created_at: OffsetDateTime,
}

// =============================================================================
// Documents
// =============================================================================

/// Document record as stored.
#[derive(Debug, Clone, FromRow)]
pub struct DocumentRow {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub slug: String,
    /// Comma separated keywords.
    pub keywords: Option<String>,
    pub featured_image: Option<String>,
    pub author_id: Uuid,
    pub category_id: Option<Uuid>,
    pub published: bool,
    pub view_count: i64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Document joined with its author and (optional) category.
#[derive(Debug, Clone, FromRow)]
pub struct DocumentDetailRow {
    #[sqlx(flatten)]
    pub document: DocumentRow,
    pub author_name: String,
    pub author_email: String,
    pub author_avatar: Option<String>,
    pub category_name: Option<String>,
    pub category_slug: Option<String>,
    pub category_color: Option<String>,
}

/// Aggregate counts for the admin dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SiteStats {
    pub documents: u64,
    pub published_documents: u64,
    pub users: u64,
    pub comments: u64,
    pub categories: u64,
    pub tags: u64,
}

// =============================================================================
// Comments
// =============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct CommentRow {
    pub id: Uuid,
    pub content: String,
    pub author_id: Uuid,
    pub document_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub published: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Comment joined with its author's public profile.
#[derive(Debug, Clone, FromRow)]
pub struct CommentWithAuthorRow {
    #[sqlx(flatten)]
    pub comment: CommentRow,
    pub author_name: String,
    pub author_avatar: Option<String>,
}

impl Threaded for CommentWithAuthorRow {
    fn id(&self) -> Uuid {
        self.comment.id
    }

    fn parent_id(&self) -> Option<Uuid> {
        self.comment.parent_id
    }

    fn created_at(&self) -> OffsetDateTime {
        self.comment.created_at
    }
}

// =============================================================================
// Favorites
// =============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct FavoriteRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub document_id: Uuid,
    pub created_at: OffsetDateTime,
}

/// A favorite with a summary of the favorited document.
#[derive(Debug, Clone, FromRow)]
pub struct FavoriteDocumentRow {
    pub favorite_id: Uuid,
    pub favorited_at: OffsetDateTime,
    pub document_id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub published: bool,
    pub view_count: i64,
    pub updated_at: OffsetDateTime,
}
