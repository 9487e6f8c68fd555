//! Comment and favorite repositories.

use crate::error::StoreResult;
use crate::models::{CommentRow, CommentWithAuthorRow, FavoriteDocumentRow, FavoriteRow};
use crate::repos::Visibility;
use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

/// Repository for comments.
#[async_trait]
pub trait CommentRepo: Send + Sync {
    async fn create_comment(&self, comment: &CommentRow) -> StoreResult<()>;

    async fn get_comment(&self, comment_id: Uuid) -> StoreResult<Option<CommentRow>>;

    /// Comments on a document with author names, oldest first.
    /// Unpublished comments are included only when asked for.
    async fn list_document_comments(
        &self,
        document_id: Uuid,
        include_unpublished: bool,
    ) -> StoreResult<Vec<CommentWithAuthorRow>>;

    async fn update_comment_content(
        &self,
        comment_id: Uuid,
        content: &str,
        updated_at: OffsetDateTime,
    ) -> StoreResult<()>;

    async fn set_comment_published(
        &self,
        comment_id: Uuid,
        published: bool,
        updated_at: OffsetDateTime,
    ) -> StoreResult<()>;

    /// Delete a comment; replies are removed with it.
    async fn delete_comment(&self, comment_id: Uuid) -> StoreResult<()>;
}

/// Repository for favorites.
#[async_trait]
pub trait FavoriteRepo: Send + Sync {
    /// Add a favorite. A second favorite of the same document is `AlreadyExists`.
    async fn add_favorite(&self, favorite: &FavoriteRow) -> StoreResult<()>;

    /// Remove a favorite; `NotFound` when it did not exist.
    async fn remove_favorite(&self, user_id: Uuid, document_id: Uuid) -> StoreResult<()>;

    async fn is_favorited(&self, user_id: Uuid, document_id: Uuid) -> StoreResult<bool>;

    async fn count_favorites(&self, document_id: Uuid) -> StoreResult<u64>;

    /// A user's favorites with document summaries, oldest first. Favorites of
    /// drafts are listed only for `Visibility::All`.
    async fn list_favorites(
        &self,
        user_id: Uuid,
        visibility: Visibility,
    ) -> StoreResult<Vec<FavoriteDocumentRow>>;
}
