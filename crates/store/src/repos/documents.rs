//! Document repository.

use crate::error::StoreResult;
use crate::models::{DocumentDetailRow, DocumentRow, SiteStats};
use async_trait::async_trait;
use uuid::Uuid;

/// Which documents a listing may include.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    /// Published documents only.
    Published,
    /// Drafts too (administrators).
    All,
}

impl Visibility {
    pub fn for_admin(is_admin: bool) -> Self {
        if is_admin { Self::All } else { Self::Published }
    }
}

/// Repository for documents.
#[async_trait]
pub trait DocumentRepo: Send + Sync {
    /// Create a document and attach `tag_ids` in one transaction.
    /// Duplicate slug is `AlreadyExists`.
    async fn create_document(&self, document: &DocumentRow, tag_ids: &[Uuid]) -> StoreResult<()>;

    /// Get the bare document row.
    async fn get_document(&self, document_id: Uuid) -> StoreResult<Option<DocumentRow>>;

    /// Get a document with author and category.
    async fn get_document_detail(
        &self,
        document_id: Uuid,
    ) -> StoreResult<Option<DocumentDetailRow>>;

    /// Get a document with author and category by slug.
    async fn get_document_by_slug(&self, slug: &str) -> StoreResult<Option<DocumentDetailRow>>;

    /// List documents, most recently updated first.
    async fn list_documents(&self, visibility: Visibility) -> StoreResult<Vec<DocumentDetailRow>>;

    /// Case-insensitive substring search over title, content, keywords and
    /// excerpt, most recently updated first.
    async fn search_documents(
        &self,
        term: &str,
        visibility: Visibility,
    ) -> StoreResult<Vec<DocumentDetailRow>>;

    /// Documents in a category, most recently updated first.
    async fn list_documents_by_category(
        &self,
        category_id: Uuid,
        visibility: Visibility,
    ) -> StoreResult<Vec<DocumentDetailRow>>;

    /// Persist all editable fields; when `tag_ids` is given the tag set is
    /// replaced in the same transaction.
    async fn update_document(
        &self,
        document: &DocumentRow,
        tag_ids: Option<&[Uuid]>,
    ) -> StoreResult<()>;

    /// Delete a document with its tags, comments and favorites.
    async fn delete_document(&self, document_id: Uuid) -> StoreResult<()>;

    /// Add one to the view counter.
    async fn increment_view_count(&self, document_id: Uuid) -> StoreResult<()>;

    /// Dashboard counters.
    async fn site_stats(&self) -> StoreResult<SiteStats>;
}
