//! Category and tag repositories.

use crate::error::StoreResult;
use crate::models::{CategoryRow, TagRow};
use async_trait::async_trait;
use uuid::Uuid;

/// Repository for categories.
#[async_trait]
pub trait CategoryRepo: Send + Sync {
    /// Create a category. Duplicate name or slug is `AlreadyExists`.
    async fn create_category(&self, category: &CategoryRow) -> StoreResult<()>;

    async fn get_category(&self, category_id: Uuid) -> StoreResult<Option<CategoryRow>>;

    async fn get_category_by_slug(&self, slug: &str) -> StoreResult<Option<CategoryRow>>;

    /// All categories ordered by name.
    async fn list_categories(&self) -> StoreResult<Vec<CategoryRow>>;

    /// Persist name, slug, description and color.
    async fn update_category(&self, category: &CategoryRow) -> StoreResult<()>;

    /// Delete a category. Its documents become uncategorized.
    async fn delete_category(&self, category_id: Uuid) -> StoreResult<()>;
}

/// Repository for tags and document/tag associations.
#[async_trait]
pub trait TagRepo: Send + Sync {
    /// Create a tag. Duplicate name or slug is `AlreadyExists`.
    async fn create_tag(&self, tag: &TagRow) -> StoreResult<()>;

    async fn get_tag(&self, tag_id: Uuid) -> StoreResult<Option<TagRow>>;

    /// All tags ordered by name.
    async fn list_tags(&self) -> StoreResult<Vec<TagRow>>;

    /// Persist name, slug and color.
    async fn update_tag(&self, tag: &TagRow) -> StoreResult<()>;

    /// Delete a tag and its document associations.
    async fn delete_tag(&self, tag_id: Uuid) -> StoreResult<()>;

    /// Tags attached to a document, ordered by name.
    async fn get_document_tags(&self, document_id: Uuid) -> StoreResult<Vec<TagRow>>;

    /// Resolve names to tags, creating missing ones with a derived slug and the
    /// default color. Names that produce an empty slug are skipped. The result
    /// follows input order without duplicates.
    async fn find_or_create_tags(&self, names: &[String]) -> StoreResult<Vec<TagRow>>;

    /// Return the subset of `tag_ids` that do not exist.
    async fn missing_tag_ids(&self, tag_ids: &[Uuid]) -> StoreResult<Vec<Uuid>>;

    /// Replace the tag set of a document.
    async fn set_document_tags(&self, document_id: Uuid, tag_ids: &[Uuid]) -> StoreResult<()>;
}
