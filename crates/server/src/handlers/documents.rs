//! Document endpoints.

use crate::auth::{AuthenticatedUser, get_auth, require_admin};
use crate::error::{ApiError, ApiResult};
use crate::handlers::comments::{CommentThreadResponse, threads_to_response};
use crate::handlers::common::{
    ApiPath, ApiQuery, DocumentListResponse, DocumentResponse, TagResponse, document_to_response,
    documents_to_response, ensure_visible, non_empty, nullable, read_json, tags_to_response,
};
use crate::metrics::{DOCUMENT_VIEWS, DOCUMENTS_CREATED, DOCUMENTS_DELETED};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use folio_core::build_threads;
use folio_core::document::{normalize_keywords, validate_title};
use folio_core::slug::{MAX_SLUG_LEN, validate_slug};
use folio_store::BlogStore;
use folio_store::models::{DocumentDetailRow, DocumentRow};
use folio_store::repos::{CategoryRepo, CommentRepo, DocumentRepo, TagRepo, Visibility};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct ListDocumentsParams {
    /// Include drafts (administrators only).
    #[serde(default)]
    pub all: bool,
}

/// GET /v1/documents - List published documents, or everything for `?all=true`.
pub async fn list_documents(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListDocumentsParams>,
    req: Request,
) -> ApiResult<Json<DocumentListResponse>> {
    let visibility = if params.all {
        require_admin(&req)?;
        Visibility::All
    } else {
        Visibility::Published
    };

    let documents = state.store.list_documents(visibility).await?;
    Ok(Json(documents_to_response(&documents)?))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

/// GET /v1/documents/search?q= - Search published documents.
pub async fn search_documents(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> ApiResult<Json<DocumentListResponse>> {
    let term = non_empty(params.q)
        .ok_or_else(|| ApiError::BadRequest("search term 'q' is required".to_string()))?;

    let documents = state
        .store
        .search_documents(&term, Visibility::Published)
        .await?;
    Ok(Json(documents_to_response(&documents)?))
}

/// GET /v1/documents/by-slug/{slug} - Read a document and count the view.
pub async fn get_document_by_slug(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
    req: Request,
) -> ApiResult<Json<DocumentResponse>> {
    let mut detail = state
        .store
        .get_document_by_slug(&slug)
        .await?
        .ok_or_else(|| ApiError::NotFound("document not found".to_string()))?;
    ensure_visible(detail.document.published, get_auth(&req))?;

    state
        .store
        .increment_view_count(detail.document.id)
        .await?;
    DOCUMENT_VIEWS.inc();
    detail.document.view_count += 1;

    let tags = state.store.get_document_tags(detail.document.id).await?;
    Ok(Json(document_to_response(&detail, Some(&tags))?))
}

/// GET /v1/documents/{id} - Read a document without counting a view.
pub async fn get_document(
    State(state): State<AppState>,
    ApiPath(document_id): ApiPath<Uuid>,
    req: Request,
) -> ApiResult<Json<DocumentResponse>> {
    let auth = get_auth(&req);
    let detail = load_visible_document(&state, document_id, auth).await?;
    let tags = state.store.get_document_tags(document_id).await?;
    Ok(Json(document_to_response(&detail, Some(&tags))?))
}

#[derive(Debug, Deserialize)]
pub struct CreateDocumentRequest {
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub excerpt: Option<String>,
    pub slug: String,
    pub keywords: Option<String>,
    pub featured_image: Option<String>,
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub tag_ids: Vec<Uuid>,
    #[serde(default)]
    pub published: bool,
}

/// POST /v1/documents - Create a document (admin).
pub async fn create_document(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<(StatusCode, Json<DocumentResponse>)> {
    let auth = require_admin(&req)?.clone();
    let body: CreateDocumentRequest = read_json(req, state.config.server.max_body_bytes).await?;

    let title = validate_title(&body.title)?;
    validate_slug(&body.slug, MAX_SLUG_LEN)?;
    ensure_slug_free(&*state.store, &body.slug, None).await?;
    if let Some(category_id) = body.category_id {
        ensure_category_exists(&*state.store, category_id).await?;
    }
    let tag_ids = dedup(body.tag_ids);
    ensure_tags_exist(&*state.store, &tag_ids).await?;

    let now = OffsetDateTime::now_utc();
    let document = DocumentRow {
        id: Uuid::new_v4(),
        title,
        content: body.content,
        excerpt: non_empty(body.excerpt),
        slug: body.slug,
        keywords: body.keywords.as_deref().and_then(normalize_keywords),
        featured_image: non_empty(body.featured_image),
        author_id: auth.id(),
        category_id: body.category_id,
        published: body.published,
        view_count: 0,
        created_at: now,
        updated_at: now,
    };

    state
        .store
        .create_document(&document, &tag_ids)
        .await?;
    DOCUMENTS_CREATED.inc();
    tracing::info!(
        document_id = %document.id,
        slug = %document.slug,
        published = document.published,
        "Document created"
    );

    let response = load_document_response(&state, document.id).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateDocumentRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub excerpt: Option<Option<String>>,
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub keywords: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub featured_image: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub category_id: Option<Option<Uuid>>,
    /// Replaces the whole tag set when present.
    pub tag_ids: Option<Vec<Uuid>>,
    pub published: Option<bool>,
}

/// PUT /v1/documents/{id} - Partially update a document (admin).
///
/// Absent fields are kept; `null` clears optional fields.
pub async fn update_document(
    State(state): State<AppState>,
    ApiPath(document_id): ApiPath<Uuid>,
    req: Request,
) -> ApiResult<Json<DocumentResponse>> {
    require_admin(&req)?;
    let body: UpdateDocumentRequest = read_json(req, state.config.server.max_body_bytes).await?;

    let mut document = state
        .store
        .get_document(document_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("document not found".to_string()))?;

    if let Some(title) = body.title {
        document.title = validate_title(&title)?;
    }
    if let Some(content) = body.content {
        document.content = content;
    }
    if let Some(excerpt) = body.excerpt {
        document.excerpt = non_empty(excerpt);
    }
    if let Some(slug) = body.slug
        && slug != document.slug
    {
        validate_slug(&slug, MAX_SLUG_LEN)?;
        ensure_slug_free(&*state.store, &slug, Some(document_id)).await?;
        document.slug = slug;
    }
    if let Some(keywords) = body.keywords {
        document.keywords = keywords.as_deref().and_then(normalize_keywords);
    }
    if let Some(featured_image) = body.featured_image {
        document.featured_image = non_empty(featured_image);
    }
    if let Some(category_id) = body.category_id {
        if let Some(id) = category_id {
            ensure_category_exists(&*state.store, id).await?;
        }
        document.category_id = category_id;
    }
    if let Some(published) = body.published {
        document.published = published;
    }

    let tag_ids = body.tag_ids.map(dedup);
    if let Some(ids) = &tag_ids {
        ensure_tags_exist(&*state.store, ids).await?;
    }

    document.updated_at = OffsetDateTime::now_utc();
    state
        .store
        .update_document(&document, tag_ids.as_deref())
        .await?;
    tracing::info!(document_id = %document.id, "Document updated");

    Ok(Json(load_document_response(&state, document_id).await?))
}

/// DELETE /v1/documents/{id} - Delete a document with its tags, comments and
/// favorites (admin).
pub async fn delete_document(
    State(state): State<AppState>,
    ApiPath(document_id): ApiPath<Uuid>,
    req: Request,
) -> ApiResult<StatusCode> {
    require_admin(&req)?;

    state.store.delete_document(document_id).await?;
    DOCUMENTS_DELETED.inc();
    tracing::info!(document_id = %document_id, "Document deleted");

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct DocumentTagsResponse {
    pub tags: Vec<TagResponse>,
}

/// GET /v1/documents/{id}/tags - Tags of a document.
pub async fn get_document_tags(
    State(state): State<AppState>,
    ApiPath(document_id): ApiPath<Uuid>,
    req: Request,
) -> ApiResult<Json<DocumentTagsResponse>> {
    let auth = get_auth(&req);
    load_visible_document(&state, document_id, auth).await?;
    let tags = state.store.get_document_tags(document_id).await?;
    Ok(Json(DocumentTagsResponse {
        tags: tags_to_response(&tags)?,
    }))
}

/// GET /v1/documents/{id}/comments - Threaded comments of a document.
///
/// Administrators also see unpublished comments.
pub async fn get_document_comments(
    State(state): State<AppState>,
    ApiPath(document_id): ApiPath<Uuid>,
    req: Request,
) -> ApiResult<Json<CommentThreadResponse>> {
    let auth = get_auth(&req);
    load_visible_document(&state, document_id, auth).await?;
    let include_unpublished = auth.is_some_and(AuthenticatedUser::is_admin);

    let comments = state
        .store
        .list_document_comments(document_id, include_unpublished)
        .await?;
    let threads = build_threads(comments);

    Ok(Json(threads_to_response(threads)?))
}

// =============================================================================
// Helpers
// =============================================================================

/// `Request` is not `Sync`; pass the caller, never `&Request`, into awaited helpers.
async fn load_visible_document(
    state: &AppState,
    document_id: Uuid,
    auth: Option<&AuthenticatedUser>,
) -> ApiResult<DocumentDetailRow> {
    let detail = state
        .store
        .get_document_detail(document_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("document not found".to_string()))?;
    ensure_visible(detail.document.published, auth)?;
    Ok(detail)
}

async fn load_document_response(state: &AppState, document_id: Uuid) -> ApiResult<DocumentResponse> {
    let detail = state
        .store
        .get_document_detail(document_id)
        .await?
        .ok_or_else(|| ApiError::Internal("document vanished after write".to_string()))?;
    let tags = state.store.get_document_tags(document_id).await?;
    document_to_response(&detail, Some(&tags))
}

async fn ensure_slug_free(
    store: &dyn BlogStore,
    slug: &str,
    except: Option<Uuid>,
) -> ApiResult<()> {
    match store.get_document_by_slug(slug).await? {
        Some(existing) if Some(existing.document.id) != except => Err(ApiError::Conflict(
            format!("document slug '{slug}' already exists"),
        )),
        _ => Ok(()),
    }
}

async fn ensure_category_exists(store: &dyn BlogStore, category_id: Uuid) -> ApiResult<()> {
    if store.get_category(category_id).await?.is_none() {
        return Err(ApiError::BadRequest(format!(
            "category {category_id} does not exist"
        )));
    }
    Ok(())
}

async fn ensure_tags_exist(store: &dyn BlogStore, tag_ids: &[Uuid]) -> ApiResult<()> {
    if tag_ids.is_empty() {
        return Ok(());
    }
    let missing = store.missing_tag_ids(tag_ids).await?;
    if !missing.is_empty() {
        let ids: Vec<String> = missing.iter().map(Uuid::to_string).collect();
        return Err(ApiError::BadRequest(format!(
            "unknown tag ids: {}",
            ids.join(", ")
        )));
    }
    Ok(())
}

/// Keep the first occurrence of each id.
fn dedup(ids: Vec<Uuid>) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}
