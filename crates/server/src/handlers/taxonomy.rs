//! Category and tag endpoints.

use crate::auth::require_admin;
use crate::error::{ApiError, ApiResult};
use crate::handlers::common::{
    ApiPath, CategoryResponse, DocumentListResponse, TagResponse, category_to_response,
    documents_to_response, non_empty, nullable, read_json, tag_to_response, tags_to_response,
};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use folio_core::slug::{MAX_SLUG_LEN, MAX_TAG_SLUG_LEN, validate_slug};
use folio_core::taxonomy::{
    DEFAULT_CATEGORY_COLOR, DEFAULT_TAG_COLOR, validate_category_name, validate_color,
    validate_tag_name,
};
use folio_store::models::{CategoryRow, TagRow};
use folio_store::repos::{CategoryRepo, DocumentRepo, TagRepo, Visibility};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

fn validated_color(color: Option<String>, default: &str) -> ApiResult<String> {
    match non_empty(color) {
        Some(color) => {
            validate_color(&color)?;
            Ok(color)
        }
        None => Ok(default.to_string()),
    }
}

// =============================================================================
// Categories
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ListCategoriesResponse {
    pub categories: Vec<CategoryResponse>,
}

/// GET /v1/categories - All categories by name.
pub async fn list_categories(
    State(state): State<AppState>,
) -> ApiResult<Json<ListCategoriesResponse>> {
    let categories = state
        .store
        .list_categories()
        .await?
        .iter()
        .map(category_to_response)
        .collect::<ApiResult<Vec<_>>>()?;
    Ok(Json(ListCategoriesResponse { categories }))
}

#[derive(Debug, Serialize)]
pub struct CategoryDocumentsResponse {
    pub category: CategoryResponse,
    #[serde(flatten)]
    pub documents: DocumentListResponse,
}

/// GET /v1/categories/{slug}/documents - Published documents of a category.
pub async fn list_category_documents(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> ApiResult<Json<CategoryDocumentsResponse>> {
    let category = state
        .store
        .get_category_by_slug(&slug)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("category '{slug}' not found")))?;

    let documents = state
        .store
        .list_documents_by_category(category.id, Visibility::Published)
        .await?;

    Ok(Json(CategoryDocumentsResponse {
        category: category_to_response(&category)?,
        documents: documents_to_response(&documents)?,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub color: Option<String>,
}

/// POST /v1/categories - Create a category (admin).
pub async fn create_category(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<(StatusCode, Json<CategoryResponse>)> {
    require_admin(&req)?;
    let body: CreateCategoryRequest = read_json(req, state.config.server.max_body_bytes).await?;

    let name = validate_category_name(&body.name)?;
    validate_slug(&body.slug, MAX_SLUG_LEN)?;
    let color = validated_color(body.color, DEFAULT_CATEGORY_COLOR)?;

    let category = CategoryRow {
        id: Uuid::new_v4(),
        name,
        slug: body.slug,
        description: non_empty(body.description),
        color,
        created_at: OffsetDateTime::now_utc(),
    };
    state.store.create_category(&category).await?;
    tracing::info!(category_id = %category.id, slug = %category.slug, "Category created");

    Ok((StatusCode::CREATED, Json(category_to_response(&category)?)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub color: Option<String>,
}

/// PUT /v1/categories/{id} - Update a category (admin).
pub async fn update_category(
    State(state): State<AppState>,
    ApiPath(category_id): ApiPath<Uuid>,
    req: Request,
) -> ApiResult<Json<CategoryResponse>> {
    require_admin(&req)?;
    let body: UpdateCategoryRequest = read_json(req, state.config.server.max_body_bytes).await?;

    let mut category = state
        .store
        .get_category(category_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("category not found".to_string()))?;

    if let Some(name) = body.name {
        category.name = validate_category_name(&name)?;
    }
    if let Some(slug) = body.slug {
        validate_slug(&slug, MAX_SLUG_LEN)?;
        category.slug = slug;
    }
    if let Some(description) = body.description {
        category.description = non_empty(description);
    }
    if let Some(color) = body.color {
        validate_color(&color)?;
        category.color = color;
    }

    state.store.update_category(&category).await?;
    Ok(Json(category_to_response(&category)?))
}

/// DELETE /v1/categories/{id} - Delete a category; its documents become
/// uncategorized (admin).
pub async fn delete_category(
    State(state): State<AppState>,
    ApiPath(category_id): ApiPath<Uuid>,
    req: Request,
) -> ApiResult<StatusCode> {
    require_admin(&req)?;
    state.store.delete_category(category_id).await?;
    tracing::info!(category_id = %category_id, "Category deleted");
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Tags
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ListTagsResponse {
    pub tags: Vec<TagResponse>,
}

/// GET /v1/tags - All tags by name.
pub async fn list_tags(State(state): State<AppState>) -> ApiResult<Json<ListTagsResponse>> {
    let tags = state.store.list_tags().await?;
    Ok(Json(ListTagsResponse {
        tags: tags_to_response(&tags)?,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CreateTagRequest {
    pub name: String,
    pub slug: String,
    pub color: Option<String>,
}

/// POST /v1/tags - Create a tag (admin).
pub async fn create_tag(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<(StatusCode, Json<TagResponse>)> {
    require_admin(&req)?;
    let body: CreateTagRequest = read_json(req, state.config.server.max_body_bytes).await?;

    let name = validate_tag_name(&body.name)?;
    validate_slug(&body.slug, MAX_TAG_SLUG_LEN)?;
    let color = validated_color(body.color, DEFAULT_TAG_COLOR)?;

    let tag = TagRow {
        id: Uuid::new_v4(),
        name,
        slug: body.slug,
        color,
        created_at: OffsetDateTime::now_utc(),
    };
    state.store.create_tag(&tag).await?;
    tracing::info!(tag_id = %tag.id, slug = %tag.slug, "Tag created");

    Ok((StatusCode::CREATED, Json(tag_to_response(&tag)?)))
}

#[derive(Debug, Deserialize)]
pub struct ResolveTagsRequest {
    pub names: Vec<String>,
}

/// POST /v1/tags/resolve - Find tags by name, creating the missing ones (admin).
pub async fn resolve_tags(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<ListTagsResponse>> {
    require_admin(&req)?;
    let body: ResolveTagsRequest = read_json(req, state.config.server.max_body_bytes).await?;

    let names = body
        .names
        .iter()
        .filter(|name| !name.trim().is_empty())
        .map(|name| validate_tag_name(name))
        .collect::<folio_core::Result<Vec<_>>>()?;

    let tags = state.store.find_or_create_tags(&names).await?;
    Ok(Json(ListTagsResponse {
        tags: tags_to_response(&tags)?,
    }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateTagRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub color: Option<String>,
}

/// PUT /v1/tags/{id} - Update a tag (admin).
pub async fn update_tag(
    State(state): State<AppState>,
    ApiPath(tag_id): ApiPath<Uuid>,
    req: Request,
) -> ApiResult<Json<TagResponse>> {
    require_admin(&req)?;
    let body: UpdateTagRequest = read_json(req, state.config.server.max_body_bytes).await?;

    let mut tag = state
        .store
        .get_tag(tag_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("tag not found".to_string()))?;

    if let Some(name) = body.name {
        tag.name = validate_tag_name(&name)?;
    }
    if let Some(slug) = body.slug {
        validate_slug(&slug, MAX_TAG_SLUG_LEN)?;
        tag.slug = slug;
    }
    if let Some(color) = body.color {
        validate_color(&color)?;
        tag.color = color;
    }

    state.store.update_tag(&tag).await?;
    Ok(Json(tag_to_response(&tag)?))
}

/// DELETE /v1/tags/{id} - Delete a tag and detach it from documents (admin).
pub async fn delete_tag(
    State(state): State<AppState>,
    ApiPath(tag_id): ApiPath<Uuid>,
    req: Request,
) -> ApiResult<StatusCode> {
    require_admin(&req)?;
    state.store.delete_tag(tag_id).await?;
    tracing::info!(tag_id = %tag_id, "Tag deleted");
    Ok(StatusCode::NO_CONTENT)
}
