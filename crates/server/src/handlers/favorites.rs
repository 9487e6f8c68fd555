//! Favorite endpoints.

use crate::auth::{get_auth, require_auth};
use crate::error::{ApiError, ApiResult};
use crate::handlers::common::{
    ApiPath, ApiQuery, ensure_visible, format_timestamp, read_json,
};
use crate::metrics::FAVORITES_ADDED;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use folio_store::StoreError;
use folio_store::models::{FavoriteDocumentRow, FavoriteRow};
use folio_store::repos::{DocumentRepo, FavoriteRepo, Visibility};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct FavoriteResponse {
    pub id: String,
    pub document_id: String,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub published: bool,
    pub view_count: i64,
    pub document_updated_at: String,
    pub favorited_at: String,
}

fn favorite_to_response(row: &FavoriteDocumentRow) -> ApiResult<FavoriteResponse> {
    Ok(FavoriteResponse {
        id: row.favorite_id.to_string(),
        document_id: row.document_id.to_string(),
        title: row.title.clone(),
        slug: row.slug.clone(),
        excerpt: row.excerpt.clone(),
        published: row.published,
        view_count: row.view_count,
        document_updated_at: format_timestamp(row.updated_at)?,
        favorited_at: format_timestamp(row.favorited_at)?,
    })
}

#[derive(Debug, Serialize)]
pub struct ListFavoritesResponse {
    pub favorites: Vec<FavoriteResponse>,
}

/// GET /v1/favorites - The caller's favorites. Documents that have since been
/// unpublished are left out unless the caller is an administrator.
pub async fn list_favorites(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<ListFavoritesResponse>> {
    let auth = require_auth(&req)?;

    let favorites = state
        .store
        .list_favorites(auth.id(), Visibility::for_admin(auth.is_admin()))
        .await?
        .iter()
        .map(favorite_to_response)
        .collect::<ApiResult<Vec<_>>>()?;

    Ok(Json(ListFavoritesResponse { favorites }))
}

#[derive(Debug, Deserialize)]
pub struct AddFavoriteRequest {
    pub document_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct AddFavoriteResponse {
    pub id: String,
    pub document_id: String,
    pub created_at: String,
}

/// POST /v1/favorites - Favorite a document.
pub async fn add_favorite(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<(StatusCode, Json<AddFavoriteResponse>)> {
    let auth = require_auth(&req)?.clone();
    let body: AddFavoriteRequest = read_json(req, state.config.server.max_body_bytes).await?;

    let document = state
        .store
        .get_document(body.document_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("document not found".to_string()))?;
    ensure_visible(document.published, Some(&auth))?;

    let favorite = FavoriteRow {
        id: Uuid::new_v4(),
        user_id: auth.id(),
        document_id: document.id,
        created_at: OffsetDateTime::now_utc(),
    };
    state
        .store
        .add_favorite(&favorite)
        .await
        .map_err(|e| match e {
            StoreError::AlreadyExists(_) => {
                ApiError::Conflict("document is already in favorites".to_string())
            }
            other => other.into(),
        })?;
    FAVORITES_ADDED.inc();

    Ok((
        StatusCode::CREATED,
        Json(AddFavoriteResponse {
            id: favorite.id.to_string(),
            document_id: favorite.document_id.to_string(),
            created_at: format_timestamp(favorite.created_at)?,
        }),
    ))
}

/// DELETE /v1/favorites/{document_id} - Remove a favorite.
pub async fn remove_favorite(
    State(state): State<AppState>,
    ApiPath(document_id): ApiPath<Uuid>,
    req: Request,
) -> ApiResult<StatusCode> {
    let auth = require_auth(&req)?;
    state
        .store
        .remove_favorite(auth.id(), document_id)
        .await
        .map_err(|e| match e {
            StoreError::NotFound(_) => ApiError::NotFound("favorite not found".to_string()),
            other => other.into(),
        })?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct CheckFavoriteParams {
    pub document_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct CheckFavoriteResponse {
    pub is_favorited: bool,
    /// Favorites of the document across all users.
    pub count: u64,
}

/// GET /v1/favorites/check?document_id= - Whether the caller favorited a
/// document. Anonymous callers get `false`; drafts are 404 unless admin.
pub async fn check_favorite(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<CheckFavoriteParams>,
    req: Request,
) -> ApiResult<Json<CheckFavoriteResponse>> {
    let auth = get_auth(&req).cloned();
    let document = state
        .store
        .get_document(params.document_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("document not found".to_string()))?;
    ensure_visible(document.published, auth.as_ref())?;

    let is_favorited = match auth {
        Some(auth) => {
            state
                .store
                .is_favorited(auth.id(), params.document_id)
                .await?
        }
        None => false,
    };
    let count = state.store.count_favorites(params.document_id).await?;

    Ok(Json(CheckFavoriteResponse {
        is_favorited,
        count,
    }))
}
