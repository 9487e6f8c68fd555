//! Comment endpoints.

use crate::auth::{AuthenticatedUser, require_admin, require_auth};
use crate::error::{ApiError, ApiResult};
use crate::handlers::common::{
    ApiPath, ensure_visible, format_timestamp, read_json,
};
use crate::metrics::COMMENTS_CREATED;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use folio_core::Thread;
use folio_core::comment::validate_comment_content;
use folio_store::models::{CommentRow, CommentWithAuthorRow};
use folio_store::repos::{CommentRepo, DocumentRepo, UserRepo};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: String,
    pub content: String,
    pub document_id: String,
    pub parent_id: Option<String>,
    pub published: bool,
    pub author_id: String,
    pub author_name: String,
    pub author_avatar: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

fn comment_to_response(
    comment: &CommentRow,
    author_name: String,
    author_avatar: Option<String>,
) -> ApiResult<CommentResponse> {
    Ok(CommentResponse {
        id: comment.id.to_string(),
        content: comment.content.clone(),
        document_id: comment.document_id.to_string(),
        parent_id: comment.parent_id.map(|id| id.to_string()),
        published: comment.published,
        author_id: comment.author_id.to_string(),
        author_name,
        author_avatar,
        created_at: format_timestamp(comment.created_at)?,
        updated_at: format_timestamp(comment.updated_at)?,
    })
}

fn thread_to_response(thread: Thread<CommentWithAuthorRow>) -> ApiResult<Thread<CommentResponse>> {
    let row = thread.comment;
    Ok(Thread {
        comment: comment_to_response(&row.comment, row.author_name, row.author_avatar)?,
        replies: thread
            .replies
            .into_iter()
            .map(thread_to_response)
            .collect::<ApiResult<Vec<_>>>()?,
    })
}

/// Threaded comments of a document.
#[derive(Debug, Serialize)]
pub struct CommentThreadResponse {
    pub comments: Vec<Thread<CommentResponse>>,
    /// Number of comments across all threads.
    pub total: usize,
}

pub fn threads_to_response(
    threads: Vec<Thread<CommentWithAuthorRow>>,
) -> ApiResult<CommentThreadResponse> {
    let total = threads.iter().map(Thread::count).sum();
    let comments = threads
        .into_iter()
        .map(thread_to_response)
        .collect::<ApiResult<Vec<_>>>()?;
    Ok(CommentThreadResponse { comments, total })
}

/// Load a comment the caller may modify.
async fn load_owned_comment(
    state: &AppState,
    auth: &AuthenticatedUser,
    comment_id: Uuid,
) -> ApiResult<CommentRow> {
    let comment = state
        .store
        .get_comment(comment_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("comment not found".to_string()))?;
    auth.require_owner_or_admin(comment.author_id)?;
    Ok(comment)
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
    pub document_id: Uuid,
    pub parent_id: Option<Uuid>,
}

/// POST /v1/comments - Comment on a document or reply to a comment.
pub async fn create_comment(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<(StatusCode, Json<CommentResponse>)> {
    let auth = require_auth(&req)?.clone();
    let body: CreateCommentRequest = read_json(req, state.config.server.max_body_bytes).await?;

    let content = validate_comment_content(&body.content)?;

    let document = state
        .store
        .get_document(body.document_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("document not found".to_string()))?;
    ensure_visible(document.published, Some(&auth))?;

    if let Some(parent_id) = body.parent_id {
        let parent = state
            .store
            .get_comment(parent_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("parent comment not found".to_string()))?;
        if parent.document_id != document.id {
            return Err(ApiError::BadRequest(
                "parent comment belongs to a different document".to_string(),
            ));
        }
    }

    let now = OffsetDateTime::now_utc();
    let comment = CommentRow {
        id: Uuid::new_v4(),
        content,
        author_id: auth.id(),
        document_id: document.id,
        parent_id: body.parent_id,
        published: true,
        created_at: now,
        updated_at: now,
    };
    state.store.create_comment(&comment).await?;
    COMMENTS_CREATED.inc();
    tracing::info!(
        comment_id = %comment.id,
        document_id = %comment.document_id,
        reply = comment.parent_id.is_some(),
        "Comment created"
    );

    let response = comment_to_response(&comment, auth.user.name.clone(), auth.user.avatar.clone())?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateCommentRequest {
    pub content: String,
}

/// PUT /v1/comments/{id} - Edit a comment (author or admin).
pub async fn update_comment(
    State(state): State<AppState>,
    ApiPath(comment_id): ApiPath<Uuid>,
    req: Request,
) -> ApiResult<Json<CommentResponse>> {
    let auth = require_auth(&req)?.clone();
    let body: UpdateCommentRequest = read_json(req, state.config.server.max_body_bytes).await?;

    let mut comment = load_owned_comment(&state, &auth, comment_id).await?;
    let content = validate_comment_content(&body.content)?;

    let now = OffsetDateTime::now_utc();
    state
        .store
        .update_comment_content(comment_id, &content, now)
        .await?;
    comment.content = content;
    comment.updated_at = now;

    let (author_name, author_avatar) = match state.store.get_user(comment.author_id).await? {
        Some(author) => (author.name, author.avatar),
        None => (String::new(), None),
    };

    Ok(Json(comment_to_response(&comment, author_name, author_avatar)?))
}

/// DELETE /v1/comments/{id} - Delete a comment and its replies (author or admin).
pub async fn delete_comment(
    State(state): State<AppState>,
    ApiPath(comment_id): ApiPath<Uuid>,
    req: Request,
) -> ApiResult<StatusCode> {
    let auth = require_auth(&req)?;
    load_owned_comment(&state, auth, comment_id).await?;

    state.store.delete_comment(comment_id).await?;
    tracing::info!(comment_id = %comment_id, deleted_by = %auth.id(), "Comment deleted");

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct TogglePublishedResponse {
    pub id: String,
    pub published: bool,
}

/// POST /v1/comments/{id}/toggle-published - Hide or show a comment (admin).
pub async fn toggle_comment_published(
    State(state): State<AppState>,
    ApiPath(comment_id): ApiPath<Uuid>,
    req: Request,
) -> ApiResult<Json<TogglePublishedResponse>> {
    require_admin(&req)?;

    let comment = state
        .store
        .get_comment(comment_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("comment not found".to_string()))?;
    let published = !comment.published;

    state
        .store
        .set_comment_published(comment_id, published, OffsetDateTime::now_utc())
        .await?;
    tracing::info!(comment_id = %comment_id, published = published, "Comment visibility changed");

    Ok(Json(TogglePublishedResponse {
        id: comment_id.to_string(),
        published,
    }))
}
