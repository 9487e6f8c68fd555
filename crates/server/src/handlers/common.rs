//! Shared handler helpers and response types.

use crate::auth::AuthenticatedUser;
use crate::error::{ApiError, ApiResult};
use axum::extract::{FromRequestParts, Path, Query, Request};
use axum::http::request::Parts;
use folio_store::models::{CategoryRow, DocumentDetailRow, TagRow, UserRow};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Read and parse a JSON request body of at most `limit` bytes.
pub async fn read_json<T: DeserializeOwned>(req: Request, limit: usize) -> ApiResult<T> {
    let bytes = axum::body::to_bytes(req.into_body(), limit)
        .await
        .map_err(|e| ApiError::BadRequest(format!("failed to read body: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::BadRequest(format!("invalid JSON: {e}")))
}

/// [`Path`] whose rejection is an [`ApiError`] JSON body.
#[derive(Debug)]
pub struct ApiPath<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// [`Query`] whose rejection is an [`ApiError`] JSON body.
#[derive(Debug)]
pub struct ApiQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// Distinguish an absent field (`None`) from an explicit `null` (`Some(None)`).
///
/// Use with `#[serde(default, deserialize_with = "nullable")]`.
pub fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub fn format_timestamp(ts: OffsetDateTime) -> ApiResult<String> {
    ts.format(&Rfc3339)
        .map_err(|e| ApiError::Internal(format!("failed to format timestamp: {e}")))
}

pub fn format_optional_timestamp(ts: Option<OffsetDateTime>) -> ApiResult<Option<String>> {
    ts.map(format_timestamp).transpose()
}

/// Treat empty (after trimming) optional text as absent.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Drafts are visible to administrators only; everyone else gets a 404.
pub fn ensure_visible(published: bool, auth: Option<&AuthenticatedUser>) -> ApiResult<()> {
    if published || auth.is_some_and(AuthenticatedUser::is_admin) {
        Ok(())
    } else {
        Err(ApiError::NotFound("document not found".to_string()))
    }
}

// =============================================================================
// Users
// =============================================================================

/// Public view of an account. Never carries the password hash.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub avatar: Option<String>,
    pub is_admin: bool,
    pub membership_level: String,
    pub status: String,
    pub last_login_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

pub fn user_to_response(user: &UserRow) -> ApiResult<UserResponse> {
    Ok(UserResponse {
        id: user.id.to_string(),
        email: user.email.clone(),
        name: user.name.clone(),
        avatar: user.avatar.clone(),
        is_admin: user.is_admin,
        membership_level: user.membership_level().as_str().to_string(),
        status: user.status().as_str().to_string(),
        last_login_at: format_optional_timestamp(user.last_login_at)?,
        created_at: format_timestamp(user.created_at)?,
        updated_at: format_timestamp(user.updated_at)?,
    })
}

// =============================================================================
// Taxonomy
// =============================================================================

#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub color: String,
    pub created_at: String,
}

pub fn category_to_response(category: &CategoryRow) -> ApiResult<CategoryResponse> {
    Ok(CategoryResponse {
        id: category.id.to_string(),
        name: category.name.clone(),
        slug: category.slug.clone(),
        description: category.description.clone(),
        color: category.color.clone(),
        created_at: format_timestamp(category.created_at)?,
    })
}

#[derive(Debug, Serialize)]
pub struct TagResponse {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub color: String,
    pub created_at: String,
}

pub fn tag_to_response(tag: &TagRow) -> ApiResult<TagResponse> {
    Ok(TagResponse {
        id: tag.id.to_string(),
        name: tag.name.clone(),
        slug: tag.slug.clone(),
        color: tag.color.clone(),
        created_at: format_timestamp(tag.created_at)?,
    })
}

pub fn tags_to_response(tags: &[TagRow]) -> ApiResult<Vec<TagResponse>> {
    tags.iter().map(tag_to_response).collect()
}

// =============================================================================
// Documents
// =============================================================================

#[derive(Debug, Serialize)]
pub struct AuthorSummary {
    pub id: String,
    pub name: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CategorySummary {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub color: String,
}

#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    pub id: String,
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub slug: String,
    pub keywords: Option<String>,
    pub featured_image: Option<String>,
    pub published: bool,
    pub view_count: i64,
    pub author: AuthorSummary,
    pub category: Option<CategorySummary>,
    /// Present on single-document responses only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<TagResponse>>,
    pub created_at: String,
    pub updated_at: String,
}

pub fn document_to_response(
    detail: &DocumentDetailRow,
    tags: Option<&[TagRow]>,
) -> ApiResult<DocumentResponse> {
    let doc = &detail.document;

    let category = match (
        doc.category_id,
        &detail.category_name,
        &detail.category_slug,
        &detail.category_color,
    ) {
        (Some(id), Some(name), Some(slug), Some(color)) => Some(CategorySummary {
            id: id.to_string(),
            name: name.clone(),
            slug: slug.clone(),
            color: color.clone(),
        }),
        _ => None,
    };

    Ok(DocumentResponse {
        id: doc.id.to_string(),
        title: doc.title.clone(),
        content: doc.content.clone(),
        excerpt: doc.excerpt.clone(),
        slug: doc.slug.clone(),
        keywords: doc.keywords.clone(),
        featured_image: doc.featured_image.clone(),
        published: doc.published,
        view_count: doc.view_count,
        author: AuthorSummary {
            id: doc.author_id.to_string(),
            name: detail.author_name.clone(),
            avatar: detail.author_avatar.clone(),
        },
        category,
        tags: tags.map(tags_to_response).transpose()?,
        created_at: format_timestamp(doc.created_at)?,
        updated_at: format_timestamp(doc.updated_at)?,
    })
}

/// A list of documents.
#[derive(Debug, Serialize)]
pub struct DocumentListResponse {
    pub documents: Vec<DocumentResponse>,
    pub total: usize,
}

pub fn documents_to_response(details: &[DocumentDetailRow]) -> ApiResult<DocumentListResponse> {
    let documents = details
        .iter()
        .map(|detail| document_to_response(detail, None))
        .collect::<ApiResult<Vec<_>>>()?;
    Ok(DocumentListResponse {
        total: documents.len(),
        documents,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "nullable")]
        avatar: Option<Option<String>>,
    }

    #[test]
    fn nullable_distinguishes_missing_from_null() {
        let missing: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.avatar, None);

        let null: Patch = serde_json::from_str(r#"{"avatar":null}"#).unwrap();
        assert_eq!(null.avatar, Some(None));

        let set: Patch = serde_json::from_str(r#"{"avatar":"https://a.test/x.png"}"#).unwrap();
        assert_eq!(set.avatar, Some(Some("https://a.test/x.png".to_string())));
    }

    #[test]
    fn non_empty_trims_and_drops_blank() {
        assert_eq!(non_empty(Some("  ".to_string())), None);
        assert_eq!(non_empty(Some(" hi ".to_string())), Some("hi".to_string()));
        assert_eq!(non_empty(None), None);
    }

    #[tokio::test]
    async fn read_json_rejects_oversized_and_malformed_bodies() {
        let req = Request::new(Body::from(r#"{"avatar":null}"#));
        let patch: Patch = read_json(req, 1024).await.unwrap();
        assert_eq!(patch.avatar, Some(None));

        let req = Request::new(Body::from("x".repeat(64)));
        let err = read_json::<Patch>(req, 16).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let req = Request::new(Body::from("{not json"));
        let err = read_json::<Patch>(req, 1024).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m.starts_with("invalid JSON")));
    }
}
