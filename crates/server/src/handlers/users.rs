//! User administration endpoints. All of them require an administrator.

use crate::auth::require_admin;
use crate::error::{ApiError, ApiResult};
use crate::handlers::common::{
    ApiPath, ApiQuery, UserResponse, non_empty, nullable, read_json, user_to_response,
};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use folio_core::user::{validate_avatar_url, validate_email, validate_user_name};
use folio_core::{MembershipLevel, UserStatus};
use folio_store::models::{SiteStats, UserRow};
use folio_store::repos::{
    DocumentRepo, SessionRepo, SortOrder, UserFilter, UserQuery, UserRepo, UserSortField,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct ListUsersParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    /// Substring of name or email.
    pub search: Option<String>,
    pub membership_level: Option<String>,
    pub status: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl ListUsersParams {
    /// Validate paging, filters and sort into a store query.
    fn into_query(self) -> ApiResult<(UserQuery, u32, u32)> {
        let page = self.page.unwrap_or(1);
        if page == 0 {
            return Err(ApiError::BadRequest("page must be at least 1".to_string()));
        }
        let page_size = self.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(ApiError::BadRequest(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }

        let membership_level = non_empty(self.membership_level)
            .map(|level| MembershipLevel::parse(&level))
            .transpose()?;
        let status = non_empty(self.status)
            .map(|status| UserStatus::parse(&status))
            .transpose()?;

        let sort_by = match non_empty(self.sort_by) {
            Some(field) => UserSortField::parse(&field)
                .ok_or_else(|| ApiError::BadRequest(format!("cannot sort by '{field}'")))?,
            None => UserSortField::default(),
        };
        let sort_order = match non_empty(self.sort_order) {
            Some(order) => SortOrder::parse(&order.to_ascii_lowercase()).ok_or_else(|| {
                ApiError::BadRequest("sort_order must be 'asc' or 'desc'".to_string())
            })?,
            None => SortOrder::default(),
        };

        let query = UserQuery {
            filter: UserFilter {
                search: non_empty(self.search),
                membership_level: membership_level.map(|l| l.as_str().to_string()),
                status: status.map(|s| s.as_str().to_string()),
            },
            sort_by,
            sort_order,
            limit: i64::from(page_size),
            offset: (i64::from(page) - 1) * i64::from(page_size),
        };
        Ok((query, page, page_size))
    }
}

#[derive(Debug, Serialize)]
pub struct ListUsersResponse {
    pub users: Vec<UserResponse>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
}

/// GET /v1/admin/users - Page through accounts.
pub async fn list_users(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListUsersParams>,
    req: Request,
) -> ApiResult<Json<ListUsersResponse>> {
    require_admin(&req)?;
    let (query, page, page_size) = params.into_query()?;

    let users = state
        .store
        .list_users(&query)
        .await?
        .iter()
        .map(user_to_response)
        .collect::<ApiResult<Vec<_>>>()?;
    let total = state.store.count_users(&query.filter).await?;

    Ok(Json(ListUsersResponse {
        users,
        total,
        page,
        page_size,
        total_pages: total.div_ceil(u64::from(page_size)),
    }))
}

/// Follow-up after an account's status was stored: disabling signs the
/// account out everywhere.
async fn apply_status_change(state: &AppState, user_id: Uuid, status: UserStatus) -> ApiResult<()> {
    if status.is_active() {
        tracing::info!(user_id = %user_id, "User enabled");
    } else {
        let revoked = state.store.delete_user_sessions(user_id, None).await?;
        tracing::info!(user_id = %user_id, sessions_revoked = revoked, "User disabled");
    }
    Ok(())
}

async fn load_user(state: &AppState, user_id: Uuid) -> ApiResult<UserRow> {
    state
        .store
        .get_user(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))
}

/// GET /v1/admin/users/{id} - One account.
pub async fn get_user(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<Uuid>,
    req: Request,
) -> ApiResult<Json<UserResponse>> {
    require_admin(&req)?;
    let user = load_user(&state, user_id).await?;
    Ok(Json(user_to_response(&user)?))
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub membership_level: Option<String>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub avatar: Option<Option<String>>,
}

/// PATCH /v1/admin/users/{id} - Edit profile fields of an account.
pub async fn update_user(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<Uuid>,
    req: Request,
) -> ApiResult<Json<UserResponse>> {
    let admin_id = require_admin(&req)?.id();
    let body: UpdateUserRequest = read_json(req, state.config.server.max_body_bytes).await?;

    let mut user = load_user(&state, user_id).await?;
    let previous_status = user.status();

    if let Some(name) = body.name {
        user.name = validate_user_name(&name)?;
    }
    if let Some(email) = body.email {
        user.email = validate_email(&email)?;
    }
    if let Some(level) = body.membership_level {
        user.membership_level = MembershipLevel::parse(&level)?.as_str().to_string();
    }
    if let Some(status) = body.status {
        let status = UserStatus::parse(&status)?;
        if user_id == admin_id && status != user.status() {
            return Err(ApiError::BadRequest(
                "you cannot change your own status".to_string(),
            ));
        }
        user.status = status.as_str().to_string();
    }
    if let Some(avatar) = body.avatar {
        let avatar = non_empty(avatar);
        if let Some(url) = &avatar {
            validate_avatar_url(url)?;
        }
        user.avatar = avatar;
    }

    user.updated_at = OffsetDateTime::now_utc();
    state.store.update_user(&user).await?;
    tracing::info!(user_id = %user.id, updated_by = %admin_id, "User updated");
    if user.status() != previous_status {
        apply_status_change(&state, user_id, user.status()).await?;
    }

    Ok(Json(user_to_response(&user)?))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// PATCH /v1/admin/users/{id}/status - Enable or disable an account.
///
/// Disabling signs the account out everywhere.
pub async fn update_user_status(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<Uuid>,
    req: Request,
) -> ApiResult<Json<UserResponse>> {
    let admin_id = require_admin(&req)?.id();
    let body: UpdateStatusRequest = read_json(req, state.config.server.max_body_bytes).await?;

    if user_id == admin_id {
        return Err(ApiError::BadRequest(
            "you cannot change your own status".to_string(),
        ));
    }
    let status = UserStatus::parse(&body.status)?;

    let mut user = load_user(&state, user_id).await?;
    user.status = status.as_str().to_string();
    user.updated_at = OffsetDateTime::now_utc();
    state.store.update_user(&user).await?;
    apply_status_change(&state, user_id, status).await?;

    Ok(Json(user_to_response(&user)?))
}

/// DELETE /v1/admin/users/{id} - Delete an account.
///
/// Refused for the caller's own account and for users who still author
/// documents.
pub async fn delete_user(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<Uuid>,
    req: Request,
) -> ApiResult<StatusCode> {
    let admin_id = require_admin(&req)?.id();
    if user_id == admin_id {
        return Err(ApiError::BadRequest(
            "you cannot delete your own account".to_string(),
        ));
    }

    state.store.delete_user(user_id).await?;
    tracing::info!(user_id = %user_id, deleted_by = %admin_id, "User deleted");

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub documents: u64,
    pub published_documents: u64,
    pub draft_documents: u64,
    pub users: u64,
    pub comments: u64,
    pub categories: u64,
    pub tags: u64,
}

impl From<SiteStats> for StatsResponse {
    fn from(stats: SiteStats) -> Self {
        Self {
            documents: stats.documents,
            published_documents: stats.published_documents,
            draft_documents: stats.documents.saturating_sub(stats.published_documents),
            users: stats.users,
            comments: stats.comments,
            categories: stats.categories,
            tags: stats.tags,
        }
    }
}

/// GET /v1/admin/stats - Dashboard counters.
pub async fn get_stats(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<StatsResponse>> {
    require_admin(&req)?;
    let stats = state.store.site_stats().await?;
    Ok(Json(stats.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paging_defaults_and_offsets() {
        let (query, page, page_size) = ListUsersParams::default().into_query().unwrap();
        assert_eq!((page, page_size), (1, 10));
        assert_eq!((query.limit, query.offset), (10, 0));

        let params = ListUsersParams {
            page: Some(3),
            page_size: Some(25),
            ..Default::default()
        };
        let (query, _, _) = params.into_query().unwrap();
        assert_eq!((query.limit, query.offset), (25, 50));
    }

    #[test]
    fn paging_bounds_are_enforced() {
        for (page, page_size) in [(Some(0), None), (None, Some(0)), (None, Some(101))] {
            let params = ListUsersParams {
                page,
                page_size,
                ..Default::default()
            };
            assert!(matches!(params.into_query(), Err(ApiError::BadRequest(_))));
        }
    }

    #[test]
    fn filters_and_sort_are_validated() {
        let params = ListUsersParams {
            status: Some("disabled".to_string()),
            sort_by: Some("lastLoginAt".to_string()),
            sort_order: Some("ASC".to_string()),
            ..Default::default()
        };
        let (query, _, _) = params.into_query().unwrap();
        assert_eq!(query.filter.status.as_deref(), Some("disabled"));
        assert_eq!(query.sort_by, UserSortField::LastLoginAt);
        assert_eq!(query.sort_order, SortOrder::Asc);

        let params = ListUsersParams {
            sort_by: Some("password_hash".to_string()),
            ..Default::default()
        };
        assert!(matches!(params.into_query(), Err(ApiError::BadRequest(_))));

        let params = ListUsersParams {
            membership_level: Some("gold".to_string()),
            ..Default::default()
        };
        assert!(matches!(params.into_query(), Err(ApiError::Core(_))));
    }

    #[test]
    fn stats_derive_drafts() {
        let stats = SiteStats {
            documents: 5,
            published_documents: 3,
            ..SiteStats::default()
        };
        assert_eq!(StatsResponse::from(stats).draft_documents, 2);
    }
}
