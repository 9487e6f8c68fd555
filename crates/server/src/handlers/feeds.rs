//! RSS feed and sitemap endpoints.

use crate::error::{ApiError, ApiResult};
use crate::feed::{FEED_CACHE_CONTROL, render_rss, render_sitemap};
use crate::state::AppState;
use axum::extract::State;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use folio_store::repos::{CategoryRepo, DocumentRepo, Visibility};
use time::OffsetDateTime;

fn xml_response(body: String) -> Response {
    (
        [
            (CONTENT_TYPE, "application/xml; charset=utf-8"),
            (CACHE_CONTROL, FEED_CACHE_CONTROL),
        ],
        body,
    )
        .into_response()
}

/// GET /rss.xml - Published documents as an RSS 2.0 channel.
///
/// A store failure yields an empty channel rather than an error page.
pub async fn rss_feed(State(state): State<AppState>) -> ApiResult<Response> {
    let documents = match state.store.list_documents(Visibility::Published).await {
        Ok(documents) => documents,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load documents for RSS feed");
            Vec::new()
        }
    };

    let body = render_rss(&state.config.site, &documents, OffsetDateTime::now_utc())
        .map_err(|e| ApiError::Internal(format!("failed to render RSS feed: {e}")))?;
    Ok(xml_response(body))
}

/// GET /sitemap.xml - Static pages, published documents and categories.
pub async fn sitemap(State(state): State<AppState>) -> ApiResult<Response> {
    let documents = match state.store.list_documents(Visibility::Published).await {
        Ok(documents) => documents,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load documents for sitemap");
            Vec::new()
        }
    };
    let categories = match state.store.list_categories().await {
        Ok(categories) => categories,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load categories for sitemap");
            Vec::new()
        }
    };

    let body = render_sitemap(
        &state.config.site,
        &documents,
        &categories,
        OffsetDateTime::now_utc(),
    )
    .map_err(|e| ApiError::Internal(format!("failed to render sitemap: {e}")))?;
    Ok(xml_response(body))
}
