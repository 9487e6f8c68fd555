//! Route configuration.

use crate::auth::auth_middleware;
use crate::handlers;
use crate::metrics::metrics_handler;
use crate::ratelimit::{ip_rate_limit_middleware, user_rate_limit_middleware};
use crate::state::AppState;
use axum::Router;
use axum::middleware;
use axum::routing::{delete, get, patch, post, put};
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Health check (intentionally unauthenticated for load balancers/k8s probes)
        .route("/v1/health", get(handlers::health_check))
        // Accounts and sessions
        .route("/v1/auth/register", post(handlers::register))
        .route("/v1/auth/login", post(handlers::login))
        .route("/v1/auth/logout", post(handlers::logout))
        .route("/v1/auth/whoami", get(handlers::whoami))
        .route("/v1/auth/change-password", post(handlers::change_password))
        // Documents
        .route(
            "/v1/documents",
            get(handlers::list_documents).post(handlers::create_document),
        )
        .route("/v1/documents/search", get(handlers::search_documents))
        .route(
            "/v1/documents/by-slug/{slug}",
            get(handlers::get_document_by_slug),
        )
        .route(
            "/v1/documents/{document_id}",
            get(handlers::get_document)
                .put(handlers::update_document)
                .delete(handlers::delete_document),
        )
        .route(
            "/v1/documents/{document_id}/tags",
            get(handlers::get_document_tags),
        )
        .route(
            "/v1/documents/{document_id}/comments",
            get(handlers::get_document_comments),
        )
        // Categories (slug for reads, id for writes; matchit needs one name)
        .route(
            "/v1/categories",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route(
            "/v1/categories/{category}/documents",
            get(handlers::list_category_documents),
        )
        .route(
            "/v1/categories/{category}",
            put(handlers::update_category).delete(handlers::delete_category),
        )
        // Tags
        .route(
            "/v1/tags",
            get(handlers::list_tags).post(handlers::create_tag),
        )
        .route("/v1/tags/resolve", post(handlers::resolve_tags))
        .route(
            "/v1/tags/{tag_id}",
            put(handlers::update_tag).delete(handlers::delete_tag),
        )
        // Comments
        .route("/v1/comments", post(handlers::create_comment))
        .route(
            "/v1/comments/{comment_id}",
            put(handlers::update_comment).delete(handlers::delete_comment),
        )
        .route(
            "/v1/comments/{comment_id}/toggle-published",
            post(handlers::toggle_comment_published),
        )
        // Favorites
        .route(
            "/v1/favorites",
            get(handlers::list_favorites).post(handlers::add_favorite),
        )
        .route("/v1/favorites/check", get(handlers::check_favorite))
        .route(
            "/v1/favorites/{document_id}",
            delete(handlers::remove_favorite),
        )
        // User administration (all require an administrator)
        .route("/v1/admin/users", get(handlers::list_users))
        .route(
            "/v1/admin/users/{user_id}",
            get(handlers::get_user)
                .patch(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route(
            "/v1/admin/users/{user_id}/status",
            patch(handlers::update_user_status),
        )
        .route("/v1/admin/stats", get(handlers::get_stats));

    let feed_routes = Router::new()
        .route("/rss.xml", get(handlers::rss_feed))
        .route("/sitemap.xml", get(handlers::sitemap));

    let mut router = Router::new().merge(api_routes).merge(feed_routes);

    // Unauthenticated; keep it off public listeners.
    if state.config.server.metrics_enabled {
        let metrics_routes = Router::new().route("/metrics", get(metrics_handler));
        router = router.merge(metrics_routes);
    }

    let rate_limit_state = state.rate_limit.clone();

    // Middleware layers are applied in reverse order (outermost first).
    // Order of execution: TraceLayer -> IP rate limit -> Auth -> User rate limit -> Handler
    router
        // Per-user rate limiting (runs after auth has identified the caller)
        .layer(middleware::from_fn_with_state(
            rate_limit_state.clone(),
            user_rate_limit_middleware,
        ))
        // Auth middleware (resolves the session and sets AuthenticatedUser)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        // Per-IP rate limiting (runs before auth, catches unauthenticated abuse)
        .layer(middleware::from_fn_with_state(
            rate_limit_state,
            ip_rate_limit_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
