//! Prometheus metrics for the Folio server.
//!
//! # Security Note
//!
//! The `/metrics` endpoint is unauthenticated to allow Prometheus scraping.
//! Metrics carry no user or document identifiers, but they do expose
//! aggregate activity (logins, registrations, views).
//!
//! **Deployment Requirement**: restrict `/metrics` to the Prometheus scraper
//! at the network level, or disable it with `server.metrics_enabled = false`.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{self, Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Accounts
pub static LOGINS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("folio_logins_total", "Login attempts by outcome"),
        &["outcome"],
    )
    .expect("metric creation failed")
});

pub static REGISTRATIONS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "folio_registrations_total",
        "Total number of accounts registered",
    )
    .expect("metric creation failed")
});

pub static SESSIONS_PURGED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "folio_sessions_purged_total",
        "Expired sessions removed by the background sweep",
    )
    .expect("metric creation failed")
});

// Content
pub static DOCUMENTS_CREATED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("folio_documents_created_total", "Total documents created")
        .expect("metric creation failed")
});

pub static DOCUMENTS_DELETED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("folio_documents_deleted_total", "Total documents deleted")
        .expect("metric creation failed")
});

pub static DOCUMENT_VIEWS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "folio_document_views_total",
        "Document reads that incremented a view counter",
    )
    .expect("metric creation failed")
});

// Engagement
pub static COMMENTS_CREATED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("folio_comments_created_total", "Total comments posted")
        .expect("metric creation failed")
});

pub static FAVORITES_ADDED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("folio_favorites_added_total", "Total favorites added")
        .expect("metric creation failed")
});

// Rate limiting
pub static RATE_LIMIT_REJECTIONS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "folio_rate_limit_rejections_total",
            "Requests rejected by the rate limiter, by layer",
        ),
        &["layer"],
    )
    .expect("metric creation failed")
});

/// Guard to ensure metrics are only registered once.
static REGISTER_ONCE: Once = Once::new();

/// Register all metrics with the global registry. Safe to call repeatedly.
pub fn register_metrics() {
    REGISTER_ONCE.call_once(|| {
        REGISTRY
            .register(Box::new(LOGINS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(REGISTRATIONS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(SESSIONS_PURGED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(DOCUMENTS_CREATED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(DOCUMENTS_DELETED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(DOCUMENT_VIEWS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(COMMENTS_CREATED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(FAVORITES_ADDED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(RATE_LIMIT_REJECTIONS.clone()))
            .expect("metric registration failed");
    });
}

/// GET /metrics - Prometheus metrics endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}

/// Record a login attempt outcome (`success`, `invalid_credentials`, `disabled`).
pub fn record_login(outcome: &str) {
    LOGINS.with_label_values(&[outcome]).inc();
}
