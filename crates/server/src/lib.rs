//! HTTP API server for the Folio CMS.
//!
//! This crate provides:
//! - Account registration, cookie/bearer sessions and password changes
//! - Document, category, tag, comment and favorite endpoints
//! - User administration and dashboard statistics
//! - RSS feed and sitemap
//! - Rate limiting, Prometheus metrics and health checks

pub mod auth;
pub mod bootstrap;
pub mod error;
pub mod feed;
pub mod handlers;
pub mod metrics;
pub mod ratelimit;
pub mod routes;
pub mod state;

pub use auth::{AuthenticatedUser, TraceId};
pub use error::ApiError;
pub use ratelimit::{RateLimitState, UserIdExtension};
pub use routes::create_router;
pub use state::AppState;
