//! Application state shared across handlers.

use crate::ratelimit::RateLimitState;
use folio_core::config::AppConfig;
use folio_store::BlogStore;
use std::sync::Arc;
use std::time::Duration;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Relational store.
    pub store: Arc<dyn BlogStore>,
    /// Rate limiting state.
    pub rate_limit: RateLimitState,
}

impl AppState {
    /// Create a new application state.
    ///
    /// This performs configuration validation and logs warnings for potentially
    /// dangerous settings.
    ///
    /// # Panics
    ///
    /// Panics if configuration validation fails with an error.
    pub fn new(config: AppConfig, store: Arc<dyn BlogStore>) -> Self {
        match config.validate() {
            Ok(warnings) => {
                for warning in warnings {
                    tracing::warn!("Configuration warning: {}", warning);
                }
            }
            Err(error) => {
                panic!("Invalid configuration: {}", error);
            }
        }

        let rate_limit = RateLimitState::new(&config.rate_limit);

        Self {
            config: Arc::new(config),
            store,
            rate_limit,
        }
    }

    /// Get the cleanup interval for the rate limiter, if enabled.
    /// A configured zero falls back to 60 seconds so `tokio::time::interval`
    /// never sees a zero period.
    pub fn rate_limit_cleanup_interval(&self) -> Option<Duration> {
        if self.rate_limit.is_enabled() {
            let interval_secs = self.config.rate_limit.cleanup_interval_secs;
            if interval_secs == 0 {
                tracing::warn!(
                    "rate_limit.cleanup_interval_secs is 0, using default of 60 seconds"
                );
                Some(Duration::from_secs(60))
            } else {
                Some(Duration::from_secs(interval_secs))
            }
        } else {
            None
        }
    }

    /// Period of the expired-session sweep.
    pub fn session_purge_interval(&self) -> Duration {
        Duration::from_secs(self.config.auth.session_purge_interval_secs.max(1))
    }
}
