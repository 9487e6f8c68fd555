//! Folio server binary.

use anyhow::{Context, Result};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use folio_core::config::AppConfig;
use folio_server::bootstrap::ensure_admin_user;
use folio_server::metrics::SESSIONS_PURGED;
use folio_server::{AppState, create_router};
use folio_store::BlogStore;
use folio_store::repos::{SessionRepo, UserRepo};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Folio - a blog and CMS backend
#[derive(Parser, Debug)]
#[command(name = "foliod")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "FOLIO_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Folio v{}", env!("CARGO_PKG_VERSION"));

    // The file is optional; FOLIO_* environment variables can provide or
    // override everything.
    let config_path = std::path::Path::new(&args.config);
    let mut figment = Figment::new();

    if config_path.exists() {
        tracing::info!(config_path = %args.config, "Loading configuration from file");
        figment = figment.merge(Toml::file(&args.config));
    } else {
        tracing::info!(
            config_path = %args.config,
            "No config file found, using defaults and environment variables"
        );
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("FOLIO_").split("__"))
        .extract()
        .context("failed to load configuration")?;

    let warnings = config
        .validate()
        .map_err(|e| anyhow::anyhow!(e))
        .context("invalid configuration")?;
    for warning in warnings {
        tracing::warn!("Configuration warning: {}", warning);
    }

    folio_server::metrics::register_metrics();
    tracing::info!("Prometheus metrics registered");

    let store = folio_store::from_config(&config.database)
        .await
        .context("failed to initialize database")?;
    store
        .health_check()
        .await
        .context("database health check failed")?;
    tracing::info!("Database initialized");

    match &config.admin {
        Some(admin) => {
            let outcome = ensure_admin_user(store.as_ref(), admin)
                .await
                .context("failed to bootstrap administrator")?;
            tracing::info!(outcome = ?outcome, "Administrator bootstrap finished");
        }
        None => tracing::info!("No bootstrap administrator configured"),
    }

    let bind = config.server.bind.clone();
    let state = AppState::new(config, store);

    if let Some(cleanup_interval) = state.rate_limit_cleanup_interval() {
        folio_server::ratelimit::spawn_cleanup_task(state.rate_limit.clone(), cleanup_interval);
        tracing::info!(
            interval_secs = cleanup_interval.as_secs(),
            "Rate limiter cleanup task spawned"
        );
    }

    let purge_interval = state.session_purge_interval();
    spawn_session_purge_task(state.store.clone(), purge_interval);
    tracing::info!(
        interval_secs = purge_interval.as_secs(),
        "Expired session sweep spawned"
    );

    let app = create_router(state);

    let addr: SocketAddr = bind.parse().context("invalid bind address")?;
    tracing::info!("Listening on {}", addr);

    // ConnectInfo feeds client IPs to the rate limiter.
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Delete sessions that have expired by now.
async fn purge_expired_sessions(store: &dyn BlogStore) -> Result<u64> {
    let purged = store
        .purge_expired_sessions(OffsetDateTime::now_utc())
        .await
        .context("failed to purge expired sessions")?;
    if purged > 0 {
        SESSIONS_PURGED.inc_by(purged);
        tracing::info!(purged = purged, "Expired sessions purged");
    }
    Ok(purged)
}

fn spawn_session_purge_task(
    store: Arc<dyn BlogStore>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if let Err(e) = purge_expired_sessions(store.as_ref()).await {
                tracing::error!(error = %e, "Expired session sweep failed");
            }
        }
    })
}
