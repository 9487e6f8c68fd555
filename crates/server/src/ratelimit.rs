//! Rate limiting middleware using the token bucket algorithm.
//!
//! Two layers share one implementation ([`KeyedBucket`]):
//! - Per-IP limiting for all requests (applied before authentication)
//! - Per-user limiting for signed-in requests (applied after authentication)
//!
//! # Memory Safety
//!
//! Each layer tracks at most `max_entries` keys. Keys not seen for
//! `entry_ttl_secs` are evicted by a background task, and the governor
//! limiter is rebuilt after large evictions because its internal map cannot
//! drop keys.
//!
//! `X-Forwarded-For` / `X-Real-IP` are read only when the peer matches
//! `trusted_proxies` (`["*"]` trusts everyone and is meant for development).

use crate::metrics::RATE_LIMIT_REJECTIONS;
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::{DashMap, mapref::entry::Entry};
use folio_core::config::RateLimitConfig;
use governor::{
    Quota, RateLimiter, clock::DefaultClock, middleware::NoOpMiddleware, state::InMemoryState,
};
use ipnet::IpNet;
use std::{
    net::{IpAddr, SocketAddr},
    num::NonZeroU32,
    sync::{
        Arc, RwLock,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

type KeyedLimiter =
    RateLimiter<String, DashMap<String, InMemoryState>, DefaultClock, NoOpMiddleware>;

/// Minimum eviction threshold as a fraction of tracked keys before a rebuild.
const REBUILD_EVICTION_THRESHOLD_FRACTION: f64 = 0.10;

/// Evictions that always justify a rebuild.
const REBUILD_EVICTION_MIN_COUNT: usize = 100;

/// Rebuild at least this often while keys are being evicted.
const REBUILD_MIN_INTERVAL: Duration = Duration::from_secs(300);

/// Suggested retry delay when a layer cannot track new keys.
const AT_CAPACITY_RETRY_SECS: u64 = 60;

/// One keyed token-bucket layer with eviction bookkeeping.
struct KeyedBucket {
    /// Label used in logs and metrics ("ip" or "user").
    kind: &'static str,
    quota: Quota,
    limiter: RwLock<KeyedLimiter>,
    last_access: DashMap<String, Instant>,
    last_rebuild: RwLock<Instant>,
    max_entries: u32,
    at_capacity_warned: AtomicBool,
}

impl KeyedBucket {
    fn new(kind: &'static str, quota: Quota, max_entries: u32) -> Self {
        Self {
            kind,
            quota,
            limiter: RwLock::new(RateLimiter::dashmap(quota)),
            last_access: DashMap::new(),
            last_rebuild: RwLock::new(Instant::now()),
            max_entries,
            at_capacity_warned: AtomicBool::new(false),
        }
    }

    fn check(&self, key: &str) -> Result<(), RateLimitError> {
        let now = Instant::now();

        // len() must not run while an entry guard is held.
        let current_len = self.last_access.len();
        let at_capacity = current_len >= self.max_entries as usize;

        match self.last_access.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                entry.insert(now);
            }
            Entry::Vacant(entry) => {
                if at_capacity {
                    self.warn_at_capacity(current_len);
                    return Err(RateLimitError {
                        retry_after_secs: AT_CAPACITY_RETRY_SECS,
                        reason: RateLimitReason::AtCapacity,
                    });
                }
                entry.insert(now);
            }
        }

        let limiter = self.limiter.read().unwrap_or_else(|poisoned| {
            tracing::warn!(kind = self.kind, "rate limiter lock was poisoned, recovering");
            poisoned.into_inner()
        });
        let key = key.to_string();
        match limiter.check_key(&key) {
            Ok(_) => Ok(()),
            Err(not_until) => {
                let wait_time =
                    not_until.wait_time_from(governor::clock::Clock::now(&DefaultClock::default()));
                Err(RateLimitError {
                    retry_after_secs: wait_time.as_secs() + 1,
                    reason: RateLimitReason::RateLimited,
                })
            }
        }
    }

    /// Evict keys idle longer than `ttl`. Returns the number evicted.
    fn evict_stale(&self, now: Instant, ttl: Duration) -> usize {
        let stale: Vec<String> = self
            .last_access
            .iter()
            .filter(|entry| now.duration_since(*entry.value()) > ttl)
            .map(|entry| entry.key().clone())
            .collect();

        // remove_if re-checks so a key touched since the scan survives.
        let evicted = stale
            .iter()
            .filter(|key| {
                self.last_access
                    .remove_if(*key, |_, last| now.duration_since(*last) > ttl)
                    .is_some()
            })
            .count();

        if evicted == 0 {
            return 0;
        }

        let before = self.last_access.len() + evicted;
        if self.should_rebuild(evicted, before, now) {
            self.rebuild();
            tracing::debug!(
                kind = self.kind,
                evicted = evicted,
                remaining = self.last_access.len(),
                "Rebuilt rate limiter after cleanup"
            );
        } else {
            tracing::trace!(
                kind = self.kind,
                evicted = evicted,
                remaining = self.last_access.len(),
                "Skipped rate limiter rebuild (below threshold)"
            );
        }
        self.at_capacity_warned.store(false, Ordering::Relaxed);

        evicted
    }

    fn should_rebuild(&self, evicted: usize, entries_before: usize, now: Instant) -> bool {
        let by_fraction = (entries_before as f64 * REBUILD_EVICTION_THRESHOLD_FRACTION) as usize;
        if evicted >= by_fraction.max(REBUILD_EVICTION_MIN_COUNT) {
            return true;
        }

        let last = self.last_rebuild.read().unwrap_or_else(|poisoned| {
            tracing::warn!(kind = self.kind, "last_rebuild lock was poisoned, recovering");
            poisoned.into_inner()
        });
        now.duration_since(*last) >= REBUILD_MIN_INTERVAL
    }

    /// Replace the governor limiter, dropping the state of evicted keys.
    /// Active keys restart with a full bucket.
    fn rebuild(&self) {
        let mut limiter = self.limiter.write().unwrap_or_else(|poisoned| {
            tracing::warn!(kind = self.kind, "rate limiter lock was poisoned during rebuild");
            poisoned.into_inner()
        });
        *limiter = RateLimiter::dashmap(self.quota);

        let mut last_rebuild = self.last_rebuild.write().unwrap_or_else(|poisoned| {
            tracing::warn!(kind = self.kind, "last_rebuild lock was poisoned, recovering");
            poisoned.into_inner()
        });
        *last_rebuild = Instant::now();
    }

    /// Warn once per capacity event to avoid log spam under attack.
    fn warn_at_capacity(&self, current_entries: usize) {
        if !self.at_capacity_warned.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                current_entries = current_entries,
                max_entries = self.max_entries,
                kind = self.kind,
                "Rate limiter at capacity, rejecting new keys"
            );
        }
    }
}

/// Rate limiter state shared across requests.
#[derive(Clone)]
pub struct RateLimitState {
    inner: Option<Arc<RateLimitStateInner>>,
}

/// Only allocated when rate limiting is enabled.
struct RateLimitStateInner {
    ip: KeyedBucket,
    user: KeyedBucket,
    trusted_proxies: TrustedProxies,
    entry_ttl: Duration,
    connect_info_warned: AtomicBool,
}

/// Peers whose forwarded headers are believed.
#[derive(Clone, Debug)]
enum TrustedProxies {
    None,
    All,
    /// Bare addresses are stored as single-host networks.
    Networks(Vec<IpNet>),
}

impl TrustedProxies {
    fn from_config(proxies: &[String]) -> Self {
        match proxies {
            [] => Self::None,
            [only] if only == "*" => Self::All,
            entries => Self::Networks(
                entries
                    .iter()
                    .filter_map(|entry| {
                        let parsed = if entry.contains('/') {
                            entry.parse::<IpNet>().map_err(|e| e.to_string())
                        } else {
                            entry
                                .parse::<IpAddr>()
                                .map(IpNet::from)
                                .map_err(|e| e.to_string())
                        };
                        parsed
                            .inspect_err(|error| {
                                tracing::warn!(entry = %entry, %error, "ignoring trusted proxy entry")
                            })
                            .ok()
                    })
                    .collect(),
            ),
        }
    }

    fn is_trusted(&self, peer: &str) -> bool {
        match self {
            Self::None => false,
            Self::All => true,
            Self::Networks(networks) => peer
                .parse::<IpAddr>()
                .is_ok_and(|ip| networks.iter().any(|net| net.contains(&ip))),
        }
    }
}

fn per_minute_quota(requests_per_minute: u32, burst: u32) -> Quota {
    Quota::per_minute(NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN))
        .allow_burst(NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN))
}

impl RateLimitState {
    /// Create a new rate limit state from configuration.
    pub fn new(config: &RateLimitConfig) -> Self {
        if !config.enabled {
            return Self { inner: None };
        }

        let ip_quota = per_minute_quota(config.ip_requests_per_minute, config.burst_size);
        // Signed-in readers get twice the burst.
        let user_quota = per_minute_quota(
            config.user_requests_per_minute,
            config.burst_size.saturating_mul(2),
        );

        Self {
            inner: Some(Arc::new(RateLimitStateInner {
                ip: KeyedBucket::new("ip", ip_quota, config.max_entries),
                user: KeyedBucket::new("user", user_quota, config.max_entries),
                trusted_proxies: TrustedProxies::from_config(&config.trusted_proxies),
                entry_ttl: Duration::from_secs(config.entry_ttl_secs),
                connect_info_warned: AtomicBool::new(false),
            })),
        }
    }

    /// Check if a request from the given IP is allowed.
    pub fn check_ip(&self, ip: &str) -> Result<(), RateLimitError> {
        match &self.inner {
            Some(inner) => inner.ip.check(ip),
            None => Ok(()),
        }
    }

    /// Check if a request from the given user is allowed.
    pub fn check_user(&self, user_id: &str) -> Result<(), RateLimitError> {
        match &self.inner {
            Some(inner) => inner.user.check(user_id),
            None => Ok(()),
        }
    }

    /// Check if rate limiting is enabled.
    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Evict stale keys from both layers. Returns the number evicted.
    pub fn cleanup(&self) -> usize {
        let Some(inner) = &self.inner else {
            return 0;
        };

        let now = Instant::now();
        let ip_evicted = inner.ip.evict_stale(now, inner.entry_ttl);
        let user_evicted = inner.user.evict_stale(now, inner.entry_ttl);
        let total = ip_evicted + user_evicted;

        if total > 0 {
            tracing::debug!(
                total_evicted = total,
                ip_evicted = ip_evicted,
                user_evicted = user_evicted,
                ip_entries = inner.ip.last_access.len(),
                user_entries = inner.user.last_access.len(),
                "Rate limiter cleanup completed"
            );
        }

        total
    }

    /// Number of tracked (ip, user) keys.
    pub fn entry_count(&self) -> (usize, usize) {
        match &self.inner {
            Some(inner) => (inner.ip.last_access.len(), inner.user.last_access.len()),
            None => (0, 0),
        }
    }

    fn warn_connect_info_missing(&self) {
        if let Some(inner) = &self.inner
            && !inner.connect_info_warned.swap(true, Ordering::Relaxed)
        {
            tracing::warn!(
                "ConnectInfo not available for rate limiting. All requests share the \
                 'unknown' IP bucket. Serve with into_make_service_with_connect_info::<SocketAddr>()."
            );
        }
    }
}

/// Reason for rate limit rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitReason {
    /// Request exceeded rate limit.
    RateLimited,
    /// Rate limiter at capacity, cannot track new keys.
    AtCapacity,
}

/// Error returned when rate limit is exceeded.
#[derive(Debug)]
pub struct RateLimitError {
    /// Number of seconds to wait before retrying.
    pub retry_after_secs: u64,
    /// Reason for the rate limit.
    pub reason: RateLimitReason,
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        let (code, message) = match self.reason {
            RateLimitReason::RateLimited => (
                "rate_limit_exceeded",
                format!(
                    "Rate limit exceeded. Retry after {} seconds.",
                    self.retry_after_secs
                ),
            ),
            RateLimitReason::AtCapacity => (
                "rate_limiter_at_capacity",
                "Server is experiencing high load. Please retry later.".to_string(),
            ),
        };

        let body = serde_json::json!({
            "code": code,
            "message": message,
            "retry_after": self.retry_after_secs,
        });

        (
            StatusCode::TOO_MANY_REQUESTS,
            [("Retry-After", self.retry_after_secs.to_string())],
            axum::Json(body),
        )
            .into_response()
    }
}

fn extract_forwarded_ip(req: &Request<Body>) -> Option<String> {
    if let Some(forwarded) = req.headers().get("x-forwarded-for")
        && let Ok(s) = forwarded.to_str()
        && let Some(ip) = s.split(',').next()
    {
        return Some(ip.trim().to_string());
    }

    if let Some(real_ip) = req.headers().get("x-real-ip")
        && let Ok(s) = real_ip.to_str()
    {
        return Some(s.trim().to_string());
    }

    None
}

fn extract_connection_ip(req: &Request<Body>) -> Option<String> {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
}

/// Client IP for rate limiting, honoring `trusted_proxies`.
fn extract_ip(req: &Request<Body>, state: &RateLimitState) -> String {
    let Some(inner) = &state.inner else {
        return "unknown".to_string();
    };

    let connection_ip = extract_connection_ip(req);

    let trust_headers = match (&connection_ip, &inner.trusted_proxies) {
        (None, TrustedProxies::All) => true,
        // A listed proxy cannot be verified without the peer address.
        (None, _) => false,
        (Some(conn_ip), trusted_proxies) => trusted_proxies.is_trusted(conn_ip),
    };

    if trust_headers && let Some(forwarded_ip) = extract_forwarded_ip(req) {
        return forwarded_ip;
    }

    match connection_ip {
        Some(ip) => ip,
        None => {
            state.warn_connect_info_missing();
            "unknown".to_string()
        }
    }
}

/// Per-IP rate limiting middleware. Runs before authentication.
pub async fn ip_rate_limit_middleware(
    State(rate_limit): State<RateLimitState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if !rate_limit.is_enabled() {
        return next.run(req).await;
    }

    let ip = extract_ip(&req, &rate_limit);

    match rate_limit.check_ip(&ip) {
        Ok(_) => next.run(req).await,
        Err(e) => {
            RATE_LIMIT_REJECTIONS.with_label_values(&["ip"]).inc();
            e.into_response()
        }
    }
}

/// Per-user rate limiting middleware. Runs after authentication; anonymous
/// requests pass through to the IP layer's decision.
pub async fn user_rate_limit_middleware(
    State(rate_limit): State<RateLimitState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if !rate_limit.is_enabled() {
        return next.run(req).await;
    }

    let Some(user) = req.extensions().get::<UserIdExtension>() else {
        return next.run(req).await;
    };

    match rate_limit.check_user(&user.0) {
        Ok(_) => next.run(req).await,
        Err(e) => {
            RATE_LIMIT_REJECTIONS.with_label_values(&["user"]).inc();
            e.into_response()
        }
    }
}

/// Extension carrying the signed-in user's id for rate limiting.
#[derive(Clone)]
pub struct UserIdExtension(pub String);

/// Spawn a background task that periodically evicts stale rate limiter keys.
pub fn spawn_cleanup_task(
    state: RateLimitState,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let evicted = state.cleanup();
            if evicted > 0 {
                tracing::info!(
                    evicted = evicted,
                    "Rate limiter cleanup task evicted stale entries"
                );
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_state_allows_everything() {
        let state = RateLimitState::new(&RateLimitConfig::default());
        assert!(!state.is_enabled());
        assert!(state.check_ip("127.0.0.1").is_ok());
        assert!(state.check_user("user-1").is_ok());
        assert_eq!(state.cleanup(), 0);
    }

    #[test]
    fn burst_is_enforced_per_ip() {
        let config = RateLimitConfig {
            enabled: true,
            ip_requests_per_minute: 60,
            burst_size: 5,
            max_entries: 1000,
            ..Default::default()
        };
        let state = RateLimitState::new(&config);

        for _ in 0..5 {
            assert!(state.check_ip("127.0.0.1").is_ok());
        }
        let err = state.check_ip("127.0.0.1").unwrap_err();
        assert_eq!(err.reason, RateLimitReason::RateLimited);
        assert!(err.retry_after_secs >= 1);

        assert!(state.check_ip("192.168.1.1").is_ok());
    }

    #[test]
    fn users_get_double_burst() {
        let config = RateLimitConfig {
            enabled: true,
            user_requests_per_minute: 60,
            burst_size: 2,
            ..Default::default()
        };
        let state = RateLimitState::new(&config);

        for _ in 0..4 {
            assert!(state.check_user("user-1").is_ok());
        }
        assert!(state.check_user("user-1").is_err());
        assert!(state.check_user("user-2").is_ok());
    }

    #[test]
    fn new_keys_rejected_at_capacity() {
        let config = RateLimitConfig {
            enabled: true,
            burst_size: 5,
            max_entries: 3,
            ..Default::default()
        };
        let state = RateLimitState::new(&config);

        assert!(state.check_ip("1.1.1.1").is_ok());
        assert!(state.check_ip("2.2.2.2").is_ok());
        assert!(state.check_ip("3.3.3.3").is_ok());

        let err = state.check_ip("4.4.4.4").unwrap_err();
        assert_eq!(err.reason, RateLimitReason::AtCapacity);

        assert!(state.check_ip("1.1.1.1").is_ok());
        // The user layer has its own budget.
        assert!(state.check_user("user-1").is_ok());
    }

    #[test]
    fn cleanup_evicts_idle_keys() {
        let config = RateLimitConfig {
            enabled: true,
            burst_size: 5,
            max_entries: 1000,
            entry_ttl_secs: 0,
            ..Default::default()
        };
        let state = RateLimitState::new(&config);

        assert!(state.check_ip("1.1.1.1").is_ok());
        assert!(state.check_ip("2.2.2.2").is_ok());
        assert!(state.check_user("user-1").is_ok());
        assert_eq!(state.entry_count(), (2, 1));

        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(state.cleanup(), 3);
        assert_eq!(state.entry_count(), (0, 0));
    }

    #[test]
    fn trusted_proxies_none() {
        let proxies = TrustedProxies::from_config(&[]);
        assert!(!proxies.is_trusted("127.0.0.1"));
    }

    #[test]
    fn trusted_proxies_all() {
        let proxies = TrustedProxies::from_config(&["*".to_string()]);
        assert!(proxies.is_trusted("10.0.0.1"));
        assert!(proxies.is_trusted("anything"));
    }

    #[test]
    fn trusted_proxies_networks() {
        let proxies =
            TrustedProxies::from_config(&["127.0.0.1".to_string(), "10.0.0.0/8".to_string()]);
        assert!(proxies.is_trusted("127.0.0.1"));
        assert!(proxies.is_trusted("10.255.255.255"));
        assert!(!proxies.is_trusted("192.168.1.1"));
        assert!(!proxies.is_trusted("not-an-ip"));
    }

    #[test]
    fn forwarded_header_only_from_trusted_peer() {
        let config = RateLimitConfig {
            enabled: true,
            trusted_proxies: vec!["10.0.0.0/8".to_string()],
            ..Default::default()
        };
        let state = RateLimitState::new(&config);

        let request_from = |peer: &str| {
            let mut req = Request::builder()
                .header("x-forwarded-for", "203.0.113.7, 10.0.0.2")
                .body(Body::empty())
                .unwrap();
            let addr: SocketAddr = format!("{peer}:4000").parse().unwrap();
            req.extensions_mut().insert(ConnectInfo(addr));
            req
        };

        assert_eq!(extract_ip(&request_from("10.0.0.2"), &state), "203.0.113.7");
        assert_eq!(extract_ip(&request_from("198.51.100.1"), &state), "198.51.100.1");
    }
}
