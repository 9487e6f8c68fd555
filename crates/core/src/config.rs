//! Configuration types shared across crates.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use time::Duration;

/// HTTP server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Enable the /metrics endpoint for Prometheus scraping (default: true).
    /// SECURITY: When enabled, ensure this endpoint is network-restricted
    /// to authorized Prometheus scraper IPs only at the infrastructure level.
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
    /// Largest accepted JSON request body in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            metrics_enabled: default_metrics_enabled(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// PostgreSQL SSL mode configuration.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PgSslMode {
    /// Disable SSL/TLS entirely.
    Disable,
    /// Prefer SSL/TLS but allow unencrypted connections (default).
    #[default]
    Prefer,
    /// Require SSL/TLS for all connections.
    Require,
}

/// Database configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DatabaseConfig {
    /// SQLite database file (single node deployments and tests).
    Sqlite {
        /// Database file path.
        path: PathBuf,
        /// Query timeout in seconds. Advisory only: SQLite cannot cancel a
        /// running statement.
        #[serde(default = "default_sqlite_query_timeout_secs")]
        query_timeout_secs: Option<u64>,
    },
    /// PostgreSQL database.
    Postgres {
        /// Connection URL. Takes precedence over individual fields.
        url: Option<String>,
        /// Database host.
        host: Option<String>,
        /// Database port (default: 5432).
        #[serde(default = "default_pg_port")]
        port: Option<u16>,
        /// Database username.
        username: Option<String>,
        /// Database password.
        /// WARNING: Prefer FOLIO_DATABASE__PASSWORD env var over storing in config.
        password: Option<String>,
        /// Database name.
        database: Option<String>,
        /// SSL mode for connections.
        ssl_mode: Option<PgSslMode>,
        /// Maximum connections in the pool.
        #[serde(default = "default_max_connections")]
        max_connections: u32,
        /// Statement timeout in milliseconds.
        #[serde(default = "default_statement_timeout_ms")]
        statement_timeout_ms: Option<u64>,
    },
}

fn default_max_connections() -> u32 {
    10
}

fn default_pg_port() -> Option<u16> {
    Some(5432)
}

fn default_statement_timeout_ms() -> Option<u64> {
    Some(30_000)
}

fn default_sqlite_query_timeout_secs() -> Option<u64> {
    Some(30)
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("./data/folio.db"),
            query_timeout_secs: default_sqlite_query_timeout_secs(),
        }
    }
}

impl DatabaseConfig {
    /// Validate database configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            DatabaseConfig::Sqlite { .. } => Ok(()),
            DatabaseConfig::Postgres {
                url,
                host,
                database,
                max_connections,
                ..
            } => {
                if *max_connections == 0 {
                    return Err("postgres max_connections must be at least 1".to_string());
                }
                match (url.as_ref(), host.as_ref(), database.as_ref()) {
                    (Some(_), _, _) => Ok(()),
                    (None, Some(_), Some(_)) => Ok(()),
                    (None, None, _) => Err(
                        "postgres config requires either 'url' or 'host' + 'database'".to_string(),
                    ),
                    (None, Some(_), None) => Err(
                        "postgres config requires 'database' when using individual fields"
                            .to_string(),
                    ),
                }
            }
        }
    }
}

/// Session and cookie settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Session lifetime in seconds (default: 7 days).
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
    /// Name of the session cookie.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Mark the session cookie `Secure` (set when served over HTTPS).
    #[serde(default)]
    pub cookie_secure: bool,
    /// Seconds between sweeps that delete expired sessions.
    #[serde(default = "default_session_purge_interval_secs")]
    pub session_purge_interval_secs: u64,
}

fn default_session_ttl_secs() -> u64 {
    7 * 24 * 60 * 60
}

fn default_cookie_name() -> String {
    "folio_session".to_string()
}

fn default_session_purge_interval_secs() -> u64 {
    3600
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: default_session_ttl_secs(),
            cookie_name: default_cookie_name(),
            cookie_secure: false,
            session_purge_interval_secs: default_session_purge_interval_secs(),
        }
    }
}

impl AuthConfig {
    /// Session lifetime as a Duration.
    pub fn session_ttl(&self) -> Duration {
        let secs = i64::try_from(self.session_ttl_secs).unwrap_or(i64::MAX);
        Duration::seconds(secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.session_ttl_secs == 0 {
            return Err("auth.session_ttl_secs must be greater than 0".to_string());
        }
        let cookie_ok = !self.cookie_name.is_empty()
            && self
                .cookie_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !cookie_ok {
            return Err(format!(
                "auth.cookie_name '{}' must be non-empty ASCII alphanumerics, '_' or '-'",
                self.cookie_name
            ));
        }
        if self.session_purge_interval_secs == 0 {
            return Err("auth.session_purge_interval_secs cannot be 0".to_string());
        }
        Ok(())
    }
}

/// Bootstrap administrator.
///
/// When present, an account with this email is created at startup (or
/// promoted to admin if it already exists). An existing password is never
/// overwritten.
#[derive(Debug, Deserialize)]
pub struct AdminConfig {
    /// Administrator email address.
    pub email: String,
    /// Display name (default: "Administrator").
    #[serde(default = "default_admin_name")]
    pub name: String,
    /// Initial password.
    /// WARNING: Prefer FOLIO_ADMIN__PASSWORD env var over storing in config.
    pub password: SecretString,
}

fn default_admin_name() -> String {
    "Administrator".to_string()
}

/// Public site identity used by the RSS feed and sitemap.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Absolute base URL of the public site, without trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_site_title")]
    pub title: String,
    #[serde(default = "default_site_description")]
    pub description: String,
    /// RSS channel language tag.
    #[serde(default = "default_site_language")]
    pub language: String,
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_site_title() -> String {
    "Folio".to_string()
}

fn default_site_description() -> String {
    "Articles, notes and essays".to_string()
}

fn default_site_language() -> String {
    "en".to_string()
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            title: default_site_title(),
            description: default_site_description(),
            language: default_site_language(),
        }
    }
}

impl SiteConfig {
    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(format!(
                "site.base_url '{}' must start with http:// or https://",
                self.base_url
            ));
        }
        Ok(())
    }
}

/// Rate limiting configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    #[serde(default)]
    pub enabled: bool,
    /// Requests per minute per client IP.
    #[serde(default = "default_ip_requests_per_minute")]
    pub ip_requests_per_minute: u32,
    /// Requests per minute per signed-in user.
    #[serde(default = "default_user_requests_per_minute")]
    pub user_requests_per_minute: u32,
    /// Burst size (allows temporary burst above rate limit).
    #[serde(default = "default_burst_size")]
    pub burst_size: u32,
    /// Trusted proxy IP addresses/CIDR ranges.
    /// Forwarded headers are only honored from these peers. `["*"]` trusts
    /// every peer and should only be used in development.
    #[serde(default)]
    pub trusted_proxies: Vec<String>,
    /// Maximum number of tracked keys per limiter before new keys are rejected.
    #[serde(default = "default_max_entries")]
    pub max_entries: u32,
    /// Interval in seconds between cleanup sweeps of stale entries.
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
    /// Entries not seen for this many seconds are evicted during cleanup.
    #[serde(default = "default_entry_ttl_secs")]
    pub entry_ttl_secs: u64,
}

fn default_ip_requests_per_minute() -> u32 {
    120
}

fn default_user_requests_per_minute() -> u32 {
    600
}

fn default_burst_size() -> u32 {
    20
}

fn default_max_entries() -> u32 {
    100_000
}

fn default_cleanup_interval_secs() -> u64 {
    60
}

fn default_entry_ttl_secs() -> u64 {
    300
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ip_requests_per_minute: default_ip_requests_per_minute(),
            user_requests_per_minute: default_user_requests_per_minute(),
            burst_size: default_burst_size(),
            trusted_proxies: Vec::new(),
            max_entries: default_max_entries(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            entry_ttl_secs: default_entry_ttl_secs(),
        }
    }
}

impl RateLimitConfig {
    /// Validate rate limit configuration.
    /// Returns warnings for insecure-but-allowed settings and an error for
    /// settings that cannot work.
    pub fn validate(&self) -> Result<Vec<String>, String> {
        let mut warnings = Vec::new();

        if !self.enabled {
            return Ok(warnings);
        }

        if self.cleanup_interval_secs == 0 {
            return Err("rate_limit.cleanup_interval_secs cannot be 0".to_string());
        }

        if self.trusted_proxies.len() == 1 && self.trusted_proxies[0] == "*" {
            warnings.push(
                "rate_limit.trusted_proxies=['*'] trusts all forwarded headers; \
                 clients can spoof their IP address"
                    .to_string(),
            );
        }

        if self.entry_ttl_secs < 120 {
            warnings.push(format!(
                "rate_limit.entry_ttl_secs={} is shorter than two rate windows; \
                 limits may reset early",
                self.entry_ttl_secs
            ));
        }

        Ok(warnings)
    }
}

/// Complete application configuration.
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    /// Bootstrap administrator (optional).
    pub admin: Option<AdminConfig>,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl AppConfig {
    /// Create a test configuration with sensible defaults.
    ///
    /// **For testing only.** Uses the default SQLite path and no bootstrap admin.
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            admin: None,
            site: SiteConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }

    /// Validate every section. Returns accumulated warnings on success.
    pub fn validate(&self) -> Result<Vec<String>, String> {
        self.database.validate()?;
        self.auth.validate()?;
        self.site.validate()?;
        if self.server.max_body_bytes == 0 {
            return Err("server.max_body_bytes must be greater than 0".to_string());
        }
        self.rate_limit.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_server_config_defaults() {
        let config: ServerConfig = serde_json::from_str("{}").unwrap();
        assert!(config.metrics_enabled);
        assert_eq!(config.bind, "127.0.0.1:8080");
        assert_eq!(config.max_body_bytes, 1024 * 1024);
    }

    #[test]
    fn test_database_config_sqlite_tagged() {
        let config: DatabaseConfig =
            serde_json::from_str(r#"{"type":"sqlite","path":"/tmp/folio.db"}"#).unwrap();
        match config {
            DatabaseConfig::Sqlite {
                path,
                query_timeout_secs,
            } => {
                assert_eq!(path, PathBuf::from("/tmp/folio.db"));
                assert_eq!(query_timeout_secs, Some(30));
            }
            other => panic!("expected sqlite, got {other:?}"),
        }
    }

    #[test]
    fn test_database_config_postgres_requires_target() {
        let config: DatabaseConfig =
            serde_json::from_str(r#"{"type":"postgres","host":"db"}"#).unwrap();
        assert!(config.validate().is_err());

        let config: DatabaseConfig =
            serde_json::from_str(r#"{"type":"postgres","url":"postgres://u@db/folio"}"#).unwrap();
        config.validate().unwrap();
    }

    #[test]
    fn test_auth_config_rejects_bad_cookie_name() {
        let config = AuthConfig {
            cookie_name: "bad name;".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
        AuthConfig::default().validate().unwrap();
        assert_eq!(AuthConfig::default().session_ttl(), Duration::days(7));
    }

    #[test]
    fn test_admin_config_password_is_redacted() {
        let admin: AdminConfig =
            serde_json::from_str(r#"{"email":"root@example.com","password":"changeme1"}"#)
                .unwrap();
        assert_eq!(admin.name, "Administrator");
        assert_eq!(admin.password.expose_secret(), "changeme1");
        assert!(!format!("{admin:?}").contains("changeme1"));
    }

    #[test]
    fn test_site_base_url_trimmed() {
        let site = SiteConfig {
            base_url: "https://blog.example.com/".to_string(),
            ..Default::default()
        };
        assert_eq!(site.base_url(), "https://blog.example.com");
        site.validate().unwrap();

        let site = SiteConfig {
            base_url: "blog.example.com".to_string(),
            ..Default::default()
        };
        assert!(site.validate().is_err());
    }

    #[test]
    fn test_rate_limit_validation() {
        let config = RateLimitConfig {
            enabled: true,
            cleanup_interval_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RateLimitConfig {
            enabled: true,
            trusted_proxies: vec!["*".to_string()],
            entry_ttl_secs: 60,
            ..Default::default()
        };
        assert_eq!(config.validate().unwrap().len(), 2);
    }

    #[test]
    fn test_app_config_for_testing_is_valid() {
        let config = AppConfig::for_testing();
        assert!(config.admin.is_none());
        assert!(config.validate().unwrap().is_empty());
    }
}
