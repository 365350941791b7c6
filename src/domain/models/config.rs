use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::edit_lock::{default_lease, DEFAULT_LEASE_MS};

/// Main configuration structure for ideaboard
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// TTL cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Fetch service configuration
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Edit lock configuration
    #[serde(default)]
    pub lock: LockConfig,

    /// Remote endpoint configuration
    #[serde(default)]
    pub endpoint: EndpointConfig,

    /// Session credentials
    #[serde(default)]
    pub auth: AuthConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Cache settings for the entity fetch service: `cache`, with the TTL
    /// replaced by `fetch.entity_ttl_ms` when that is set.
    pub fn entity_cache(&self) -> CacheConfig {
        let mut cache = self.cache.clone();
        if let Some(ttl_ms) = self.fetch.entity_ttl_ms {
            cache.default_ttl_ms = ttl_ms;
        }
        cache
    }
}

/// TTL cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CacheConfig {
    /// TTL applied when `set` is called without one
    #[serde(default = "default_cache_ttl_ms")]
    pub default_ttl_ms: u64,

    /// Run a background sweep of expired entries
    #[serde(default)]
    pub auto_cleanup: bool,

    /// Interval between background sweeps
    #[serde(default = "default_cleanup_interval_ms")]
    pub cleanup_interval_ms: u64,
}

const fn default_cache_ttl_ms() -> u64 {
    5 * 60 * 1000
}

const fn default_cleanup_interval_ms() -> u64 {
    60 * 1000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_ms: default_cache_ttl_ms(),
            auto_cleanup: false,
            cleanup_interval_ms: default_cleanup_interval_ms(),
        }
    }
}

impl CacheConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_millis(self.default_ttl_ms)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms)
    }
}

/// Fetch service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FetchConfig {
    /// How long a fetched entity stays fresh. Falls back to
    /// `cache.default_ttl_ms` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_ttl_ms: Option<u64>,
}

/// Edit lock configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LockConfig {
    /// Lease after which an unreleased edit lock is treated as free
    #[serde(default = "default_lease_ms")]
    pub lease_ms: u64,
}

const fn default_lease_ms() -> u64 {
    DEFAULT_LEASE_MS
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            lease_ms: default_lease_ms(),
        }
    }
}

impl LockConfig {
    pub fn lease(&self) -> chrono::Duration {
        chrono::Duration::from_std(Duration::from_millis(self.lease_ms))
            .unwrap_or_else(|_| default_lease())
    }
}

/// Remote endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EndpointConfig {
    /// Base URL of the backend (REST and auth live under it)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Public API key sent as the `apikey` header
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:54321".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Session credentials used by the CLI
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AuthConfig {
    #[serde(default)]
    pub access_token: Option<String>,

    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Id of the signed-in user, used as the edit lock owner
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".ideaboard/ideaboard.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stderr only when unset
    #[serde(default)]
    pub log_dir: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
        }
    }
}
