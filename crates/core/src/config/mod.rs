//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (ARTISCRAPE_*)
//! 2. TOML config file (if ARTISCRAPE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::cache::CacheSettings;

mod validation;

pub use validation::ConfigError;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Logfmt,
    Json,
}

/// Collectors that are off unless explicitly enabled.
///
/// Set via `ARTISCRAPE_OPTIONAL_METRICS__<NAME>` environment variables or an
/// `[optional_metrics]` table in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionalMetrics {
    /// AQL queries counting recently created and downloaded artifacts.
    pub artifacts: bool,
    /// Per-repository status lookup for enabled replications.
    pub replication_status: bool,
    /// Federation mirror lag and unavailable mirrors.
    pub federation_status: bool,
    pub open_metrics: bool,
    /// Validation of the configured access federation target.
    pub access_federation_validate: bool,
    pub background_tasks: bool,
}

/// Resolved authentication scheme for the management API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// HTTP basic auth.
    UserPass { username: String, password: String },
    /// Bearer access token.
    AccessToken(String),
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (ARTISCRAPE_*)
/// 2. TOML config file (if ARTISCRAPE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URI of the Artifactory instance to scrape.
    ///
    /// Set via ARTISCRAPE_SCRAPE_URI environment variable.
    #[serde(default = "default_scrape_uri")]
    pub scrape_uri: String,

    /// Whether TLS certificates of the scrape URI are verified.
    ///
    /// Set via ARTISCRAPE_SSL_VERIFY environment variable.
    #[serde(default)]
    pub ssl_verify: bool,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via ARTISCRAPE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Basic auth user, used together with `password`.
    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Bearer access token, mutually exclusive with username/password.
    #[serde(default)]
    pub access_token: Option<String>,

    /// Cache API responses and serve them when a request fails or times out.
    ///
    /// Set via ARTISCRAPE_USE_CACHE environment variable.
    #[serde(default)]
    pub use_cache: bool,

    /// How long a cached request may run before falling back to the cache.
    ///
    /// Set via ARTISCRAPE_CACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_cache_timeout_ms")]
    pub cache_timeout_ms: u64,

    /// Time to live of cached responses.
    ///
    /// Set via ARTISCRAPE_CACHE_TTL_MS environment variable.
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,

    /// Interval between sweeps that drop expired responses.
    #[serde(default = "default_cache_prune_interval_ms")]
    pub cache_prune_interval_ms: u64,

    /// Interval between scrape cycles.
    #[serde(default = "default_scrape_interval_ms")]
    pub scrape_interval_ms: u64,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default)]
    pub log_format: LogFormat,

    /// One of debug, info, warn, error. `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub optional_metrics: OptionalMetrics,

    /// URL of the access federation target server. Required when
    /// `optional_metrics.access_federation_validate` is enabled.
    #[serde(default)]
    pub access_federation_target: Option<String>,
}

fn default_scrape_uri() -> String {
    "http://localhost:8081/artifactory".into()
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_cache_timeout_ms() -> u64 {
    30_000
}

fn default_cache_ttl_ms() -> u64 {
    300_000 // 5m
}

fn default_cache_prune_interval_ms() -> u64 {
    60_000
}

fn default_scrape_interval_ms() -> u64 {
    30_000
}

fn default_user_agent() -> String {
    "artiscrape/0.1".into()
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scrape_uri: default_scrape_uri(),
            ssl_verify: false,
            timeout_ms: default_timeout_ms(),
            username: None,
            password: None,
            access_token: None,
            use_cache: false,
            cache_timeout_ms: default_cache_timeout_ms(),
            cache_ttl_ms: default_cache_ttl_ms(),
            cache_prune_interval_ms: default_cache_prune_interval_ms(),
            scrape_interval_ms: default_scrape_interval_ms(),
            user_agent: default_user_agent(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            optional_metrics: OptionalMetrics::default(),
            access_federation_target: None,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn cache_prune_interval(&self) -> Duration {
        Duration::from_millis(self.cache_prune_interval_ms)
    }

    pub fn scrape_interval(&self) -> Duration {
        Duration::from_millis(self.scrape_interval_ms)
    }

    /// Settings for the response cache.
    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings {
            enabled: self.use_cache,
            ttl: Duration::from_millis(self.cache_ttl_ms),
            fallback_timeout: Duration::from_millis(self.cache_timeout_ms),
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `ARTISCRAPE_`
    /// 2. TOML file from `ARTISCRAPE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("ARTISCRAPE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("ARTISCRAPE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Resolve the authentication scheme.
    ///
    /// Exactly one of username + password or an access token must be set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` for any other combination.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        let non_empty = |value: &Option<String>| value.as_deref().filter(|v| !v.is_empty()).map(str::to_string);

        match (non_empty(&self.username), non_empty(&self.password), non_empty(&self.access_token)) {
            (Some(username), Some(password), None) => Ok(Credentials::UserPass { username, password }),
            (None, None, Some(token)) => Ok(Credentials::AccessToken(token)),
            _ => Err(ConfigError::Missing {
                field: "credentials".into(),
                hint: "Set ARTISCRAPE_USERNAME and ARTISCRAPE_PASSWORD, or ARTISCRAPE_ACCESS_TOKEN".into(),
            }),
        }
    }
}
