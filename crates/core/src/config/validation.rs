//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;
use url::Url;

const LOG_LEVELS: [&str; 4] = ["debug", "info", "warn", "error"];

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `scrape_uri` is not an absolute http(s) URL
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - caching is enabled with a zero `cache_timeout_ms` or `cache_ttl_ms`
    /// - `cache_prune_interval_ms` or `scrape_interval_ms` is 0
    /// - `user_agent` is empty
    /// - `log_level` is not one of debug, info, warn, error
    /// - `access_federation_target` is set but not a URL
    ///
    /// Returns `ConfigError::Missing` if access federation validation is
    /// enabled without a target.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match Url::parse(&self.scrape_uri) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => {
                return Err(ConfigError::Invalid {
                    field: "scrape_uri".into(),
                    reason: format!("unsupported scheme '{}'", url.scheme()),
                });
            }
            Err(e) => return Err(ConfigError::Invalid { field: "scrape_uri".into(), reason: e.to_string() }),
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.use_cache {
            if self.cache_timeout_ms == 0 {
                return Err(ConfigError::Invalid {
                    field: "cache_timeout_ms".into(),
                    reason: "must be greater than 0".into(),
                });
            }
            if self.cache_ttl_ms == 0 {
                return Err(ConfigError::Invalid { field: "cache_ttl_ms".into(), reason: "must be greater than 0".into() });
            }
            if self.cache_timeout_ms > self.timeout_ms {
                tracing::warn!(
                    cache_timeout_ms = self.cache_timeout_ms,
                    timeout_ms = self.timeout_ms,
                    "cache_timeout_ms exceeds timeout_ms; \
                     requests will hit the HTTP timeout before the cache fallback"
                );
            }
        }

        if self.cache_prune_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "cache_prune_interval_ms".into(),
                reason: "must be greater than 0".into(),
            });
        }
        if self.scrape_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "scrape_interval_ms".into(),
                reason: "must be greater than 0".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(ConfigError::Invalid {
                field: "log_level".into(),
                reason: format!("must be one of {}", LOG_LEVELS.join(", ")),
            });
        }

        match self.access_federation_target.as_deref().filter(|t| !t.is_empty()) {
            Some(target) => {
                if let Err(e) = Url::parse(target) {
                    return Err(ConfigError::Invalid {
                        field: "access_federation_target".into(),
                        reason: e.to_string(),
                    });
                }
            }
            None if self.optional_metrics.access_federation_validate => {
                return Err(ConfigError::Missing {
                    field: "access_federation_target".into(),
                    hint: "Set ARTISCRAPE_ACCESS_FEDERATION_TARGET or disable access_federation_validate".into(),
                });
            }
            None => {}
        }

        Ok(())
    }
}
