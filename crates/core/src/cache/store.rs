//! In-memory TTL store for upstream responses.
//!
//! Lookups re-check entry age themselves, so an expired entry is never handed
//! out even if [`ResponseCache::prune`] has not run yet. Pruning only bounds
//! memory.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Plain-data cache configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Whether responses are cached at all.
    pub enabled: bool,
    /// Age after which an entry is no longer served.
    pub ttl: Duration,
    /// How long a request may run before the cached response is used instead.
    pub fallback_timeout: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { enabled: false, ttl: Duration::from_secs(5 * 60), fallback_timeout: Duration::from_secs(30) }
    }
}

/// Cached response with the instant it was stored.
struct CacheEntry<V> {
    response: V,
    stored_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.duration_since(self.stored_at) > ttl
    }
}

struct Inner<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    ttl: Duration,
    fallback_timeout: Duration,
}

/// Shared handle to the response cache.
///
/// Cloning is cheap and every clone sees the same entries. A disabled cache is
/// still a usable value: it always misses and ignores writes.
pub struct ResponseCache<V> {
    inner: Option<Arc<Inner<V>>>,
}

impl<V> Clone for ResponseCache<V> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<V> fmt::Debug for ResponseCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Some(inner) => f
                .debug_struct("ResponseCache")
                .field("entries", &inner.entries.read().len())
                .field("ttl", &inner.ttl)
                .field("fallback_timeout", &inner.fallback_timeout)
                .finish(),
            None => f.write_str("ResponseCache(disabled)"),
        }
    }
}

impl<V: Clone> ResponseCache<V> {
    /// Create a cache from settings; returns a disabled cache when `enabled` is false.
    pub fn new(settings: CacheSettings) -> Self {
        if !settings.enabled {
            return Self::disabled();
        }
        Self {
            inner: Some(Arc::new(Inner {
                entries: RwLock::new(HashMap::new()),
                ttl: settings.ttl,
                fallback_timeout: settings.fallback_timeout,
            })),
        }
    }

    pub fn disabled() -> Self {
        Self { inner: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.inner.as_ref().map(|inner| inner.ttl)
    }

    /// Deadline budget for a cached request, `None` when caching is disabled.
    pub fn fallback_timeout(&self) -> Option<Duration> {
        self.inner.as_ref().map(|inner| inner.fallback_timeout)
    }

    /// Look up a response that is still within its TTL.
    ///
    /// Expired entries are reported as missing but left in place.
    pub fn get(&self, key: &str) -> Option<V> {
        let inner = self.inner.as_ref()?;
        let entries = inner.entries.read();
        let entry = entries.get(key)?;
        if entry.is_expired(Instant::now(), inner.ttl) {
            return None;
        }
        Some(entry.response.clone())
    }

    /// Store a response, replacing any previous entry for the key.
    pub fn set(&self, key: &str, response: V) {
        if let Some(inner) = &self.inner {
            let entry = CacheEntry { response, stored_at: Instant::now() };
            inner.entries.write().insert(key.to_string(), entry);
        }
    }

    /// Remove every entry older than the TTL and return how many were removed.
    pub fn prune(&self) -> usize {
        let Some(inner) = &self.inner else {
            return 0;
        };
        let mut entries = inner.entries.write();
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now, inner.ttl));
        let removed = before - entries.len();
        tracing::debug!(removed, remaining = entries.len(), "pruned response cache");
        removed
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.inner.as_ref().map_or(0, |inner| inner.entries.read().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
