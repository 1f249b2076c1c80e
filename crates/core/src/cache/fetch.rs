//! Cached request entry point.

use super::orchestrator::Cached;
use super::store::ResponseCache;
use crate::Error;
use std::future::Future;

/// Run `call` in the background and return its result, falling back to the
/// cache when it fails or outlives the fallback deadline.
///
/// - A successful call refreshes the cache, even when it completes after the
///   deadline and this function has already returned.
/// - A failed call never touches the cache.
/// - When no fresh cached response exists the original error is returned.
/// - With caching disabled the call simply runs to completion.
pub async fn fetch_with_cache<V, F>(cache: &ResponseCache<V>, key: impl Into<String>, call: F) -> Result<V, Error>
where
    V: Clone + Send + Sync + 'static,
    F: Future<Output = Result<V, Error>> + Send + 'static,
{
    let (mut cached, responder) = Cached::new(key, cache);

    tokio::spawn(async move {
        match call.await {
            Ok(response) => responder.respond(response),
            Err(err) => responder.fail(err),
        }
    });

    let result = match cached.wait().await {
        Ok(response) => Ok(response),
        Err(err) if cache.is_enabled() => {
            tracing::warn!(key = %cached.key(), error = %err, "request failed, falling back to cache");
            match cached.cached_response() {
                Some(response) => {
                    tracing::debug!(key = %cached.key(), "serving cached response");
                    Ok(response)
                }
                None => Err(err),
            }
        }
        Err(err) => Err(err),
    };

    cached.close();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheSettings;
    use std::time::Duration;
    use tokio::time::{Instant, sleep};

    fn cache() -> ResponseCache<String> {
        ResponseCache::new(CacheSettings {
            enabled: true,
            ttl: Duration::from_secs(1),
            fallback_timeout: Duration::from_millis(500),
        })
    }

    async fn exploding_call() -> Result<String, Error> {
        panic!("upstream call panicked")
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_refreshes_cache() {
        let cache = cache();
        let result = fetch_with_cache(&cache, "K", async { Ok("fresh".to_string()) }).await;

        assert_eq!(result.unwrap(), "fresh");
        assert_eq!(cache.get("K").as_deref(), Some("fresh"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_falls_back_to_cache() {
        let cache = cache();
        cache.set("K", "cached".to_string());

        let result = fetch_with_cache(&cache, "K", async { Err(Error::HttpError("connection refused".into())) }).await;

        assert_eq!(result.unwrap(), "cached");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_without_cache_returns_original_error_immediately() {
        let cache = cache();
        let start = Instant::now();

        let result = fetch_with_cache(&cache, "K", async {
            Err(Error::Api { message: "forbidden".into(), endpoint: "system/ping".into(), status: Some(403) })
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.status(), Some(403));
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_call_serves_cache_within_budget() {
        let cache = cache();
        cache.set("K", "cached".to_string());
        let start = Instant::now();

        let result = fetch_with_cache(&cache, "K", async {
            sleep(Duration::from_secs(2)).await;
            Ok("late".to_string())
        })
        .await;

        assert_eq!(result.unwrap(), "cached");
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(500) && elapsed < Duration::from_secs(2));

        // the background call keeps running and warms the cache
        sleep(Duration::from_secs(2)).await;
        assert_eq!(cache.get("K").as_deref(), Some("late"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_call_without_cache_times_out() {
        let cache = cache();

        let result = fetch_with_cache(&cache, "K", async {
            sleep(Duration::from_secs(2)).await;
            Ok("late".to_string())
        })
        .await;

        assert!(matches!(result, Err(Error::CacheTimeout(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_is_not_a_fallback() {
        let cache = cache();
        cache.set("K", "stale".to_string());
        sleep(Duration::from_secs(2)).await;

        let result = fetch_with_cache(&cache, "K", async { Err(Error::HttpError("reset".into())) }).await;

        assert!(matches!(result, Err(Error::HttpError(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_does_not_overwrite_cache() {
        let cache = cache();
        cache.set("K", "good".to_string());

        let _ = fetch_with_cache(&cache, "K", async { Err(Error::HttpError("reset".into())) }).await;

        assert_eq!(cache.get("K").as_deref(), Some("good"));
    }

    #[tokio::test]
    async fn test_disabled_cache_propagates_errors() {
        let cache: ResponseCache<String> = ResponseCache::disabled();

        let ok = fetch_with_cache(&cache, "K", async { Ok("direct".to_string()) }).await;
        assert_eq!(ok.unwrap(), "direct");
        assert!(cache.get("K").is_none());

        let err = fetch_with_cache(&cache, "K", async { Err(Error::HttpError("reset".into())) }).await;
        assert!(matches!(err, Err(Error::HttpError(_))));
    }

    #[tokio::test]
    async fn test_panicking_call_is_reported() {
        let cache: ResponseCache<String> = ResponseCache::disabled();

        let result = fetch_with_cache(&cache, "K", exploding_call()).await;

        assert!(matches!(result, Err(Error::RequestAborted(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_call_with_cache_enabled_returns_immediately() {
        let cache = cache();
        let start = Instant::now();

        let result = fetch_with_cache(&cache, "K", exploding_call()).await;

        assert!(matches!(result, Err(Error::RequestAborted(_))));
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_call_falls_back_to_cache() {
        let cache = cache();
        cache.set("K", "cached".to_string());
        let start = Instant::now();

        let result = fetch_with_cache(&cache, "K", exploding_call()).await;

        assert_eq!(result.unwrap(), "cached");
        assert!(start.elapsed() < Duration::from_millis(500));
    }
}
