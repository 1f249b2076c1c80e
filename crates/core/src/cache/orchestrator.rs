//! Per-request race between the live upstream call and the fallback deadline.
//!
//! A [`Cached`] is created for every outbound request. It owns the receiving
//! ends of two single-slot channels, one for responses and one for errors,
//! and, when caching is enabled, a deadline timer that pushes a
//! [`Error::CacheTimeout`] into the error channel once the fallback budget is
//! spent. The paired [`Responder`] is moved into the task performing the real
//! call and reports exactly one outcome.
//!
//! ### Lifecycle
//! - `Armed`: created, deadline running.
//! - `Fired`: the deadline pushed its timeout error and nobody has read it yet.
//! - `Consumed`: the timeout error was read by the caller.
//! - `Preempted`: the deadline expired after the call had already reported an
//!   error or gone away, so no timeout was delivered.
//! - `Disarmed`: [`Cached::close`] cancelled the timer.
//!
//! Closing cancels the timer, drains a pending timeout signal, and closes both
//! channels. Sends never block: a late responder or a deadline that lost the
//! race simply finds the slot taken or the channel closed.
//!
//! The timer only holds a weak handle on the error channel. Dropping the
//! [`Responder`] without reporting (a panicking or cancelled call) closes both
//! channels, and [`Cached::wait`] returns [`Error::RequestAborted`] at once.

use super::store::ResponseCache;
use crate::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const ARMED: u8 = 0;
const FIRED: u8 = 1;
const CONSUMED: u8 = 2;
const DISARMED: u8 = 3;
const PREEMPTED: u8 = 4;

/// Observable state of the fallback deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineState {
    /// Caching is disabled, no deadline was armed.
    Unarmed,
    Armed,
    /// The timeout error is sitting in the error channel.
    Fired,
    Consumed,
    /// The deadline expired with the call already finished or gone.
    Preempted,
    Disarmed,
}

impl DeadlineState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            ARMED => DeadlineState::Armed,
            FIRED => DeadlineState::Fired,
            CONSUMED => DeadlineState::Consumed,
            PREEMPTED => DeadlineState::Preempted,
            _ => DeadlineState::Disarmed,
        }
    }
}

struct Deadline {
    state: Arc<AtomicU8>,
    timer: JoinHandle<()>,
}

impl Deadline {
    fn arm(budget: Duration, errors: mpsc::WeakSender<Error>, key: String) -> Self {
        let state = Arc::new(AtomicU8::new(ARMED));
        let timer = tokio::spawn({
            let state = Arc::clone(&state);
            async move {
                tokio::time::sleep(budget).await;
                let Some(errors) = errors.upgrade() else {
                    // responder already gone
                    let _ = state.compare_exchange(ARMED, PREEMPTED, Ordering::AcqRel, Ordering::Acquire);
                    return;
                };
                if state.compare_exchange(ARMED, FIRED, Ordering::AcqRel, Ordering::Acquire).is_err() {
                    return;
                }
                if errors.try_send(Error::CacheTimeout(budget)).is_err() {
                    // slot already holds the upstream error
                    let _ = state.compare_exchange(FIRED, PREEMPTED, Ordering::AcqRel, Ordering::Acquire);
                    return;
                }
                tracing::warn!(key = %key, timeout = ?budget, "cached request timed out");
            }
        });
        Self { state, timer }
    }
}

/// Orchestrator for a single cached request.
///
/// Call [`Cached::wait`] once, then [`Cached::close`]. Dropping the value
/// performs the same teardown as `close`.
pub struct Cached<V> {
    key: String,
    cache: ResponseCache<V>,
    errors: mpsc::Receiver<Error>,
    responses: mpsc::Receiver<V>,
    deadline: Option<Deadline>,
    closed: bool,
}

/// Sending half handed to the task that performs the real call.
pub struct Responder<V> {
    key: String,
    cache: ResponseCache<V>,
    errors: mpsc::Sender<Error>,
    responses: mpsc::Sender<V>,
}

impl<V: Clone + Send + 'static> Cached<V> {
    /// Create the orchestrator for `key` and arm the deadline if caching is enabled.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(key: impl Into<String>, cache: &ResponseCache<V>) -> (Self, Responder<V>) {
        let key = key.into();
        let (errors_tx, errors) = mpsc::channel(1);
        let (responses_tx, responses) = mpsc::channel(1);

        let deadline = cache
            .fallback_timeout()
            .map(|budget| Deadline::arm(budget, errors_tx.downgrade(), key.clone()));

        let cached = Self { key: key.clone(), cache: cache.clone(), errors, responses, deadline, closed: false };
        let responder = Responder { key, cache: cache.clone(), errors: errors_tx, responses: responses_tx };
        (cached, responder)
    }

    /// Wait for whichever outcome arrives first.
    ///
    /// A response that is ready at the same time as an error always wins.
    pub async fn wait(&mut self) -> Result<V, Error> {
        let outcome = tokio::select! {
            biased;
            Some(response) = self.responses.recv() => Ok(response),
            Some(err) = self.errors.recv() => Err(err),
            else => Err(Error::RequestAborted(format!("request {} ended without a result", self.key))),
        };

        if let Err(Error::CacheTimeout(_)) = &outcome
            && let Some(deadline) = &self.deadline
        {
            let _ = deadline
                .state
                .compare_exchange(FIRED, CONSUMED, Ordering::AcqRel, Ordering::Acquire);
        }
        outcome
    }

    /// Last good response for this request's key, if one is still fresh.
    pub fn cached_response(&self) -> Option<V> {
        if self.cache.is_enabled() {
            tracing::debug!(key = %self.key, "looking up cached response");
        }
        self.cache.get(&self.key)
    }
}

impl<V> Cached<V> {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn state(&self) -> DeadlineState {
        match &self.deadline {
            Some(deadline) => DeadlineState::from_raw(deadline.state.load(Ordering::Acquire)),
            None => DeadlineState::Unarmed,
        }
    }

    /// Tear down the orchestrator and return the deadline state seen at close time.
    pub fn close(mut self) -> DeadlineState {
        self.shutdown()
    }

    fn shutdown(&mut self) -> DeadlineState {
        if self.closed {
            return self.state();
        }
        self.closed = true;

        let observed = match &self.deadline {
            Some(deadline) => {
                deadline.timer.abort();
                DeadlineState::from_raw(deadline.state.swap(DISARMED, Ordering::AcqRel))
            }
            None => DeadlineState::Unarmed,
        };

        if observed == DeadlineState::Fired && self.errors.try_recv().is_ok() {
            tracing::debug!(key = %self.key, "drained pending deadline signal");
        }

        self.errors.close();
        self.responses.close();
        while self.errors.try_recv().is_ok() {}
        while self.responses.try_recv().is_ok() {}

        observed
    }
}

impl<V> Drop for Cached<V> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<V: Clone> Responder<V> {
    /// Report a successful response.
    ///
    /// The cache is refreshed first, even when the caller has already given
    /// up, so the next request for the same key can fall back to it.
    pub fn respond(self, response: V) {
        if self.cache.is_enabled() {
            tracing::debug!(key = %self.key, "caching response");
            self.cache.set(&self.key, response.clone());
        }
        if self.responses.try_send(response).is_err() {
            tracing::debug!(key = %self.key, "response arrived after the caller moved on");
        }
    }

    /// Report a failed call. The cache is never touched.
    pub fn fail(self, err: Error) {
        if let Err(err) = self.errors.try_send(err) {
            tracing::debug!(key = %self.key, error = %err.into_inner(), "discarding late upstream error");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheSettings;
    use tokio::time::{Instant, sleep};

    const BUDGET: Duration = Duration::from_millis(500);

    fn enabled_cache() -> ResponseCache<String> {
        ResponseCache::new(CacheSettings { enabled: true, ttl: Duration::from_secs(1), fallback_timeout: BUDGET })
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeded_before_deadline() {
        let cache = enabled_cache();
        let (mut cached, responder) = Cached::new("key", &cache);
        assert_eq!(cached.state(), DeadlineState::Armed);

        tokio::spawn(async move {
            sleep(Duration::from_millis(100)).await;
            responder.respond("payload".to_string());
        });

        assert_eq!(cached.wait().await.unwrap(), "payload");
        assert_eq!(cache.get("key").as_deref(), Some("payload"));
        assert_eq!(cached.close(), DeadlineState::Armed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_before_deadline_leaves_cache_alone() {
        let cache = enabled_cache();
        cache.set("key", "good".to_string());
        let (mut cached, responder) = Cached::new("key", &cache);

        responder.fail(Error::HttpError("connection refused".into()));

        let err = cached.wait().await.unwrap_err();
        assert!(matches!(err, Error::HttpError(_)));
        assert_eq!(cached.cached_response().as_deref(), Some("good"));
        assert_eq!(cached.close(), DeadlineState::Armed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_and_consumed() {
        let cache = enabled_cache();
        let (mut cached, responder) = Cached::new("key", &cache);

        let start = Instant::now();
        let err = cached.wait().await.unwrap_err();
        assert!(matches!(err, Error::CacheTimeout(budget) if budget == BUDGET));
        assert!(start.elapsed() >= BUDGET && start.elapsed() < BUDGET + Duration::from_millis(10));
        assert_eq!(cached.state(), DeadlineState::Consumed);
        assert_eq!(cached.close(), DeadlineState::Consumed);

        // the late call still warms the cache for the next request
        responder.respond("late".to_string());
        assert_eq!(cache.get("key").as_deref(), Some("late"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_drains_fired_deadline() {
        let cache = enabled_cache();
        let (cached, _responder) = Cached::new("key", &cache);

        sleep(BUDGET + Duration::from_millis(10)).await;

        assert_eq!(cached.state(), DeadlineState::Fired);
        assert_eq!(cached.close(), DeadlineState::Fired);
    }

    #[tokio::test(start_paused = true)]
    async fn test_response_wins_over_simultaneous_timeout() {
        let cache = enabled_cache();
        let (mut cached, responder) = Cached::new("key", &cache);

        responder.respond("payload".to_string());
        sleep(BUDGET + Duration::from_millis(10)).await;
        assert_eq!(cached.state(), DeadlineState::Preempted);

        assert_eq!(cached.wait().await.unwrap(), "payload");
        assert_eq!(cached.close(), DeadlineState::Preempted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_upstream_error_occupies_slot_before_deadline() {
        let cache = enabled_cache();
        let (mut cached, responder) = Cached::new("key", &cache);

        responder.fail(Error::HttpError("reset".into()));
        sleep(BUDGET + Duration::from_millis(10)).await;

        assert!(matches!(cached.wait().await, Err(Error::HttpError(_))));
        assert_eq!(cached.close(), DeadlineState::Preempted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_preempted_by_error_held_in_slot() {
        let cache = enabled_cache();
        let (mut cached, responder) = Cached::new("key", &cache);
        let errors = responder.errors.clone();

        responder.fail(Error::HttpError("reset".into()));
        sleep(BUDGET + Duration::from_millis(10)).await;
        assert_eq!(cached.state(), DeadlineState::Preempted);

        assert!(matches!(cached.wait().await, Err(Error::HttpError(_))));
        drop(errors);
        assert_eq!(cached.close(), DeadlineState::Preempted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_responder_aborts_before_deadline() {
        let cache = enabled_cache();
        let (mut cached, responder) = Cached::new("key", &cache);
        let start = Instant::now();

        drop(responder);

        assert!(matches!(cached.wait().await, Err(Error::RequestAborted(_))));
        assert!(start.elapsed() < Duration::from_millis(10));
        assert_eq!(cached.close(), DeadlineState::Armed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_before_deadline_disarms_timer() {
        let cache = enabled_cache();
        let (cached, _responder) = Cached::new("key", &cache);
        let state = Arc::clone(&cached.deadline.as_ref().unwrap().state);

        assert_eq!(cached.close(), DeadlineState::Armed);
        sleep(BUDGET * 2).await;

        assert_eq!(DeadlineState::from_raw(state.load(Ordering::Acquire)), DeadlineState::Disarmed);
    }

    #[tokio::test]
    async fn test_disabled_cache_arms_no_deadline() {
        let cache: ResponseCache<String> = ResponseCache::disabled();
        let (mut cached, responder) = Cached::new("key", &cache);
        assert_eq!(cached.state(), DeadlineState::Unarmed);

        responder.respond("payload".to_string());

        assert_eq!(cached.wait().await.unwrap(), "payload");
        assert_eq!(cached.cached_response(), None);
        assert_eq!(cached.close(), DeadlineState::Unarmed);
    }

    #[tokio::test]
    async fn test_dropped_responder_without_deadline() {
        let cache: ResponseCache<String> = ResponseCache::disabled();
        let (mut cached, responder) = Cached::new("key", &cache);
        drop(responder);

        assert!(matches!(cached.wait().await, Err(Error::RequestAborted(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_without_close_is_clean() {
        let cache = enabled_cache();
        let (cached, responder) = Cached::new("key", &cache);
        sleep(BUDGET + Duration::from_millis(10)).await;
        drop(cached);

        responder.fail(Error::HttpError("late".into()));
        assert_eq!(cache.get("key"), None);
    }
}
