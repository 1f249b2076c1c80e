//! In-memory response cache with timeout fallback.
//!
//! Upstream calls are raced against a fallback deadline. When the call fails
//! or the deadline fires first, the last good response for the same request
//! is served instead, as long as it is younger than the TTL.
//!
//! - [`ResponseCache`]: TTL store shared by all in-flight requests
//! - [`Cached`] / [`Responder`]: per-request race and teardown
//! - [`fetch_with_cache`]: the entry point request code should use
//! - [`spawn_pruner`]: periodic removal of expired entries

pub mod fetch;
pub mod fingerprint;
pub mod maintenance;
pub mod orchestrator;
pub mod store;

pub use crate::Error;

pub use fetch::fetch_with_cache;
pub use fingerprint::request_fingerprint;
pub use maintenance::spawn_pruner;
pub use orchestrator::{Cached, DeadlineState, Responder};
pub use store::{CacheSettings, ResponseCache};
