//! Core types and shared functionality for artiscrape.
//!
//! This crate provides:
//! - In-memory response cache with timeout fallback
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheSettings, ResponseCache, fetch_with_cache, request_fingerprint};
pub use config::{AppConfig, ConfigError, Credentials, LogFormat, OptionalMetrics};
pub use error::Error;
