//! Unified error types for artiscrape.
//!
//! Every upstream call and every cache fallback decision reports through
//! [`Error`]. When no cached response can stand in for a failed call the
//! original error is returned unchanged, so callers can still inspect the
//! HTTP status or the endpoint that failed.

use std::time::Duration;

/// Unified error types for the request path.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters or unusable client configuration.
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// The management API answered with a non-success status.
    #[error("API_ERROR: {endpoint}: {message}")]
    Api { message: String, endpoint: String, status: Option<u16> },

    /// A response body could not be decoded.
    #[error("UNMARSHAL_FAILED: {endpoint}: {message}")]
    Unmarshal { message: String, endpoint: String },

    /// Transport-level failure (connect, TLS, reading the body).
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),

    /// The HTTP client's own request timeout elapsed.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// The fallback deadline elapsed before the upstream call answered.
    #[error("CACHE_TIMEOUT: request timed out after {} seconds", .0.as_secs())]
    CacheTimeout(Duration),

    /// The upstream call ended without reporting any result.
    #[error("REQUEST_ABORTED: {0}")]
    RequestAborted(String),
}

impl Error {
    /// HTTP status reported by the management API, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => *status,
            _ => None,
        }
    }

    /// Endpoint the error was raised for, if known.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Error::Api { endpoint, .. } | Error::Unmarshal { endpoint, .. } => Some(endpoint),
            _ => None,
        }
    }

    /// The endpoint does not exist on this instance, e.g. a feature that is not licensed.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// True for both the transport timeout and the synthesized fallback timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::FetchTimeout(_) | Error::CacheTimeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Api { message: "not found".into(), endpoint: "system/ping".into(), status: Some(404) };
        assert!(err.to_string().contains("API_ERROR"));
        assert!(err.to_string().contains("system/ping"));
    }

    #[test]
    fn test_cache_timeout_display() {
        let err = Error::CacheTimeout(Duration::from_secs(30));
        assert_eq!(err.to_string(), "CACHE_TIMEOUT: request timed out after 30 seconds");
        assert!(err.is_timeout());
    }

    #[test]
    fn test_status_accessor() {
        let err = Error::Api { message: "boom".into(), endpoint: "tasks".into(), status: Some(503) };
        assert_eq!(err.status(), Some(503));
        assert_eq!(err.endpoint(), Some("tasks"));
        assert_eq!(Error::HttpError("reset".into()).status(), None);
        assert!(!Error::HttpError("reset".into()).is_timeout());
    }

    #[test]
    fn test_is_not_found() {
        let err = Error::Api { message: "Not Found".into(), endpoint: "replications".into(), status: Some(404) };
        assert!(err.is_not_found());
        assert!(!Error::HttpError("reset".into()).is_not_found());
    }
}
