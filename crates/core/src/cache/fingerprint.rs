//! Deterministic cache keys for outbound requests.

use sha2::{Digest, Sha256};

/// Compute the cache key for a request from its method, full URL and body.
///
/// Identical triples always produce the same key; any difference in the body
/// (e.g. two AQL queries against the same endpoint) produces a different one.
pub fn request_fingerprint(method: &str, url: &str, body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hasher.update(b"\n");
    hasher.update(body);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "http://localhost:8081/artifactory/api/search/aql";

    #[test]
    fn test_fingerprint_stability() {
        let key1 = request_fingerprint("POST", URL, b"items.find()");
        let key2 = request_fingerprint("POST", URL, b"items.find()");
        assert_eq!(key1, key2);
    }

    #[test]
    fn test_fingerprint_different_body() {
        let key1 = request_fingerprint("POST", URL, br#"items.find({"repo":"libs"})"#);
        let key2 = request_fingerprint("POST", URL, br#"items.find({"repo":"docker"})"#);
        assert_ne!(key1, key2);
    }

    #[test]
    fn test_fingerprint_different_method() {
        assert_ne!(request_fingerprint("GET", URL, b""), request_fingerprint("POST", URL, b""));
    }

    #[test]
    fn test_fingerprint_field_boundaries() {
        let key1 = request_fingerprint("GET", "http://a/b", b"c");
        let key2 = request_fingerprint("GET", "http://a/bc", b"");
        assert_ne!(key1, key2);
    }

    #[test]
    fn test_fingerprint_format() {
        let key = request_fingerprint("GET", URL, b"");
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
