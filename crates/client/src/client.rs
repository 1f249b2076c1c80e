//! Artifactory management API client.
//!
//! Every call is routed through [`fetch_with_cache`]: with caching enabled a
//! slow or failing upstream is answered from the last good response for the
//! same request, and every successful response refreshes the cache.

use crate::response::{ApiResponse, handle_response};
use artiscrape_core::cache::{fetch_with_cache, request_fingerprint};
use artiscrape_core::{AppConfig, Credentials, Error, ResponseCache};
use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method, RequestBuilder};

/// HTTP client for the Artifactory management API.
#[derive(Debug, Clone)]
pub struct ArtifactoryClient {
    uri: String,
    credentials: Credentials,
    http: Client,
    cache: ResponseCache<ApiResponse>,
    replication_status: bool,
    access_federation_target: Option<String>,
}

impl ArtifactoryClient {
    /// Create a client from the application configuration.
    pub fn new(config: &AppConfig) -> Result<Self, Error> {
        let credentials = config.credentials().map_err(|e| Error::InvalidInput(e.to_string()))?;

        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout())
            .use_rustls_tls()
            .danger_accept_invalid_certs(!config.ssl_verify)
            .gzip(true)
            .build()
            .map_err(|e| Error::InvalidInput(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            uri: config.scrape_uri.trim_end_matches('/').to_string(),
            credentials,
            http,
            cache: ResponseCache::new(config.cache_settings()),
            replication_status: config.optional_metrics.replication_status,
            access_federation_target: config.access_federation_target.clone().filter(|t| !t.is_empty()),
        })
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Whether replication lookups also fetch each enabled repository's status.
    pub fn replication_status(&self) -> bool {
        self.replication_status
    }

    pub fn access_federation_target(&self) -> Option<&str> {
        self.access_federation_target.as_deref()
    }

    pub fn cache(&self) -> &ResponseCache<ApiResponse> {
        &self.cache
    }

    /// Drop expired cached responses, returning how many were removed.
    pub fn prune_cache(&self) -> usize {
        self.cache.prune()
    }

    /// `GET {uri}/api/{path}`.
    pub async fn fetch_http(&self, path: &str) -> Result<ApiResponse, Error> {
        let url = format!("{}/api/{}", self.uri, path.trim_start_matches('/'));
        tracing::debug!(path = %url, "fetching http");
        self.make_cached_request(Method::GET, url, Bytes::new(), HeaderMap::new())
            .await
    }

    /// Run an AQL query against `{uri}/api/search/aql`.
    pub async fn query_aql(&self, query: &str) -> Result<ApiResponse, Error> {
        let url = format!("{}/api/search/aql", self.uri);
        tracing::debug!(path = %url, "running AQL query");
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        self.make_cached_request(Method::POST, url, Bytes::copy_from_slice(query.as_bytes()), headers)
            .await
    }

    /// `POST` to a path outside the `/artifactory` context, e.g. `access/api/v1/...`.
    pub async fn post_http(&self, path: &str, body: impl Into<Bytes>, headers: HeaderMap) -> Result<ApiResponse, Error> {
        let base = self.uri.strip_suffix("/artifactory").unwrap_or(&self.uri);
        let url = format!("{}/{}", base, path.trim_start_matches('/'));
        tracing::debug!(path = %url, "posting http");
        self.make_cached_request(Method::POST, url, body.into(), headers)
            .await
    }

    async fn make_cached_request(
        &self, method: Method, url: String, body: Bytes, headers: HeaderMap,
    ) -> Result<ApiResponse, Error> {
        let key = request_fingerprint(method.as_str(), &url, &body);

        let mut request = self.authorize(self.http.request(method.clone(), &url)).headers(headers);
        if !body.is_empty() {
            request = request.body(body);
        }

        fetch_with_cache(&self.cache, key, async move {
            let response = request.send().await.map_err(|e| {
                tracing::error!(method = %method, endpoint = %url, error = %e, "API call failed");
                if e.is_timeout() {
                    Error::FetchTimeout(format!("{url}: {e}"))
                } else {
                    Error::HttpError(format!("network error: {e}"))
                }
            })?;
            handle_response(response, &url).await
        })
        .await
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Credentials::UserPass { username, password } => request.basic_auth(username, Some(password)),
            Credentials::AccessToken(token) => request.bearer_auth(token),
        }
    }
}
