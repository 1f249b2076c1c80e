//! Access federation validation.

use crate::client::ArtifactoryClient;
use artiscrape_core::Error;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};

/// Lives under the Access service, outside the `/artifactory` context.
const VALIDATE_SERVER_ENDPOINT: &str = "access/api/v1/system/federation/validate_server";
const PING_ENDPOINT: &str = "system/ping";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessFederationValid {
    pub status: bool,
    pub node_id: Option<String>,
}

impl ArtifactoryClient {
    /// Ask the Access service whether the configured federation target is valid.
    ///
    /// The Access API does not report a node id, so the ping endpoint is
    /// queried first to attribute the result.
    pub async fn fetch_access_federation_valid_status(&self) -> Result<AccessFederationValid, Error> {
        let target = self
            .access_federation_target()
            .ok_or_else(|| Error::InvalidInput("access federation target is not configured".into()))?;

        let ping = self.fetch_http(PING_ENDPOINT).await?;
        let body = serde_json::to_vec(&serde_json::json!({ "url": target }))
            .map_err(|e| Error::InvalidInput(format!("failed to encode validation request: {e}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        tracing::debug!(
            endpoint = VALIDATE_SERVER_ENDPOINT,
            federation_target = target,
            "fetching access federation validation status"
        );
        self.post_http(VALIDATE_SERVER_ENDPOINT, body, headers).await?;

        Ok(AccessFederationValid { status: true, node_id: ping.node_id })
    }
}
