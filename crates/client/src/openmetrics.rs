//! Raw OpenMetrics exposition.

use crate::client::ArtifactoryClient;
use artiscrape_core::Error;

const OPEN_METRICS_ENDPOINT: &str = "v1/metrics";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenMetrics {
    /// Exposition text exactly as served.
    pub prom_metrics: String,
    pub node_id: Option<String>,
}

impl ArtifactoryClient {
    /// Metrics Artifactory exposes itself. Empty when metrics are disabled on the instance.
    pub async fn fetch_open_metrics(&self) -> Result<OpenMetrics, Error> {
        tracing::debug!("fetching open metrics");
        let response = match self.fetch_http(OPEN_METRICS_ENDPOINT).await {
            Ok(response) => response,
            Err(e) if e.is_not_found() => return Ok(OpenMetrics::default()),
            Err(e) => return Err(e),
        };
        let prom_metrics = response.text();
        tracing::trace!(body = %prom_metrics, "open metrics from artifactory");
        Ok(OpenMetrics { prom_metrics, node_id: response.node_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{client_for, mount_get, not_found};
    use wiremock::{MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_open_metrics() {
        let body = "# TYPE jfrt_runtime_heap_freememory_bytes gauge\njfrt_runtime_heap_freememory_bytes 4.2e+08\n";
        let server = MockServer::start().await;
        mount_get(
            &server,
            OPEN_METRICS_ENDPOINT,
            ResponseTemplate::new(200).set_body_string(body).insert_header("X-Artifactory-Node-Id", "node-a"),
        )
        .await;

        let metrics = client_for(&server).fetch_open_metrics().await.unwrap();
        assert_eq!(metrics.prom_metrics, body);
        assert_eq!(metrics.node_id.as_deref(), Some("node-a"));
    }

    #[tokio::test]
    async fn test_fetch_open_metrics_disabled() {
        let server = MockServer::start().await;
        mount_get(&server, OPEN_METRICS_ENDPOINT, not_found()).await;

        assert_eq!(client_for(&server).fetch_open_metrics().await.unwrap(), OpenMetrics::default());
    }
}
