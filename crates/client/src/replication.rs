//! Replication endpoints.

use crate::client::ArtifactoryClient;
use artiscrape_core::Error;
use serde::{Deserialize, Serialize};

const REPLICATIONS_ENDPOINT: &str = "replications";
const REPLICATION_STATUS_ENDPOINT: &str = "replication";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Replication {
    pub replication_type: String,
    pub enabled: bool,
    pub cron_exp: String,
    pub sync_deletes: bool,
    pub sync_properties: bool,
    pub path_prefix: String,
    pub repo_key: String,
    pub url: String,
    pub enable_event_replication: bool,
    pub check_binary_existence_in_filestore: bool,
    pub sync_statistics: bool,
    /// Filled in by the status lookup; empty unless replication status is enabled.
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Replications {
    pub replications: Vec<Replication>,
    pub node_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReplicationStatus {
    #[serde(default)]
    status: String,
}

impl ArtifactoryClient {
    /// Configured replications.
    ///
    /// An instance without replication support answers 404, which yields an
    /// empty list. With replication status enabled every enabled replication
    /// also gets its current status.
    pub async fn fetch_replications(&self) -> Result<Replications, Error> {
        tracing::debug!("fetching replications stats");
        let response = match self.fetch_http(REPLICATIONS_ENDPOINT).await {
            Ok(response) => response,
            Err(e) if e.is_not_found() => return Ok(Replications::default()),
            Err(e) => return Err(e),
        };

        let mut replications = Replications {
            replications: response.json(REPLICATIONS_ENDPOINT)?,
            node_id: response.node_id,
        };

        if self.replication_status() {
            tracing::debug!("fetching replications status");
            for replication in replications.replications.iter_mut().filter(|r| r.enabled) {
                replication.status = self.fetch_replication_status(&replication.repo_key).await?;
            }
        }
        Ok(replications)
    }

    async fn fetch_replication_status(&self, repo_key: &str) -> Result<String, Error> {
        let endpoint = format!("{REPLICATION_STATUS_ENDPOINT}/{repo_key}");
        let response = self.fetch_http(&endpoint).await?;
        let status: ReplicationStatus = response.json(&endpoint)?;
        Ok(status.status)
    }
}
