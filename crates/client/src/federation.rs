//! Federated repository status.

use crate::client::ArtifactoryClient;
use artiscrape_core::Error;
use serde::{Deserialize, Serialize};

const MIRRORS_LAG_ENDPOINT: &str = "federation/status/mirrorsLag";
const UNAVAILABLE_MIRRORS_ENDPOINT: &str = "federation/status/unavailableMirrors";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MirrorLag {
    pub local_repo_key: String,
    pub remote_url: String,
    pub remote_repo_key: String,
    #[serde(rename = "lagInMS")]
    pub lag_in_ms: i64,
    pub event_registration_time_stamp: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorLags {
    pub mirror_lags: Vec<MirrorLag>,
    pub node_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UnavailableMirror {
    pub repo_key: String,
    pub node_id: String,
    pub status: String,
    pub local_repo_key: String,
    pub remote_url: String,
    pub remote_repo_key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UnavailableMirrors {
    pub unavailable_mirrors: Vec<UnavailableMirror>,
    #[serde(skip)]
    pub node_id: Option<String>,
}

impl ArtifactoryClient {
    /// Federation is considered enabled when its status endpoint answers.
    pub async fn is_federation_enabled(&self) -> bool {
        match self.fetch_http(UNAVAILABLE_MIRRORS_ENDPOINT).await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(error = %e, "federation status unavailable");
                false
            }
        }
    }

    /// Replication lag of every federated mirror. Empty when federation is not available.
    pub async fn fetch_mirror_lags(&self) -> Result<MirrorLags, Error> {
        tracing::debug!("fetching mirror lags");
        let response = match self.fetch_http(MIRRORS_LAG_ENDPOINT).await {
            Ok(response) => response,
            Err(e) if e.is_not_found() => return Ok(MirrorLags::default()),
            Err(e) => return Err(e),
        };
        Ok(MirrorLags { mirror_lags: response.json(MIRRORS_LAG_ENDPOINT)?, node_id: response.node_id })
    }

    pub async fn fetch_unavailable_mirrors(&self) -> Result<UnavailableMirrors, Error> {
        tracing::debug!("fetching unavailable mirrors");
        let response = match self.fetch_http(UNAVAILABLE_MIRRORS_ENDPOINT).await {
            Ok(response) => response,
            Err(e) if e.is_not_found() => return Ok(UnavailableMirrors::default()),
            Err(e) => return Err(e),
        };
        let mut mirrors: UnavailableMirrors = response.json(UNAVAILABLE_MIRRORS_ENDPOINT)?;
        mirrors.node_id = response.node_id;
        Ok(mirrors)
    }
}
