//! Typed system endpoints.

use crate::client::ArtifactoryClient;
use artiscrape_core::Error;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

const PING_ENDPOINT: &str = "system/ping";
const VERSION_ENDPOINT: &str = "system/version";
const LICENSE_ENDPOINT: &str = "system/license";
const LICENSES_ENDPOINT: &str = "system/licenses";
const TASKS_ENDPOINT: &str = "tasks";

/// License types that never expire.
const OSS_LICENSE_TYPES: [&str; 3] = ["community edition for c/c++", "jcr edition", "oss"];

/// Date format of `validThrough`, e.g. `Jan 2, 2006`.
const LICENSE_DATE_FORMAT: &str = "%b %d, %Y";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthStatus {
    pub healthy: bool,
    pub node_id: Option<String>,
}

/// Response of the version endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInfo {
    pub version: String,
    #[serde(default)]
    pub revision: String,
    #[serde(default)]
    pub addons: Vec<String>,
    #[serde(default)]
    pub license: String,
    #[serde(skip)]
    pub node_id: Option<String>,
}

/// Response of the license endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseInfo {
    #[serde(rename = "type")]
    pub license_type: String,
    #[serde(rename = "validThrough", default)]
    pub valid_through: String,
    #[serde(rename = "licensedTo", default)]
    pub licensed_to: String,
    #[serde(skip)]
    pub node_id: Option<String>,
}

impl LicenseInfo {
    pub fn type_normalized(&self) -> String {
        self.license_type.to_lowercase()
    }

    pub fn is_oss(&self) -> bool {
        OSS_LICENSE_TYPES.contains(&self.type_normalized().as_str())
    }

    /// Seconds until the license expires, negative once it has. OSS licenses report 0.
    pub fn valid_seconds(&self, now: DateTime<Utc>) -> Result<i64, Error> {
        if self.is_oss() {
            return Ok(0);
        }
        let valid_through = NaiveDate::parse_from_str(&self.valid_through, LICENSE_DATE_FORMAT).map_err(|e| {
            Error::Unmarshal {
                message: format!("unparsable 'validThrough' license field: {e}"),
                endpoint: LICENSE_ENDPOINT.to_string(),
            }
        })?;
        let expires_at = valid_through.and_time(NaiveTime::default()).and_utc();
        Ok(expires_at.timestamp() - now.timestamp())
    }
}

/// One node's license in a high-availability cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeLicense {
    #[serde(flatten)]
    pub license: LicenseInfo,
    #[serde(rename = "nodeId", default)]
    pub node_id: String,
    #[serde(rename = "nodeUrl", default)]
    pub node_url: String,
    #[serde(rename = "licenseHash", default)]
    pub license_hash: String,
    #[serde(default)]
    pub expired: bool,
}

/// Response of the HA licenses endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicensesInfo {
    #[serde(default)]
    pub licenses: Vec<NodeLicense>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackgroundTask {
    pub id: String,
    #[serde(rename = "type")]
    pub task_type: String,
    pub state: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "nodeId", default)]
    pub node_id: String,
}

#[derive(Debug, Deserialize)]
struct TasksResponse {
    #[serde(default)]
    tasks: Vec<BackgroundTask>,
}

impl ArtifactoryClient {
    /// Healthy iff the ping endpoint answers exactly `OK`.
    pub async fn fetch_health(&self) -> Result<HealthStatus, Error> {
        tracing::debug!("fetching health stats");
        let response = self.fetch_http(PING_ENDPOINT).await?;
        let healthy = response.body.as_ref() == b"OK";
        if healthy {
            tracing::debug!("system ping returned OK");
        }
        Ok(HealthStatus { healthy, node_id: response.node_id })
    }

    pub async fn fetch_build_info(&self) -> Result<BuildInfo, Error> {
        tracing::debug!("fetching build stats");
        let response = self.fetch_http(VERSION_ENDPOINT).await?;
        let mut info: BuildInfo = response.json(VERSION_ENDPOINT)?;
        info.node_id = response.node_id;
        Ok(info)
    }

    pub async fn fetch_license(&self) -> Result<LicenseInfo, Error> {
        tracing::debug!("fetching license stats");
        let response = self.fetch_http(LICENSE_ENDPOINT).await?;
        let mut info: LicenseInfo = response.json(LICENSE_ENDPOINT)?;
        info.node_id = response.node_id;
        Ok(info)
    }

    /// Licenses of every node in an HA cluster.
    pub async fn fetch_licenses(&self) -> Result<LicensesInfo, Error> {
        tracing::debug!("fetching HA licenses stats");
        let response = self.fetch_http(LICENSES_ENDPOINT).await?;
        response.json(LICENSES_ENDPOINT)
    }

    pub async fn fetch_background_tasks(&self) -> Result<Vec<BackgroundTask>, Error> {
        tracing::debug!("fetching background tasks");
        let response = self.fetch_http(TASKS_ENDPOINT).await?;
        let tasks: TasksResponse = response.json(TASKS_ENDPOINT)?;
        Ok(tasks.tasks)
    }
}
