//! Recent artifact activity via AQL.

use crate::client::ArtifactoryClient;
use artiscrape_core::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

const AQL_ENDPOINT: &str = "search/aql";

/// Periods the artifact activity is reported for, in AQL relative-time syntax.
pub const ACTIVITY_PERIODS: [&str; 3] = ["1minutes", "5minutes", "15minutes"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactActivity {
    Created,
    Downloaded,
}

impl ArtifactActivity {
    fn field(self) -> &'static str {
        match self {
            ArtifactActivity::Created => "modified",
            ArtifactActivity::Downloaded => "stat.downloaded",
        }
    }

    /// AQL query for artifacts with this activity within `period`.
    pub fn query(self, period: &str) -> String {
        format!(r#"items.find({{"{}" : {{"$last" : "{period}"}}}}).include("name", "repo")"#, self.field())
    }
}

impl fmt::Display for ArtifactActivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactActivity::Created => f.write_str("created"),
            ArtifactActivity::Downloaded => f.write_str("downloaded"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Artifact {
    pub repo: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactQueryResult {
    pub results: Vec<Artifact>,
}

impl ArtifactQueryResult {
    pub fn count_by_repo(&self) -> BTreeMap<&str, usize> {
        self.results.iter().fold(BTreeMap::new(), |mut counts, artifact| {
            *counts.entry(artifact.repo.as_str()).or_default() += 1;
            counts
        })
    }
}

/// `<digits><unit>`, e.g. `15minutes`.
fn is_relative_period(period: &str) -> bool {
    let unit = period.trim_start_matches(|c: char| c.is_ascii_digit());
    unit.len() < period.len() && !unit.is_empty() && unit.chars().all(|c| c.is_ascii_alphabetic())
}

impl ArtifactoryClient {
    /// Artifacts created or downloaded within `period`, e.g. `"5minutes"`.
    pub async fn find_artifacts(&self, period: &str, activity: ArtifactActivity) -> Result<ArtifactQueryResult, Error> {
        if !is_relative_period(period) {
            return Err(Error::InvalidInput(format!("invalid AQL period '{period}'")));
        }
        tracing::debug!(period, activity = %activity, "finding artifacts");
        let response = self.query_aql(&activity.query(period)).await.inspect_err(|e| {
            tracing::error!(period, activity = %activity, error = %e, "failed to find artifacts");
        })?;
        response.json(AQL_ENDPOINT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::client_for;
    use wiremock::matchers::{body_string, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_activity_queries() {
        assert_eq!(
            ArtifactActivity::Created.query("1minutes"),
            r#"items.find({"modified" : {"$last" : "1minutes"}}).include("name", "repo")"#
        );
        assert_eq!(
            ArtifactActivity::Downloaded.query("15minutes"),
            r#"items.find({"stat.downloaded" : {"$last" : "15minutes"}}).include("name", "repo")"#
        );
    }

    #[tokio::test]
    async fn test_find_artifacts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/artifactory/api/search/aql"))
            .and(body_string(ArtifactActivity::Downloaded.query("5minutes")))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"results":[
                    {"repo":"libs-release","name":"a.jar"},
                    {"repo":"libs-release","name":"b.jar"},
                    {"repo":"docker-local","name":"manifest.json"}
                ],"range":{"start_pos":0,"end_pos":3,"total":3}}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server).find_artifacts("5minutes", ArtifactActivity::Downloaded).await.unwrap();
        assert_eq!(result.results.len(), 3);
        let counts = result.count_by_repo();
        assert_eq!(counts.get("libs-release"), Some(&2));
        assert_eq!(counts.get("docker-local"), Some(&1));
    }

    #[tokio::test]
    async fn test_find_artifacts_rejects_bad_period() {
        let server = MockServer::start().await;

        let client = client_for(&server);
        for period in ["", "minutes", "15", r#"5minutes"}})"#] {
            let err = client.find_artifacts(period, ArtifactActivity::Created).await.unwrap_err();
            assert!(matches!(err, Error::InvalidInput(_)), "period {period:?} accepted");
        }
    }
}
