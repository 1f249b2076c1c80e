//! Periodic scrape loop.

use artiscrape_client::{ACTIVITY_PERIODS, ArtifactActivity, ArtifactoryClient};
use artiscrape_core::{Error, OptionalMetrics};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Number of artifacts with `activity` within `period`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactCount {
    pub activity: ArtifactActivity,
    pub period: &'static str,
    pub count: usize,
}

/// Outcome of one scrape cycle.
///
/// Fields stay `None` when their endpoint failed or the collector is disabled.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrapeReport {
    pub healthy: bool,
    pub node_id: Option<String>,
    pub version: Option<String>,
    pub license_type: Option<String>,
    pub license_valid_seconds: Option<i64>,
    pub repositories: Option<usize>,
    /// Used share of the filestore.
    pub storage_used_ratio: Option<f64>,
    pub users: Option<usize>,
    pub groups: Option<usize>,
    pub replications: Option<usize>,
    pub artifacts: Vec<ArtifactCount>,
    pub mirror_lags: Option<usize>,
    pub unavailable_mirrors: Option<usize>,
    pub open_metrics_bytes: Option<usize>,
    pub access_federation_valid: Option<bool>,
    pub background_tasks: Option<usize>,
    pub errors: Vec<String>,
}

impl ScrapeReport {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    fn record<T>(&mut self, result: Result<T, Error>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.errors.push(e.to_string());
                None
            }
        }
    }
}

pub struct Poller {
    client: Arc<ArtifactoryClient>,
    interval: Duration,
    optional: OptionalMetrics,
}

impl Poller {
    pub fn new(client: Arc<ArtifactoryClient>, interval: Duration, optional: OptionalMetrics) -> Self {
        Self { client, interval, optional }
    }

    /// Run one scrape cycle.
    ///
    /// The core endpoints are fetched concurrently, the optional collectors
    /// afterwards. Failures are recorded in the report rather than aborting
    /// the cycle.
    pub async fn scrape_once(&self) -> ScrapeReport {
        let client = &self.client;
        let (health, build, license, storage, users, groups, replications) = tokio::join!(
            client.fetch_health(),
            client.fetch_build_info(),
            client.fetch_license(),
            client.fetch_storage_info(),
            client.fetch_users(),
            client.fetch_groups(),
            client.fetch_replications(),
        );

        let mut report = ScrapeReport::default();
        if let Some(health) = report.record(health) {
            report.healthy = health.healthy;
            report.node_id = health.node_id;
        }
        if let Some(build) = report.record(build) {
            report.version = Some(build.version);
            if report.node_id.is_none() {
                report.node_id = build.node_id;
            }
        }
        if let Some(license) = report.record(license) {
            report.license_valid_seconds = report.record(license.valid_seconds(Utc::now()));
            report.license_type = Some(license.type_normalized());
        }
        if let Some(storage) = report.record(storage) {
            report.repositories = Some(storage.repositories().count());
            report.storage_used_ratio = report.record(storage.file_store_summary.used()).map(|(_, ratio)| ratio);
        }
        report.users = report.record(users).map(|users| users.len());
        report.groups = report.record(groups).map(|groups| groups.len());
        report.replications = report.record(replications).map(|r| r.replications.len());

        self.scrape_optional(&mut report).await;

        if report.is_complete() {
            tracing::info!(
                healthy = report.healthy,
                node_id = report.node_id.as_deref().unwrap_or(""),
                version = report.version.as_deref().unwrap_or(""),
                license_type = report.license_type.as_deref().unwrap_or(""),
                license_valid_seconds = report.license_valid_seconds.unwrap_or_default(),
                repositories = report.repositories.unwrap_or_default(),
                users = report.users.unwrap_or_default(),
                "scrape completed"
            );
        } else {
            tracing::warn!(healthy = report.healthy, errors = ?report.errors, "scrape completed with errors");
        }
        report
    }

    async fn scrape_optional(&self, report: &mut ScrapeReport) {
        let client = &self.client;

        if self.optional.artifacts {
            for activity in [ArtifactActivity::Created, ArtifactActivity::Downloaded] {
                for period in ACTIVITY_PERIODS {
                    if let Some(found) = report.record(client.find_artifacts(period, activity).await) {
                        report.artifacts.push(ArtifactCount { activity, period, count: found.results.len() });
                    }
                }
            }
        }

        if self.optional.federation_status && client.is_federation_enabled().await {
            report.mirror_lags = report.record(client.fetch_mirror_lags().await).map(|l| l.mirror_lags.len());
            report.unavailable_mirrors =
                report.record(client.fetch_unavailable_mirrors().await).map(|m| m.unavailable_mirrors.len());
        }

        if self.optional.open_metrics {
            report.open_metrics_bytes = report.record(client.fetch_open_metrics().await).map(|m| m.prom_metrics.len());
        }

        if self.optional.access_federation_validate {
            let valid = match client.fetch_access_federation_valid_status().await {
                Ok(valid) => valid.status,
                Err(e) => {
                    tracing::warn!(
                        federation_target = client.access_federation_target().unwrap_or(""),
                        error = %e,
                        "access federation circle of trust was not validated"
                    );
                    report.errors.push(e.to_string());
                    false
                }
            };
            report.access_federation_valid = Some(valid);
        }

        if self.optional.background_tasks {
            report.background_tasks = report.record(client.fetch_background_tasks().await).map(|t| t.len());
        }
    }

    /// Scrape every interval until the task is dropped.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.scrape_once().await;
        }
    }
}
