//! Client code for artiscrape.
//!
//! This crate provides the Artifactory management API client, with every
//! request going through the core response cache, and typed wrappers for
//! the endpoints a scrape cycle reads:
//!
//! - system: health, build info, licenses, background tasks
//! - storage summary, replications, users and groups
//! - federation mirror status and access federation validation
//! - recent artifact activity (AQL) and the raw OpenMetrics exposition

pub mod access;
pub mod artifacts;
pub mod client;
pub mod federation;
pub mod openmetrics;
pub mod replication;
pub mod response;
pub mod security;
pub mod storage;
pub mod system;

#[cfg(test)]
mod testing;

pub use access::AccessFederationValid;
pub use artifacts::{ACTIVITY_PERIODS, Artifact, ArtifactActivity, ArtifactQueryResult};
pub use client::ArtifactoryClient;
pub use federation::{MirrorLag, MirrorLags, UnavailableMirror, UnavailableMirrors};
pub use openmetrics::OpenMetrics;
pub use replication::{Replication, Replications};
pub use response::{ApiResponse, NODE_ID_HEADER};
pub use security::{Group, User, users_by_realm};
pub use storage::{StorageInfo, parse_quantity, parse_size_with_percent};
pub use system::{BackgroundTask, BuildInfo, HealthStatus, LicenseInfo, LicensesInfo, NodeLicense};
