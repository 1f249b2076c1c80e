//! Storage summary endpoint.
//!
//! Artifactory reports most storage figures as display strings such as
//! `"1,129,596"`, `"3.48 GB"` or `"32.22 GB (15.77%)"`. The accessors on the
//! summary types turn them into plain numbers: byte counts for sizes and
//! ratios in `0.0..=1.0` for percentages.

use crate::client::ArtifactoryClient;
use artiscrape_core::Error;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

const STORAGE_INFO_ENDPOINT: &str = "storageinfo";

/// Pseudo repository carrying the totals of the summary list.
const TOTAL_REPO_KEY: &str = "TOTAL";

static QUANTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<number>\d{1,3}(?:,\d{3})*(?:\.\d+)?|\d+(?:\.\d+)?) ?(?P<unit>%|bytes|[KMGT]B)?$")
        .expect("quantity pattern is valid")
});

static SIZE_WITH_PERCENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<size>.+?) \((?P<percent>[^()]+%)\)$").expect("size pattern is valid")
});

fn unit_multiplier(unit: &str) -> f64 {
    match unit {
        "%" => 0.01,
        "KB" => 1024.0,
        "MB" => 1024.0 * 1024.0,
        "GB" => 1024.0 * 1024.0 * 1024.0,
        "TB" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        _ => 1.0,
    }
}

fn unparsable(value: &str) -> Error {
    Error::Unmarshal {
        message: format!("unrecognized storage quantity '{value}'"),
        endpoint: STORAGE_INFO_ENDPOINT.to_string(),
    }
}

/// Parse a count, size or percentage as shown by the storage summary.
///
/// Thousands separators are accepted. Sizes use binary multiples.
pub fn parse_quantity(value: &str) -> Result<f64, Error> {
    let value = value.trim();
    let captures = QUANTITY.captures(value).ok_or_else(|| unparsable(value))?;
    let number: f64 = captures["number"].replace(',', "").parse().map_err(|_| unparsable(value))?;
    let multiplier = captures.name("unit").map_or(1.0, |unit| unit_multiplier(unit.as_str()));
    Ok(number * multiplier)
}

/// Parse `"<size> (<percent>%)"` into bytes and a ratio.
pub fn parse_size_with_percent(value: &str) -> Result<(f64, f64), Error> {
    let value = value.trim();
    let captures = SIZE_WITH_PERCENT.captures(value).ok_or_else(|| unparsable(value))?;
    Ok((parse_quantity(&captures["size"])?, parse_quantity(&captures["percent"])?))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BinariesSummary {
    pub binaries_count: String,
    pub binaries_size: String,
    pub artifacts_size: String,
    pub optimization: String,
    pub items_count: String,
    pub artifacts_count: String,
}

impl BinariesSummary {
    pub fn binaries_count(&self) -> Result<f64, Error> {
        parse_quantity(&self.binaries_count)
    }

    pub fn binaries_bytes(&self) -> Result<f64, Error> {
        parse_quantity(&self.binaries_size)
    }

    pub fn artifacts_bytes(&self) -> Result<f64, Error> {
        parse_quantity(&self.artifacts_size)
    }

    pub fn artifacts_count(&self) -> Result<f64, Error> {
        parse_quantity(&self.artifacts_count)
    }

    /// Deduplication ratio.
    pub fn optimization(&self) -> Result<f64, Error> {
        parse_quantity(&self.optimization)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileStoreSummary {
    pub storage_type: String,
    pub storage_directory: String,
    pub total_space: String,
    pub used_space: String,
    pub free_space: String,
}

impl FileStoreSummary {
    pub fn total_bytes(&self) -> Result<f64, Error> {
        parse_quantity(&self.total_space)
    }

    /// Used bytes and the used share of the total.
    pub fn used(&self) -> Result<(f64, f64), Error> {
        parse_size_with_percent(&self.used_space)
    }

    pub fn free(&self) -> Result<(f64, f64), Error> {
        parse_size_with_percent(&self.free_space)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RepositorySummary {
    pub repo_key: String,
    pub repo_type: String,
    pub folders_count: u64,
    pub files_count: u64,
    pub used_space: String,
    pub items_count: u64,
    pub package_type: String,
    pub percentage: String,
}

impl RepositorySummary {
    pub fn used_bytes(&self) -> Result<f64, Error> {
        parse_quantity(&self.used_space)
    }

    /// Share of the total storage, `None` when reported as `N/A`.
    pub fn share(&self) -> Result<Option<f64>, Error> {
        if self.percentage == "N/A" {
            return Ok(None);
        }
        parse_quantity(&self.percentage).map(Some)
    }
}

/// Response of the storage info endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageInfo {
    pub binaries_summary: BinariesSummary,
    pub file_store_summary: FileStoreSummary,
    pub repositories_summary_list: Vec<RepositorySummary>,
    #[serde(skip)]
    pub node_id: Option<String>,
}

impl StorageInfo {
    /// Real repositories, without the `TOTAL` row.
    pub fn repositories(&self) -> impl Iterator<Item = &RepositorySummary> {
        self.repositories_summary_list.iter().filter(|repo| repo.repo_key != TOTAL_REPO_KEY)
    }
}

impl ArtifactoryClient {
    pub async fn fetch_storage_info(&self) -> Result<StorageInfo, Error> {
        tracing::debug!("fetching storage info stats");
        let response = self.fetch_http(STORAGE_INFO_ENDPOINT).await?;
        let mut info: StorageInfo = response.json(STORAGE_INFO_ENDPOINT)?;
        info.node_id = response.node_id;
        Ok(info)
    }
}
