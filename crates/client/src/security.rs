//! Users and groups.

use crate::client::ArtifactoryClient;
use artiscrape_core::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const USERS_ENDPOINT: &str = "security/users";
const GROUPS_ENDPOINT: &str = "security/groups";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub name: String,
    pub realm: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Group {
    pub name: String,
    pub uri: String,
}

/// Number of users per authentication realm.
pub fn users_by_realm(users: &[User]) -> BTreeMap<&str, usize> {
    users.iter().fold(BTreeMap::new(), |mut counts, user| {
        *counts.entry(user.realm.as_str()).or_default() += 1;
        counts
    })
}

impl ArtifactoryClient {
    pub async fn fetch_users(&self) -> Result<Vec<User>, Error> {
        tracing::debug!("fetching users stats");
        let response = self.fetch_http(USERS_ENDPOINT).await?;
        response.json(USERS_ENDPOINT)
    }

    pub async fn fetch_groups(&self) -> Result<Vec<Group>, Error> {
        tracing::debug!("fetching groups stats");
        let response = self.fetch_http(GROUPS_ENDPOINT).await?;
        response.json(GROUPS_ENDPOINT)
    }
}
