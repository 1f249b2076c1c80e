//! Shared helpers for endpoint tests.

use crate::client::ArtifactoryClient;
use artiscrape_core::AppConfig;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub(crate) fn config_for(server: &MockServer) -> AppConfig {
    AppConfig {
        scrape_uri: format!("{}/artifactory", server.uri()),
        access_token: Some("token".into()),
        ..Default::default()
    }
}

pub(crate) fn client_for(server: &MockServer) -> ArtifactoryClient {
    ArtifactoryClient::new(&config_for(server)).unwrap()
}

/// Answer `GET /artifactory/api/{endpoint}` with `template`.
pub(crate) async fn mount_get(server: &MockServer, endpoint: &str, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(format!("/artifactory/api/{endpoint}")))
        .respond_with(template)
        .mount(server)
        .await;
}

pub(crate) fn not_found() -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_string(r#"{"errors":[{"status":404,"message":"Not Found"}]}"#)
}
