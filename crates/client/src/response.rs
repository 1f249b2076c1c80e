//! Management API responses and status classification.

use artiscrape_core::Error;
use bytes::Bytes;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Header carrying the id of the node that served the request.
pub const NODE_ID_HEADER: &str = "x-artifactory-node-id";

/// Statuses treated as success; everything else is an API error.
const SUCCESS_CODES: [u16; 10] = [200, 201, 202, 203, 204, 205, 206, 207, 208, 226];

/// Raw response body plus the node that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub body: Bytes,
    pub node_id: Option<String>,
}

impl ApiResponse {
    pub fn new(body: impl Into<Bytes>, node_id: Option<String>) -> Self {
        Self { body: body.into(), node_id }
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, Error> {
        serde_json::from_slice(&self.body).map_err(|e| {
            tracing::error!(endpoint, error = %e, "failed to unmarshal response body");
            Error::Unmarshal { message: e.to_string(), endpoint: endpoint.to_string() }
        })
    }
}

/// Error envelope returned by the management API.
#[derive(Debug, Deserialize)]
struct ApiErrors {
    #[serde(default)]
    errors: Option<serde_json::Value>,
}

pub(crate) fn is_success(status: StatusCode) -> bool {
    SUCCESS_CODES.contains(&status.as_u16())
}

/// Read the body and turn a non-success status into an [`Error::Api`].
pub(crate) async fn handle_response(response: Response, endpoint: &str) -> Result<ApiResponse, Error> {
    let status = response.status();
    let node_id = response
        .headers()
        .get(NODE_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    let body = response.bytes().await.map_err(|e| {
        tracing::error!(endpoint, error = %e, "failed to read response body");
        Error::HttpError(format!("failed to read response: {e}"))
    })?;

    classify(status, body, node_id, endpoint)
}

pub(crate) fn classify(
    status: StatusCode, body: Bytes, node_id: Option<String>, endpoint: &str,
) -> Result<ApiResponse, Error> {
    if is_success(status) {
        return Ok(ApiResponse { body, node_id });
    }

    let api_errors: ApiErrors = serde_json::from_slice(&body).map_err(|e| {
        tracing::error!(endpoint, status = status.as_u16(), error = %e, "failed to unmarshal API error");
        Error::Unmarshal { message: e.to_string(), endpoint: endpoint.to_string() }
    })?;
    let message = render_errors(api_errors.errors);

    if status == StatusCode::NOT_FOUND {
        tracing::warn!(endpoint, status = status.as_u16(), error = %message, "endpoint does not exist");
    } else {
        tracing::error!(endpoint, status = status.as_u16(), error = %message, "API call failed");
    }

    Err(Error::Api { message, endpoint: endpoint.to_string(), status: Some(status.as_u16()) })
}

/// Render the `errors` field, preferring the `message` of each entry.
fn render_errors(errors: Option<serde_json::Value>) -> String {
    match errors {
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .map(|item| match item.get("message").and_then(|m| m.as_str()) {
                Some(message) => message.to_string(),
                None => item.to_string(),
            })
            .collect::<Vec<_>>()
            .join("; "),
        Some(serde_json::Value::String(message)) => message,
        Some(other) => other.to_string(),
        None => "no error details".to_string(),
    }
}
