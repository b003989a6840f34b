use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use shared::{
    domain::{EndpointName, RawRecord},
    error::FetchError,
};
use tracing::debug;
use url::Url;

/// Base path the demo configuration points at when nothing else is set.
pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000/api/";

/// Source of raw records for the renderer.
#[async_trait]
pub trait RecordFetcher: Send + Sync {
    /// Fetch the named collection and return its records in response order.
    async fn fetch_records(&self, endpoint: &str) -> Result<Vec<RawRecord>, FetchError>;
}

/// Null fetcher used where no API client has been wired in.
pub struct MissingRecordFetcher;

#[async_trait]
impl RecordFetcher for MissingRecordFetcher {
    async fn fetch_records(&self, endpoint: &str) -> Result<Vec<RawRecord>, FetchError> {
        Err(FetchError::Network {
            message: format!("no record source configured for endpoint '{endpoint}'"),
        })
    }
}

/// HTTP record fetcher: one GET per call, no retries, no caching, no shared
/// mutable state between calls.
pub struct ApiClient {
    http: Client,
    base_url: Url,
    bearer_token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
            bearer_token: None,
        }
    }

    /// Attach a bearer token sourced from configuration. Credentials never
    /// ride in the endpoint name or the URL itself.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    fn endpoint_url(&self, endpoint: &EndpointName) -> Result<Url, FetchError> {
        // Url::join would drop the base's last path segment when the base
        // lacks a trailing slash, so push the segment explicitly.
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| FetchError::InvalidEndpoint {
                name: endpoint.as_str().to_string(),
            })?
            .pop_if_empty()
            .push(endpoint.as_str());
        Ok(url)
    }
}

#[async_trait]
impl RecordFetcher for ApiClient {
    async fn fetch_records(&self, endpoint: &str) -> Result<Vec<RawRecord>, FetchError> {
        let endpoint = EndpointName::new(endpoint)?;
        let url = self.endpoint_url(&endpoint)?;
        debug!(%url, "fetching record collection");

        let mut request = self.http.get(url);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|err| FetchError::Network {
            message: err.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|err| FetchError::Network {
            message: err.to_string(),
        })?;
        let decoded: Value = serde_json::from_slice(&body).map_err(|err| FetchError::Parse {
            message: err.to_string(),
        })?;

        records_from_body(decoded)
    }
}

/// Flatten a decoded body into a record sequence: a JSON array yields its
/// elements in order, a JSON object yields its values in insertion order.
/// An element that is not itself an object becomes an empty record;
/// tolerating its missing fields is the renderer's job.
fn records_from_body(body: Value) -> Result<Vec<RawRecord>, FetchError> {
    let entries: Vec<Value> = match body {
        Value::Array(items) => items,
        Value::Object(map) => map.into_iter().map(|(_, value)| value).collect(),
        other => {
            return Err(FetchError::Parse {
                message: format!(
                    "expected a JSON array or object of records, got {}",
                    json_type_name(&other)
                ),
            });
        }
    };

    Ok(entries
        .into_iter()
        .map(|entry| match entry {
            Value::Object(record) => record,
            _ => RawRecord::new(),
        })
        .collect())
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
