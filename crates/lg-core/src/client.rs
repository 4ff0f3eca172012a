//! # Engine Client
//!
//! The search engine is reached through [`SearchBackend`]: submit a query
//! document, get back hits or an error. [`Client`] implements it over the
//! Elasticsearch HTTP API with `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ErrorKind, Phase, Result, SearchError};

/// Default engine endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:9200/";

/// Decoded search response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub took: Option<u64>,
    #[serde(default)]
    pub timed_out: bool,
    pub hits: HitsEnvelope,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HitsEnvelope {
    /// Either a bare number or `{"value": n, "relation": ..}` depending on
    /// the engine version.
    #[serde(default)]
    pub total: Option<Value>,
    #[serde(default)]
    pub hits: Vec<Value>,
}

impl HitsEnvelope {
    pub fn total(&self) -> Option<u64> {
        match self.total.as_ref()? {
            Value::Number(n) => n.as_u64(),
            Value::Object(obj) => obj.get("value").and_then(Value::as_u64),
            _ => None,
        }
    }
}

/// The opaque engine service a search runs against.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Execute a search body against the given indices (empty = all).
    async fn search(&self, indices: &[String], body: &Value) -> Result<SearchResponse>;

    /// Ask the engine to dry-run a `{"query": ..}` body. Returns the raw
    /// validation response, including engine-side rejections of the
    /// query's shape.
    async fn validate(&self, indices: &[String], body: &Value) -> Result<Value>;
}

/// Connection settings for [`Client`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub endpoint: String,
    pub connect_timeout: Duration,
    /// Upper bound for a whole request round trip.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            connect_timeout: Duration::from_millis(5_000),
            request_timeout: Duration::from_millis(30_000),
        }
    }
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }
}

/// HTTP client for a single Elasticsearch-compatible endpoint.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    endpoint: Url,
}

impl Client {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let endpoint = parse_endpoint(&config.endpoint)?;
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| SearchError::transport(Phase::Configure, e))?;
        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn url(&self, phase: Phase, indices: &[String], action: &str) -> Result<Url> {
        let mut url = self.endpoint.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                SearchError::new(
                    phase,
                    ErrorKind::InvalidEndpoint {
                        endpoint: self.endpoint.to_string(),
                        reason: "endpoint cannot carry a path".to_string(),
                    },
                )
            })?;
            segments.pop_if_empty();
            if !indices.is_empty() {
                segments.push(&indices.join(","));
            }
            segments.extend(action.split('/'));
        }
        Ok(url)
    }
}

#[async_trait]
impl SearchBackend for Client {
    async fn search(&self, indices: &[String], body: &Value) -> Result<SearchResponse> {
        let url = self.url(Phase::Execute, indices, "_search")?;
        tracing::debug!(%url, "Submitting search request");

        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| SearchError::transport(Phase::Execute, e))?;

        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| SearchError::transport(Phase::Execute, e))?;
        if !status.is_success() {
            return Err(SearchError::new(
                Phase::Execute,
                engine_error(status, &bytes),
            ));
        }

        let response: SearchResponse = serde_json::from_slice(&bytes)
            .map_err(|e| SearchError::new(Phase::Execute, ErrorKind::Decode(e.to_string())))?;
        tracing::debug!(
            took_ms = response.took,
            total = response.hits.total(),
            returned = response.hits.hits.len(),
            "Search completed"
        );
        if response.timed_out {
            tracing::warn!("Engine reported a partial (timed out) search response");
        }
        Ok(response)
    }

    async fn validate(&self, indices: &[String], body: &Value) -> Result<Value> {
        let mut url = self.url(Phase::Validate, indices, "_validate/query")?;
        url.query_pairs_mut().append_pair("explain", "true");
        tracing::debug!(%url, "Validating query");

        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| SearchError::transport(Phase::Validate, e))?;

        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| SearchError::transport(Phase::Validate, e))?;

        // A 400 with a JSON body is the engine rejecting the query itself.
        if status.is_success() || status == StatusCode::BAD_REQUEST {
            if let Ok(value) = serde_json::from_slice::<Value>(&bytes) {
                return Ok(value);
            }
        }
        Err(SearchError::new(
            Phase::Validate,
            engine_error(status, &bytes),
        ))
    }
}

fn parse_endpoint(raw: &str) -> Result<Url> {
    let invalid = |reason: String| {
        SearchError::new(
            Phase::Configure,
            ErrorKind::InvalidEndpoint {
                endpoint: raw.to_string(),
                reason,
            },
        )
    };

    if raw.is_empty() {
        return Err(invalid("endpoint must be set".into()));
    }
    let mut url = Url::parse(raw).map_err(|e| {
        invalid(format!(
            "{} (expected a URL such as {})",
            e, DEFAULT_ENDPOINT
        ))
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    // Relative joins replace the last segment unless the path is a directory.
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Turn a failed engine response into a readable error, preferring the
/// engine's own `{"error": {"type", "reason"}}` description.
fn engine_error(status: StatusCode, body: &[u8]) -> ErrorKind {
    let reason = serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|v| describe_engine_error(v.get("error")?))
        .unwrap_or_else(|| {
            let text = String::from_utf8_lossy(body).trim().to_string();
            if text.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            } else {
                text
            }
        });
    ErrorKind::Engine {
        status: status.as_u16(),
        reason,
    }
}

pub(crate) fn describe_engine_error(error: &Value) -> Option<String> {
    match error {
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => {
            let reason = obj.get("reason").and_then(Value::as_str);
            let kind = obj.get("type").and_then(Value::as_str);
            match (kind, reason) {
                (Some(k), Some(r)) => Some(format!("{}: {}", k, r)),
                (None, Some(r)) => Some(r.to_string()),
                (Some(k), None) => Some(k.to_string()),
                (None, None) => None,
            }
        }
        _ => None,
    }
}
