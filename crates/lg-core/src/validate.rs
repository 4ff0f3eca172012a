//! # Query Validation
//!
//! Dry-runs a request's query through the engine's validate facility before
//! any hits are fetched. A failed validation means the request is never
//! executed.

use serde::Deserialize;
use serde_json::Value;

use crate::client::{describe_engine_error, SearchBackend};
use crate::error::{ErrorKind, Phase, Result, SearchError};
use crate::request::SearchRequest;

/// Decoded validation response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValidationReport {
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub explanations: Vec<Explanation>,
    /// Engine-level rejection, present when the query could not be parsed.
    #[serde(default)]
    pub error: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Explanation {
    #[serde(default)]
    pub index: Option<String>,
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
}

impl ValidationReport {
    /// Best available description of why the query was rejected.
    pub fn reason(&self) -> String {
        if let Some(reason) = self.error.as_ref().and_then(describe_engine_error) {
            return reason;
        }
        let errors: Vec<String> = self
            .explanations
            .iter()
            .filter(|e| !e.valid)
            .filter_map(|e| {
                let error = e.error.as_deref()?;
                Some(match &e.index {
                    Some(index) => format!("[{}] {}", index, error),
                    None => error.to_string(),
                })
            })
            .collect();
        if errors.is_empty() {
            "query is not valid".to_string()
        } else {
            errors.join("; ")
        }
    }
}

/// Ask the engine whether `request`'s query is well formed.
///
/// With `keep_response` set, the raw engine response is attached to the
/// validation error so it can be printed for debugging.
pub async fn validate(
    backend: &dyn SearchBackend,
    request: &SearchRequest,
    keep_response: bool,
) -> Result<ValidationReport> {
    let body = request
        .body()
        .map_err(|kind| SearchError::new(Phase::Validate, kind))?;
    let query = body
        .get("query")
        .cloned()
        .unwrap_or_else(|| serde_json::json!({ "match_all": {} }));

    let raw = backend
        .validate(request.indices(), &serde_json::json!({ "query": query }))
        .await?;
    let report: ValidationReport = serde_json::from_value(raw.clone())
        .map_err(|e| SearchError::new(Phase::Validate, ErrorKind::Decode(e.to_string())))?;

    if report.valid {
        tracing::debug!("Query validated");
        return Ok(report);
    }

    let reason = report.reason();
    tracing::debug!(%reason, "Query failed validation");
    Err(SearchError::new(
        Phase::Validate,
        ErrorKind::Validation {
            reason,
            response: keep_response.then_some(raw),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::SearchResponse;
    use crate::query::Query;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct CannedValidator {
        reply: Value,
        seen: Mutex<Vec<Value>>,
    }

    impl CannedValidator {
        fn new(reply: Value) -> Self {
            Self {
                reply,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SearchBackend for CannedValidator {
        async fn search(&self, _indices: &[String], _body: &Value) -> Result<SearchResponse> {
            panic!("validation must not execute a search");
        }

        async fn validate(&self, _indices: &[String], body: &Value) -> Result<Value> {
            self.seen.lock().unwrap().push(body.clone());
            Ok(self.reply.clone())
        }
    }

    fn request(query: Query) -> SearchRequest {
        let mut b = SearchRequest::builder(query);
        b.size(10).sort_by_timestamp(false);
        b.build()
    }

    #[tokio::test]
    async fn test_valid_query_sends_only_query_clause() {
        let backend = CannedValidator::new(json!({"valid": true}));
        let report = validate(&backend, &request(Query::lucene("error").unwrap()), false)
            .await
            .unwrap();
        assert!(report.valid);
        assert_eq!(
            backend.seen.lock().unwrap()[0],
            json!({"query": {"query_string": {"query": "error"}}})
        );
    }

    #[tokio::test]
    async fn test_invalid_query_reports_explanations() {
        let reply = json!({
            "valid": false,
            "explanations": [
                {"index": "logs", "valid": false, "error": "failed to parse date field"}
            ]
        });
        let backend = CannedValidator::new(reply.clone());
        let err = validate(&backend, &request(Query::lucene("@timestamp:foo").unwrap()), true)
            .await
            .unwrap_err();

        assert_eq!(err.phase, Phase::Validate);
        assert_eq!(err.validation_response(), Some(&reply));
        match err.kind {
            ErrorKind::Validation { reason, .. } => {
                assert_eq!(reason, "[logs] failed to parse date field")
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_response_dropped_without_debug() {
        let backend = CannedValidator::new(json!({"valid": false}));
        let err = validate(&backend, &request(Query::lucene("x").unwrap()), false)
            .await
            .unwrap_err();
        assert!(err.validation_response().is_none());
        assert!(err.to_string().contains("query is not valid"));
    }

    #[tokio::test]
    async fn test_engine_rejection_body() {
        let backend = CannedValidator::new(json!({
            "error": {"type": "parsing_exception", "reason": "no [query] registered for [bogus]"},
            "status": 400
        }));
        let doc = json!({"query": {"bogus": {}}});
        let err = validate(&backend, &request(Query::raw(doc).unwrap()), false)
            .await
            .unwrap_err();
        assert!(err
            .to_string()
            .contains("parsing_exception: no [query] registered for [bogus]"));
    }

    #[tokio::test]
    async fn test_broken_document_never_reaches_engine() {
        let backend = CannedValidator::new(json!({"valid": true}));
        let query = Query::raw(b"{\"query\": {".to_vec()).unwrap();
        let err = validate(&backend, &request(query), false).await.unwrap_err();
        assert_eq!(err.phase, Phase::Validate);
        assert!(matches!(err.kind, ErrorKind::InvalidDocument(_)));
        assert!(backend.seen.lock().unwrap().is_empty());
    }
}
