//! # Query Building
//!
//! Turns caller intent into a normalized [`Query`]: either a lucene-style
//! free-text expression or an opaque JSON query document.
//!
//! Raw documents arrive in one of the [`RawQuery`] shapes and are all
//! normalized to the same [`QueryDocument`] (JSON text). Parsing is deferred
//! until the request body is assembled, so a syntactically broken document is
//! reported by whichever phase touches it first (normally validation).

use std::fmt;

use serde_json::{Map, Value};

use crate::error::{ErrorKind, Result, SearchError};

/// A typed query document that knows how to render itself as JSON.
pub trait QuerySource: Send + Sync {
    fn source(&self) -> serde_json::Result<Value>;
}

/// The engine's `query_string` query, carrying a lucene-style expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryString {
    pub query: String,
}

impl QueryString {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
        }
    }
}

impl QuerySource for QueryString {
    fn source(&self) -> serde_json::Result<Value> {
        Ok(serde_json::json!({
            "query_string": { "query": self.query }
        }))
    }
}

impl QuerySource for Map<String, Value> {
    fn source(&self) -> serde_json::Result<Value> {
        Ok(Value::Object(self.clone()))
    }
}

/// Caller-supplied raw query input. Every accepted shape is listed here.
pub enum RawQuery {
    /// Pre-serialized JSON text, e.g. the contents of a query file.
    Bytes(Vec<u8>),
    /// An already decoded JSON tree.
    Json(Value),
    /// A typed document rendered through [`QuerySource`].
    Typed(Box<dyn QuerySource>),
}

impl fmt::Debug for RawQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            Self::Json(v) => f.debug_tuple("Json").field(v).finish(),
            Self::Typed(_) => f.write_str("Typed(..)"),
        }
    }
}

impl From<Vec<u8>> for RawQuery {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Value> for RawQuery {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

/// Normalized raw query document, held as JSON text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryDocument {
    text: Vec<u8>,
}

impl QueryDocument {
    /// Parse the document into a JSON object.
    pub fn parse(&self) -> std::result::Result<Map<String, Value>, ErrorKind> {
        match serde_json::from_slice::<Value>(&self.text) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(ErrorKind::InvalidDocument(format!(
                "expected a JSON object, found {}",
                json_type_name(&other)
            ))),
            Err(e) => Err(ErrorKind::InvalidDocument(e.to_string())),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.text
    }
}

/// What to search for. Exactly one form is active per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Lucene(QueryString),
    Document(QueryDocument),
}

impl Query {
    /// Wrap a lucene-style expression. An empty string is never treated as
    /// "match everything".
    pub fn lucene(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        if text.is_empty() {
            return Err(SearchError::build(ErrorKind::EmptyQuery));
        }
        Ok(Self::Lucene(QueryString::new(text)))
    }

    /// Normalize a raw query document.
    pub fn raw(input: impl Into<RawQuery>) -> Result<Self> {
        let text = match input.into() {
            RawQuery::Bytes(bytes) => bytes,
            RawQuery::Json(value) => document_text(value)?,
            RawQuery::Typed(doc) => {
                let value = doc
                    .source()
                    .map_err(|e| SearchError::build(ErrorKind::UnsupportedInput(e.to_string())))?;
                document_text(value)?
            }
        };
        Ok(Self::Document(QueryDocument { text }))
    }

    /// Request-ready search body, before options are overlaid.
    pub(crate) fn base_body(&self) -> std::result::Result<Map<String, Value>, ErrorKind> {
        match self {
            Self::Lucene(qs) => {
                let clause = qs
                    .source()
                    .map_err(|e| ErrorKind::InvalidDocument(e.to_string()))?;
                let mut body = Map::new();
                body.insert("query".into(), clause);
                Ok(body)
            }
            Self::Document(doc) => doc.parse(),
        }
    }
}

fn document_text(value: Value) -> Result<Vec<u8>> {
    if !value.is_object() {
        return Err(SearchError::build(ErrorKind::UnsupportedInput(format!(
            "query document must be a JSON object, found {}",
            json_type_name(&value)
        ))));
    }
    serde_json::to_vec(&value)
        .map_err(|e| SearchError::build(ErrorKind::UnsupportedInput(e.to_string())))
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
