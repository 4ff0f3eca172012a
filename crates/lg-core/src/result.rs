//! # Results
//!
//! Engine hits and the caller-facing [`SearchResult`] they are extracted into.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{ErrorKind, Phase, Result, SearchError};
use crate::options::SearchOptions;

/// Field projection: requested field name to the values the engine returned.
pub type FieldMap = BTreeMap<String, Vec<Value>>;

/// One engine-returned record, kept as its full JSON envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    envelope: Value,
}

impl Hit {
    pub fn from_envelope(envelope: Value) -> Self {
        Self { envelope }
    }

    pub fn envelope(&self) -> &Value {
        &self.envelope
    }

    pub fn id(&self) -> &str {
        self.envelope
            .get("_id")
            .and_then(Value::as_str)
            .unwrap_or("<unknown>")
    }

    pub fn index(&self) -> Option<&str> {
        self.envelope.get("_index").and_then(Value::as_str)
    }

    pub fn source(&self) -> Option<&Map<String, Value>> {
        self.envelope.get("_source").and_then(Value::as_object)
    }

    /// The field projection, only when it carries at least one field.
    pub fn fields(&self) -> Option<&Map<String, Value>> {
        self.envelope
            .get("fields")
            .and_then(Value::as_object)
            .filter(|f| !f.is_empty())
    }
}

/// Caller-facing shape of a single hit. Exactly one is produced per hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SearchResult {
    /// The entire hit envelope (metadata and source).
    Raw(Value),
    /// The projected fields.
    Field(FieldMap),
    /// The source document.
    Source(Map<String, Value>),
}

impl SearchResult {
    /// Flat, string-keyed view of the payload for templating.
    ///
    /// Single-valued projected fields are unwrapped; multi-valued ones stay
    /// arrays.
    pub fn to_map(&self) -> Map<String, Value> {
        match self {
            Self::Raw(Value::Object(envelope)) => envelope.clone(),
            Self::Raw(other) => {
                let mut map = Map::new();
                map.insert("_raw".into(), other.clone());
                map
            }
            Self::Field(fields) => fields
                .iter()
                .map(|(name, values)| {
                    let value = match values.as_slice() {
                        [single] => single.clone(),
                        _ => Value::Array(values.clone()),
                    };
                    (name.clone(), value)
                })
                .collect(),
            Self::Source(source) => source.clone(),
        }
    }

    /// Look up a field by name, falling back to a dotted path through
    /// nested objects (`"http.status"`).
    pub fn get(&self, path: &str) -> Option<Value> {
        let map = self.to_map();
        if let Some(v) = map.get(path) {
            return Some(v.clone());
        }
        let mut parts = path.split('.');
        let mut current = map.get(parts.next()?)?;
        for part in parts {
            current = match current {
                Value::Object(obj) => obj.get(part)?,
                Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current.clone())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Raw(_) => "raw",
            Self::Field(_) => "field",
            Self::Source(_) => "source",
        }
    }
}

/// Decide which result representation a hit becomes.
///
/// Precedence is fixed: raw, then fields, then source.
pub fn extract(hit: Hit, options: &SearchOptions) -> Result<SearchResult> {
    if options.raw_result {
        return Ok(SearchResult::Raw(hit.envelope));
    }
    if !options.fields.is_empty() {
        if let Some(fields) = hit.fields() {
            return Ok(SearchResult::Field(field_map(fields)));
        }
    }
    if let Some(source) = hit.source() {
        return Ok(SearchResult::Source(source.clone()));
    }
    Err(SearchError::new(
        Phase::Extract,
        ErrorKind::MissingDocument {
            id: hit.id().to_string(),
        },
    ))
}

fn field_map(fields: &Map<String, Value>) -> FieldMap {
    fields
        .iter()
        .map(|(name, value)| {
            let values = match value {
                Value::Array(items) => items.clone(),
                other => vec![other.clone()],
            };
            (name.clone(), values)
        })
        .collect()
}
