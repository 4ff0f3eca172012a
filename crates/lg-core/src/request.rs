//! # Search Requests
//!
//! A [`SearchRequest`] pairs a [`Query`] with the settings applied by
//! [`crate::SearchOptions::apply`]. It is owned by exactly one execution.

use serde_json::{Map, Value};

use crate::error::ErrorKind;
use crate::query::Query;

/// Canonical timestamp field used for time ordering.
pub const TIMESTAMP_FIELD: &str = "@timestamp";

/// Prefix for every line of a debug-rendered query.
pub const DEBUG_PREFIX: &str = "q> ";

/// Mutable builder the search options are applied to.
#[derive(Debug, Clone)]
pub struct SearchRequestBuilder {
    query: Query,
    size: Option<usize>,
    indices: Vec<String>,
    sort_ascending: Option<bool>,
    fields: Vec<String>,
}

impl SearchRequestBuilder {
    pub fn new(query: Query) -> Self {
        Self {
            query,
            size: None,
            indices: Vec::new(),
            sort_ascending: None,
            fields: Vec::new(),
        }
    }

    pub fn size(&mut self, size: usize) -> &mut Self {
        self.size = Some(size);
        self
    }

    /// Add indices to search. Repeated calls accumulate.
    pub fn index<I, S>(&mut self, indices: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.indices
            .extend(indices.into_iter().map(|i| i.as_ref().to_string()));
        self
    }

    pub fn sort_by_timestamp(&mut self, ascending: bool) -> &mut Self {
        self.sort_ascending = Some(ascending);
        self
    }

    pub fn fields<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.fields = fields
            .into_iter()
            .map(|f| f.as_ref().to_string())
            .collect();
        self
    }

    pub fn build(self) -> SearchRequest {
        SearchRequest {
            query: self.query,
            size: self.size,
            indices: self.indices,
            sort_ascending: self.sort_ascending,
            fields: self.fields,
        }
    }
}

/// A fully configured search, ready for validation and execution.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    query: Query,
    size: Option<usize>,
    indices: Vec<String>,
    sort_ascending: Option<bool>,
    fields: Vec<String>,
}

impl SearchRequest {
    pub fn builder(query: Query) -> SearchRequestBuilder {
        SearchRequestBuilder::new(query)
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Indices to search; empty means every index.
    pub fn indices(&self) -> &[String] {
        &self.indices
    }

    pub fn size(&self) -> Option<usize> {
        self.size
    }

    /// The exact JSON body submitted to the engine's search endpoint.
    ///
    /// For raw documents the applied options overwrite the matching
    /// top-level keys of the document.
    pub fn body(&self) -> Result<Value, ErrorKind> {
        let mut body = self.query.base_body()?;
        self.overlay(&mut body);
        Ok(Value::Object(body))
    }

    fn overlay(&self, body: &mut Map<String, Value>) {
        if let Some(size) = self.size {
            body.insert("size".into(), Value::from(size));
        }
        if let Some(ascending) = self.sort_ascending {
            let order = if ascending { "asc" } else { "desc" };
            body.insert(
                "sort".into(),
                serde_json::json!([{ TIMESTAMP_FIELD: { "order": order } }]),
            );
        }
        if !self.fields.is_empty() {
            body.insert("fields".into(), Value::from(self.fields.clone()));
        }
    }

    /// Human-readable rendering of what will be submitted, every line
    /// prefixed with [`DEBUG_PREFIX`]. A document that does not parse is
    /// rendered verbatim.
    pub fn debug_render(&self) -> String {
        let text = match self.body() {
            Ok(body) => serde_json::to_string_pretty(&body).unwrap_or_else(|_| body.to_string()),
            Err(_) => match &self.query {
                Query::Document(doc) => String::from_utf8_lossy(doc.as_bytes()).into_owned(),
                Query::Lucene(qs) => qs.query.clone(),
            },
        };
        prefix_lines(&text, DEBUG_PREFIX)
    }
}

pub(crate) fn prefix_lines(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| format!("{}{}", prefix, line))
        .collect::<Vec<_>>()
        .join("\n")
}
