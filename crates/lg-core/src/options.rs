//! # Search Options
//!
//! Per-invocation settings applied once to a [`SearchRequestBuilder`].

use serde::{Deserialize, Serialize};

use crate::request::SearchRequestBuilder;

/// Direction for sorting by the canonical timestamp field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortTime {
    /// Leave ordering to the engine (relevance).
    #[default]
    Unset,
    Ascending,
    Descending,
}

/// Options describing how a query should be executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Maximum number of results. `0` means "do not execute".
    pub size: usize,
    /// A single index to search.
    pub index: Option<String>,
    /// Additional indices to search, applied together with `index`.
    pub indices: Vec<String>,
    pub sort_time: SortTime,
    /// Fields to project from each hit.
    pub fields: Vec<String>,
    /// Return the whole hit envelope instead of its source or fields.
    pub raw_result: bool,
    /// Dump the outgoing query (and failed validation responses).
    pub query_debug: bool,
    pub query_skip_validate: bool,
}

/// A reasonable default search specification.
pub const DEFAULT_SPEC: SearchOptions = SearchOptions {
    size: 100,
    index: None,
    indices: Vec::new(),
    sort_time: SortTime::Descending,
    fields: Vec::new(),
    raw_result: false,
    query_debug: false,
    query_skip_validate: false,
};

impl Default for SearchOptions {
    fn default() -> Self {
        DEFAULT_SPEC
    }
}

impl SearchOptions {
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn with_indices<I, S>(mut self, indices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.indices = indices.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_sort_time(mut self, sort_time: SortTime) -> Self {
        self.sort_time = sort_time;
        self
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_raw_result(mut self, raw: bool) -> Self {
        self.raw_result = raw;
        self
    }

    pub fn with_query_debug(mut self, debug: bool) -> Self {
        self.query_debug = debug;
        self
    }

    pub fn with_skip_validate(mut self, skip: bool) -> Self {
        self.query_skip_validate = skip;
        self
    }

    /// Apply size, index selection and sort direction (in that order) to a
    /// request, each only when set. Field projection follows. Never fails;
    /// bad targets surface when the request executes.
    pub fn apply(&self, search: &mut SearchRequestBuilder) {
        if self.size != 0 {
            search.size(self.size);
        }
        if let Some(index) = self.index.as_deref().filter(|i| !i.is_empty()) {
            search.index([index]);
        }
        if !self.indices.is_empty() {
            search.index(&self.indices);
        }
        match self.sort_time {
            SortTime::Unset => {}
            SortTime::Ascending => {
                search.sort_by_timestamp(true);
            }
            SortTime::Descending => {
                search.sort_by_timestamp(false);
            }
        }
        if !self.fields.is_empty() {
            search.fields(&self.fields);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Query;
    use serde_json::json;

    fn builder() -> SearchRequestBuilder {
        SearchRequestBuilder::new(Query::lucene("error").unwrap())
    }

    #[test]
    fn test_default_spec() {
        let opts = SearchOptions::default();
        assert_eq!(opts.size, 100);
        assert_eq!(opts.sort_time, SortTime::Descending);
        assert!(!opts.query_skip_validate);
    }

    #[test]
    fn test_apply_sets_everything() {
        let opts = SearchOptions::default()
            .with_size(5)
            .with_index("logs-a")
            .with_indices(["logs-b", "logs-c"])
            .with_sort_time(SortTime::Ascending)
            .with_fields(["host"]);
        let mut search = builder();
        opts.apply(&mut search);
        let request = search.build();

        assert_eq!(request.indices(), ["logs-a", "logs-b", "logs-c"]);
        let body = request.body().unwrap();
        assert_eq!(body["size"], json!(5));
        assert_eq!(body["sort"], json!([{ "@timestamp": { "order": "asc" } }]));
        assert_eq!(body["fields"], json!(["host"]));
    }

    #[test]
    fn test_apply_sorts_descending_by_default() {
        let mut search = builder();
        SearchOptions::default().apply(&mut search);
        let body = search.build().body().unwrap();
        assert_eq!(body["sort"], json!([{ "@timestamp": { "order": "desc" } }]));
    }

    #[test]
    fn test_apply_skips_unset_values() {
        let opts = SearchOptions {
            size: 0,
            index: Some(String::new()),
            sort_time: SortTime::Unset,
            ..SearchOptions::default()
        };
        let mut search = builder();
        opts.apply(&mut search);
        let request = search.build();

        assert!(request.indices().is_empty());
        let body = request.body().unwrap();
        assert!(body.get("size").is_none());
        assert!(body.get("sort").is_none());
        assert!(body.get("fields").is_none());
    }

    #[test]
    fn test_apply_does_not_mutate_options() {
        let opts = SearchOptions::default().with_index("logs");
        let before = opts.clone();
        opts.apply(&mut builder());
        assert_eq!(opts, before);
    }
}
