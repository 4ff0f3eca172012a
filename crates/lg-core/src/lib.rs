//! # lg-core — query, validate, stream, extract
//!
//! Client-side core of `lgrep`: ad-hoc log searches against an
//! Elasticsearch-compatible engine.
//!
//! ```ignore
//! use std::sync::Arc;
//! use lg_core::{Client, ClientConfig, Query, SearchOptions, Searcher};
//!
//! let client = Client::new(&ClientConfig::new("http://localhost:9200/"))?;
//! let searcher = Searcher::new(Arc::new(client));
//! let mut stream = searcher
//!     .search(Query::lucene("level:error")?, &SearchOptions::default())
//!     .await?;
//! while let Some(result) = stream.next().await {
//!     println!("{}", serde_json::to_string(&result?)?);
//! }
//! ```

pub mod client;
pub mod error;
pub mod options;
pub mod query;
pub mod request;
pub mod result;
pub mod search;
pub mod stream;
pub mod validate;

pub use client::{Client, ClientConfig, SearchBackend, SearchResponse, DEFAULT_ENDPOINT};
pub use error::{ErrorCategory, ErrorKind, Phase, Result, SearchError};
pub use options::{SearchOptions, SortTime, DEFAULT_SPEC};
pub use query::{Query, QuerySource, QueryString, RawQuery};
pub use request::{SearchRequest, SearchRequestBuilder, TIMESTAMP_FIELD};
pub use result::{extract, Hit, SearchResult};
pub use search::{DebugSink, Searcher};
pub use stream::{SearchStream, StreamState};
pub use validate::ValidationReport;
