//! # Searcher
//!
//! Ties the pieces together: options are applied to a query, the outgoing
//! request is optionally dumped and validated, and a [`SearchStream`] is
//! handed back ready to execute.

use std::io::Write;
use std::sync::{Arc, Mutex};

use crate::client::SearchBackend;
use crate::error::{ErrorKind, Result, SearchError};
use crate::options::SearchOptions;
use crate::query::Query;
use crate::request::SearchRequest;
use crate::stream::SearchStream;
use crate::validate;

/// Destination for query debug output.
pub type DebugSink = Arc<Mutex<dyn Write + Send>>;

pub struct Searcher {
    backend: Arc<dyn SearchBackend>,
    debug_sink: DebugSink,
}

impl Searcher {
    /// Searcher whose debug output goes to stderr.
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self {
            backend,
            debug_sink: Arc::new(Mutex::new(std::io::stderr())),
        }
    }

    pub fn with_debug_sink(mut self, sink: DebugSink) -> Self {
        self.debug_sink = sink;
        self
    }

    /// Prepare a search for `query`.
    ///
    /// Fails before any network call when `options.size` is zero. Unless
    /// validation is skipped, the query is checked by the engine first and a
    /// rejected query never produces a stream.
    pub async fn search(&self, query: Query, options: &SearchOptions) -> Result<SearchStream> {
        // Zero means the caller does not want results; never execute.
        if options.size == 0 {
            return Err(SearchError::build(ErrorKind::ZeroSize));
        }

        let mut builder = SearchRequest::builder(query);
        options.apply(&mut builder);
        let request = builder.build();

        if options.query_debug {
            self.dump(&request.debug_render());
        }

        if !options.query_skip_validate {
            validate::validate(self.backend.as_ref(), &request, options.query_debug).await?;
        }

        Ok(SearchStream::new(
            self.backend.clone(),
            request,
            options.clone(),
        ))
    }

    fn dump(&self, text: &str) {
        match self.debug_sink.lock() {
            Ok(mut sink) => {
                if let Err(e) = writeln!(sink, "{}", text) {
                    tracing::warn!("Failed to write query debug output: {}", e);
                }
            }
            Err(_) => tracing::warn!("Query debug sink is poisoned"),
        }
    }
}
