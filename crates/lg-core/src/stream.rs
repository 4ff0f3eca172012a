//! # Search Stream
//!
//! A single-pass cursor bound to one [`SearchRequest`].
//!
//! ```text
//! Built ──pull──▶ Executing ──last hit──▶ Exhausted
//!   │
//!   └──engine error──▶ Failed
//! ```
//!
//! Both terminal states are final: a new search needs a new request and a
//! new stream.

use std::collections::VecDeque;
use std::sync::Arc;

use futures::Stream;

use crate::client::SearchBackend;
use crate::error::{Phase, Result, SearchError};
use crate::options::SearchOptions;
use crate::request::SearchRequest;
use crate::result::{extract, Hit, SearchResult};

/// Lifecycle of a [`SearchStream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Request assembled, nothing sent yet.
    Built,
    /// Response received, hits remain to be pulled.
    Executing,
    /// Every hit has been delivered.
    Exhausted,
    /// The engine or transport failed; no results will follow.
    Failed,
}

impl StreamState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Exhausted | Self::Failed)
    }
}

pub struct SearchStream {
    backend: Arc<dyn SearchBackend>,
    request: SearchRequest,
    options: SearchOptions,
    state: StreamState,
    pending: VecDeque<Hit>,
    /// Hits still allowed out of this stream.
    remaining: usize,
}

impl SearchStream {
    pub(crate) fn new(
        backend: Arc<dyn SearchBackend>,
        request: SearchRequest,
        options: SearchOptions,
    ) -> Self {
        let remaining = options.size;
        Self {
            backend,
            request,
            options,
            state: StreamState::Built,
            pending: VecDeque::new(),
            remaining,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn request(&self) -> &SearchRequest {
        &self.request
    }

    /// Pull the next result, executing the request on the first call.
    ///
    /// Returns `None` once the stream is exhausted or has failed. A hit that
    /// cannot be extracted is returned as an error without ending the stream.
    pub async fn next(&mut self) -> Option<Result<SearchResult>> {
        match self.state {
            StreamState::Built => {
                if let Err(e) = self.execute().await {
                    self.state = StreamState::Failed;
                    return Some(Err(e));
                }
            }
            StreamState::Executing => {}
            StreamState::Exhausted | StreamState::Failed => return None,
        }

        let hit = match self.pending.pop_front() {
            Some(hit) if self.remaining > 0 => hit,
            _ => {
                self.finish();
                return None;
            }
        };
        self.remaining -= 1;
        if self.pending.is_empty() || self.remaining == 0 {
            self.finish();
        }
        Some(extract(hit, &self.options))
    }

    /// Drain every remaining result in yield order, stopping at the first
    /// error.
    pub async fn all(mut self) -> Result<Vec<SearchResult>> {
        let mut results = Vec::new();
        while let Some(result) = self.next().await {
            results.push(result?);
        }
        Ok(results)
    }

    /// Adapt the cursor into a [`futures::Stream`].
    pub fn into_stream(self) -> impl Stream<Item = Result<SearchResult>> {
        futures::stream::unfold(self, |mut stream| async move {
            let item = stream.next().await?;
            Some((item, stream))
        })
    }

    async fn execute(&mut self) -> Result<()> {
        self.state = StreamState::Executing;
        let body = self
            .request
            .body()
            .map_err(|kind| SearchError::new(Phase::Execute, kind))?;

        tracing::debug!(indices = ?self.request.indices(), "Executing search");
        let response = self.backend.search(self.request.indices(), &body).await?;

        self.pending = response
            .hits
            .hits
            .into_iter()
            .take(self.remaining)
            .map(Hit::from_envelope)
            .collect();
        Ok(())
    }

    fn finish(&mut self) {
        self.pending.clear();
        self.state = StreamState::Exhausted;
    }
}

impl std::fmt::Debug for SearchStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchStream")
            .field("state", &self.state)
            .field("pending", &self.pending.len())
            .field("remaining", &self.remaining)
            .finish()
    }
}
