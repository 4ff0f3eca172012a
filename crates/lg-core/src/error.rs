//! # Errors
//!
//! Every failure carries the [`Phase`] it happened in, so a caller can tell
//! "my query was bad" apart from "the engine is unavailable".

use std::fmt;

use thiserror::Error;

/// Where in the search lifecycle an error surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Client construction (endpoint, transport setup).
    Configure,
    /// Query and request building, before any network call.
    Build,
    /// Engine dry-run of the query.
    Validate,
    /// Search execution and response decoding.
    Execute,
    /// Turning a hit into a [`crate::SearchResult`].
    Extract,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configure => write!(f, "configure"),
            Self::Build => write!(f, "build"),
            Self::Validate => write!(f, "validate"),
            Self::Execute => write!(f, "execute"),
            Self::Extract => write!(f, "extract"),
        }
    }
}

/// Coarse classification used for exit codes and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Config,
    Input,
    Validation,
    Execution,
    Extraction,
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("empty search query, not submitting")]
    EmptyQuery,

    #[error("multiple queries provided (query file and lucene query)")]
    ConflictingQuery,

    #[error("no query provided")]
    MissingQuery,

    #[error("size must be greater than zero")]
    ZeroSize,

    #[error("size must not be negative (got {0})")]
    NegativeSize(i64),

    #[error("unsupported raw query input: {0}")]
    UnsupportedInput(String),

    #[error("query document is not valid JSON: {0}")]
    InvalidDocument(String),

    #[error("query rejected by engine: {reason}")]
    Validation {
        reason: String,
        /// Raw validation response, only kept when query debugging is on.
        response: Option<serde_json::Value>,
    },

    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("request timed out")]
    Timeout,

    #[error("engine returned {status}: {reason}")]
    Engine { status: u16, reason: String },

    #[error("failed to decode engine response: {0}")]
    Decode(String),

    #[error("hit '{id}' has neither source nor requested fields")]
    MissingDocument { id: String },
}

/// An [`ErrorKind`] annotated with the [`Phase`] it occurred in.
#[derive(Debug, Error)]
#[error("{phase}: {kind}")]
pub struct SearchError {
    pub phase: Phase,
    pub kind: ErrorKind,
}

impl SearchError {
    pub fn new(phase: Phase, kind: ErrorKind) -> Self {
        Self { phase, kind }
    }

    pub fn build(kind: ErrorKind) -> Self {
        Self::new(Phase::Build, kind)
    }

    /// Wrap a transport failure, mapping timeouts onto [`ErrorKind::Timeout`].
    pub fn transport(phase: Phase, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new(phase, ErrorKind::Timeout)
        } else {
            Self::new(phase, ErrorKind::Transport(err))
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match &self.kind {
            ErrorKind::InvalidEndpoint { .. } => ErrorCategory::Config,
            ErrorKind::EmptyQuery
            | ErrorKind::ConflictingQuery
            | ErrorKind::MissingQuery
            | ErrorKind::ZeroSize
            | ErrorKind::NegativeSize(_)
            | ErrorKind::UnsupportedInput(_) => ErrorCategory::Input,
            ErrorKind::Validation { .. } => ErrorCategory::Validation,
            // A document that never parsed is reported by whichever phase
            // tried to use it first.
            ErrorKind::InvalidDocument(_) => match self.phase {
                Phase::Validate => ErrorCategory::Validation,
                Phase::Execute => ErrorCategory::Execution,
                _ => ErrorCategory::Input,
            },
            ErrorKind::Transport(_)
            | ErrorKind::Timeout
            | ErrorKind::Engine { .. }
            | ErrorKind::Decode(_) => ErrorCategory::Execution,
            ErrorKind::MissingDocument { .. } => ErrorCategory::Extraction,
        }
    }

    /// The raw validation response, if one was captured.
    pub fn validation_response(&self) -> Option<&serde_json::Value> {
        match &self.kind {
            ErrorKind::Validation { response, .. } => response.as_ref(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;
