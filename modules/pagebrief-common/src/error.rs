//! Typed errors for the summary pipeline.
//!
//! Every failure here is recovered at the narrowest possible scope: the
//! orchestrator absorbs per-URL errors, fires the on-error hook once per
//! absorbed failure, and keeps the batch alive. Nothing in this module
//! terminates a request.

use thiserror::Error;

/// Search backend failures. Recovered as an empty candidate list.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("search backend error: {0}")]
    Backend(String),

    #[error("malformed search response: {0}")]
    Malformed(String),
}

/// Page acquisition failures. Recovered as empty content.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    #[error("timed out rendering: {url}")]
    Timeout { url: String },

    #[error("navigation failed for {url}: {message}")]
    Navigation { url: String, message: String },

    #[error("rendering proxy error (status {status}): {message}")]
    Proxy { status: u16, message: String },

    #[error("empty render for: {url}")]
    EmptyRender { url: String },
}

/// Heuristic content gates for discussion pages. Not true errors:
/// rejected pages are logged and skipped, never alerted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QualityReject {
    #[error("post was removed")]
    Removed,

    #[error("post body too short ({chars} chars)")]
    PostTooShort { chars: usize },

    #[error("combined comments too short ({chars} chars)")]
    CommentsTooShort { chars: usize },

    #[error("no post title in markup")]
    NoTitle,

    #[error("no post body in markup")]
    NoPost,

    #[error("no text content")]
    NoText,
}

/// LLM provider failures. A failed summarization is never cached.
#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("provider error (status {status}): {message}")]
    Provider { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("empty completion from {model}")]
    EmptyCompletion { model: String },
}

/// Cache store failures. Lookup degrades to a miss; a failed store is
/// swallowed after reporting, costing a redundant summarization later.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("stored summary is not a recognized provider envelope: {0}")]
    Envelope(String),
}

/// Umbrella over every failure the orchestrator absorbs. The on-error
/// hook receives exactly one of these per absorbed failure.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Summarize(#[from] SummarizeError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Result type alias for retrieval operations.
pub type RetrievalResult<T> = std::result::Result<T, RetrievalError>;

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for summarization operations.
pub type SummarizeResult<T> = std::result::Result<T, SummarizeError>;

/// Result type alias for cache operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;
