//! Error taxonomy for the pipeline.
//!
//! Classification and reply-generation paths never surface these to the end
//! user: they degrade to a deterministic substitute (heuristic fallback,
//! per-language apology). Session-management paths return them as typed
//! failures.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiaryError {
    /// Session or record absent, or not owned by the requesting user.
    #[error("not found")]
    NotFound,
    /// Model or store call failed or timed out. Converted to a fallback
    /// value on classification/reply paths.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    /// AI output failed structural or vocabulary validation. Treated like
    /// `UpstreamUnavailable`: logged, then the heuristic path takes over.
    #[error("malformed upstream response: {0}")]
    MalformedUpstreamResponse(String),
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type DiaryResult<T> = Result<T, DiaryError>;
