//! Error types for the live layer.

use thiserror::Error;

/// Result type for live operations.
pub type LiveResult<T> = Result<T, LiveError>;

/// Errors that can occur while recomputing or delivering live queries.
#[derive(Debug, Error)]
pub enum LiveError {
    /// The entity a single-entity subscription watches does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The source failed to answer the query (store or spec failure).
    #[error("source error: {0}")]
    Source(String),

    /// The recompute did not finish.
    #[error("recompute failed: {0}")]
    RecomputeFailure(String),

    /// The query was handed to a source that serves another entity type.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The connection's push channel is closed.
    #[error("channel closed")]
    ChannelClosed,
}

impl LiveError {
    /// Status code carried by the error frame pushed for this error.
    pub fn code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::InvalidQuery(_) => 400,
            Self::ChannelClosed => 410,
            Self::RecomputeFailure(_) => 504,
            Self::Source(_) => 500,
        }
    }
}
