//! Error types for the repository layer.

use liveset_live::LiveError;
use liveset_model::ModelError;
use liveset_storage::StorageError;
use thiserror::Error;

/// Result type for repository operations.
pub type RepoResult<T> = Result<T, RepoError>;

/// Errors surfaced by repository reads, writes, and subscriptions.
#[derive(Debug, Error)]
pub enum RepoError {
    /// No row has the requested id.
    #[error("{entity_type} {id} not found")]
    NotFound { entity_type: String, id: String },

    /// The query spec does not fit the entity schema.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// The backing store rejected the read or write.
    #[error("store failure: {0}")]
    Storage(#[from] StorageError),

    /// A row could not be converted to or from the entity type.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An entity hook rejected the write.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Registering or delivering a live query failed.
    #[error(transparent)]
    Live(#[from] LiveError),
}

impl From<RepoError> for LiveError {
    fn from(error: RepoError) -> Self {
        match error {
            RepoError::NotFound { .. } => LiveError::NotFound(error.to_string()),
            RepoError::Model(e) => LiveError::InvalidQuery(e.to_string()),
            RepoError::Live(e) => e,
            other => LiveError::Source(other.to_string()),
        }
    }
}
