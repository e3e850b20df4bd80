//! Error types for the storage layer.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No table is registered for the entity type.
    #[error("unknown entity type: {0}")]
    UnknownEntityType(String),

    /// A relation path names a relation the schema does not declare.
    #[error("unknown relation `{relation}` on {entity_type}")]
    UnknownRelation {
        entity_type: String,
        relation: String,
    },

    /// Invalid data.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backend rejected the operation.
    #[error("backend error: {0}")]
    Backend(String),
}
