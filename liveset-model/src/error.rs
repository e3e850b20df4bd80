//! Error types for the query model.

use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while parsing or validating query specifications.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A spec key names a field or relation the entity type does not have.
    #[error("schema mismatch on {entity_type}: unknown key `{path}`")]
    SchemaMismatch { entity_type: String, path: String },

    /// No schema is registered for the entity type.
    #[error("unknown entity type: {0}")]
    UnknownEntityType(String),

    /// The spec is not a well-formed selection tree.
    #[error("invalid query spec: {0}")]
    InvalidSpec(String),
}
