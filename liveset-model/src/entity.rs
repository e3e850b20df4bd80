use crate::EntitySchema;
use liveset_types::EntityKey;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;

/// A typed record served by a repository.
///
/// Rows travel through the store as JSON objects; this trait ties a Rust type
/// to its entity type name, its schema, and its key. Relation fields on the
/// Rust type should be `#[serde(default)]` since unprojected reads do not load
/// them.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// The key type, consistent for every row of this entity type.
    type Id: Into<EntityKey> + Clone + Debug + Send + Sync + 'static;

    /// Name the store and the registry know this entity type by.
    const ENTITY_TYPE: &'static str;

    fn id(&self) -> Self::Id;

    fn schema() -> EntitySchema;
}
