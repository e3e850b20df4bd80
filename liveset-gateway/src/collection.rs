//! Type-erased access to the repositories the gateway serves.
//!
//! The wire speaks entity type names and JSON; [`Collection`] lets the
//! gateway route a message to `Repository<E>` without knowing `E`.

use async_trait::async_trait;
use liveset_live::ConnectionHandle;
use liveset_model::{Entity, QuerySpec};
use liveset_repository::{RepoError, RepoResult, Repository};
use liveset_storage::FindOptions;
use liveset_types::{ChannelId, EntityKey, SubscriptionId};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// One entity type's repository, driven with JSON.
#[async_trait]
pub trait Collection: Send + Sync {
    fn entity_type(&self) -> &str;

    async fn subscribe_one(
        &self,
        connection: &ConnectionHandle,
        channel: ChannelId,
        id: EntityKey,
        spec: &QuerySpec,
    ) -> RepoResult<SubscriptionId>;

    async fn subscribe_many(
        &self,
        connection: &ConnectionHandle,
        channel: ChannelId,
        ids: Vec<EntityKey>,
        spec: &QuerySpec,
    ) -> RepoResult<SubscriptionId>;

    async fn subscribe_query(
        &self,
        connection: &ConnectionHandle,
        channel: ChannelId,
        spec: &QuerySpec,
        options: FindOptions,
    ) -> RepoResult<SubscriptionId>;

    async fn upsert(&self, row: Value) -> RepoResult<Value>;

    /// `segment` is the id as it appears in a URL path.
    async fn update(&self, segment: &str, patch: Value) -> RepoResult<Value>;

    /// Returns the deleted key in its wire form.
    async fn delete(&self, segment: &str) -> RepoResult<EntityKey>;
}

#[async_trait]
impl<E> Collection for Repository<E>
where
    E: Entity,
    E::Id: DeserializeOwned,
{
    fn entity_type(&self) -> &str {
        E::ENTITY_TYPE
    }

    async fn subscribe_one(
        &self,
        connection: &ConnectionHandle,
        channel: ChannelId,
        id: EntityKey,
        spec: &QuerySpec,
    ) -> RepoResult<SubscriptionId> {
        let id = typed_id::<E>(&id)?;
        Repository::subscribe_one(self, connection, channel, id, spec).await
    }

    async fn subscribe_many(
        &self,
        connection: &ConnectionHandle,
        channel: ChannelId,
        ids: Vec<EntityKey>,
        spec: &QuerySpec,
    ) -> RepoResult<SubscriptionId> {
        let ids = ids
            .iter()
            .map(typed_id::<E>)
            .collect::<RepoResult<Vec<_>>>()?;
        Repository::subscribe_many(self, connection, channel, &ids, spec).await
    }

    async fn subscribe_query(
        &self,
        connection: &ConnectionHandle,
        channel: ChannelId,
        spec: &QuerySpec,
        options: FindOptions,
    ) -> RepoResult<SubscriptionId> {
        Repository::subscribe_query(self, connection, channel, spec, options).await
    }

    async fn upsert(&self, row: Value) -> RepoResult<Value> {
        let entity: E = serde_json::from_value(row)?;
        let saved = Repository::upsert(self, &entity).await?;
        Ok(serde_json::to_value(saved)?)
    }

    async fn update(&self, segment: &str, patch: Value) -> RepoResult<Value> {
        let id = path_id::<E>(segment)?;
        let saved = Repository::update(self, id, patch).await?;
        Ok(serde_json::to_value(saved)?)
    }

    async fn delete(&self, segment: &str) -> RepoResult<EntityKey> {
        let id = path_id::<E>(segment)?;
        let deleted = Repository::delete(self, id).await?;
        Ok(deleted.into())
    }
}

/// Converts a wire key into the entity's own key type.
fn typed_id<E>(key: &EntityKey) -> RepoResult<E::Id>
where
    E: Entity,
    E::Id: DeserializeOwned,
{
    serde_json::from_value(key.to_value())
        .map_err(|_| RepoError::Validation(format!("invalid {} id: {}", E::ENTITY_TYPE, key)))
}

/// Reads a URL path segment as the entity's key. String keys take the segment
/// verbatim, so `"007"` stays `"007"`; integer keys parse it.
fn path_id<E>(segment: &str) -> RepoResult<E::Id>
where
    E: Entity,
    E::Id: DeserializeOwned,
{
    if let Ok(id) = serde_json::from_value(Value::String(segment.to_string())) {
        return Ok(id);
    }
    let key = segment
        .parse::<i64>()
        .map(EntityKey::Int)
        .unwrap_or_else(|_| EntityKey::Str(segment.to_string()));
    typed_id::<E>(&key)
}

/// The collections a gateway serves, by entity type.
#[derive(Default, Clone)]
pub struct Collections {
    by_type: HashMap<String, Arc<dyn Collection>>,
}

impl Collections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, collection: Arc<dyn Collection>) -> Self {
        self.by_type
            .insert(collection.entity_type().to_string(), collection);
        self
    }

    pub fn get(&self, entity_type: &str) -> Option<&Arc<dyn Collection>> {
        self.by_type.get(entity_type)
    }

    pub fn entity_types(&self) -> impl Iterator<Item = &str> {
        self.by_type.keys().map(String::as_str)
    }
}
