//! Live queries on a repository.
//!
//! Subscribing validates the spec up front, registers a [`LiveQuery`] that
//! records the read to repeat, and lets the registry push the initial
//! snapshot. The repository is the [`LiveSource`] that answers recomputes.

use crate::repository::{Repository, not_found};
use crate::RepoResult;
use async_trait::async_trait;
use liveset_live::{ConnectionHandle, LiveQuery, LiveResult, LiveSource};
use liveset_model::{Entity, QuerySpec, validate_spec};
use liveset_storage::FindOptions;
use liveset_types::{ChannelId, ConnectionId, EntityKey, SubscriptionId};
use serde_json::Value;

impl<E: Entity> Repository<E> {
    /// Watches one entity. Pushes go out whenever `id` is written or deleted;
    /// after a delete the channel receives a not-found error frame.
    pub async fn subscribe_one(
        &self,
        connection: &ConnectionHandle,
        channel: impl Into<ChannelId>,
        id: E::Id,
        spec: &QuerySpec,
    ) -> RepoResult<SubscriptionId> {
        let query = LiveQuery::One {
            id: id.into(),
            spec: self.checked(spec)?,
        };
        self.register(connection, channel.into(), query).await
    }

    /// Watches a fixed set of entities, pushed as a list in request order.
    pub async fn subscribe_many(
        &self,
        connection: &ConnectionHandle,
        channel: impl Into<ChannelId>,
        ids: &[E::Id],
        spec: &QuerySpec,
    ) -> RepoResult<SubscriptionId> {
        let query = LiveQuery::Many {
            ids: ids.iter().cloned().map(Into::into).collect(),
            spec: self.checked(spec)?,
        };
        self.register(connection, channel.into(), query).await
    }

    /// Watches an arbitrary query. It is re-run on every write to this
    /// entity type, whatever ids were touched.
    pub async fn subscribe_query(
        &self,
        connection: &ConnectionHandle,
        channel: impl Into<ChannelId>,
        spec: &QuerySpec,
        options: FindOptions,
    ) -> RepoResult<SubscriptionId> {
        let query = LiveQuery::Query {
            spec: self.checked(spec)?,
            options,
        };
        self.register(connection, channel.into(), query).await
    }

    pub async fn unsubscribe(&self, connection: ConnectionId, channel: &ChannelId) -> bool {
        self.registry.unsubscribe(connection, channel).await
    }

    /// Drops every subscription of a connection, across all entity types.
    pub async fn on_disconnect(&self, connection: ConnectionId) -> usize {
        self.registry.on_disconnect(connection).await
    }

    fn checked(&self, spec: &QuerySpec) -> RepoResult<QuerySpec> {
        Ok(validate_spec(
            self.schemas(),
            E::ENTITY_TYPE,
            spec,
            self.config().validation,
        )?)
    }

    async fn register(
        &self,
        connection: &ConnectionHandle,
        channel: ChannelId,
        query: LiveQuery,
    ) -> RepoResult<SubscriptionId> {
        Ok(self
            .registry
            .subscribe(self, connection, channel, query)
            .await?)
    }

    async fn recompute_one(&self, id: &EntityKey, spec: &QuerySpec) -> RepoResult<Value> {
        self.fetch_one(id, spec)
            .await?
            .ok_or_else(|| not_found::<E>(id))
    }
}

#[async_trait]
impl<E: Entity> LiveSource for Repository<E> {
    fn entity_type(&self) -> &str {
        E::ENTITY_TYPE
    }

    async fn recompute(&self, query: &LiveQuery) -> LiveResult<Value> {
        let result = match query {
            LiveQuery::One { id, spec } => self.recompute_one(id, spec).await,
            LiveQuery::Many { ids, spec } => self.fetch_many(ids, spec).await.map(Value::Array),
            LiveQuery::Query { spec, options } => {
                self.query(spec, options).await.map(|r| r.into_value())
            }
        };
        Ok(result?)
    }
}
