//! The generic repository façade.
//!
//! Every read has two forms: a typed one returning `E` with no relations
//! loaded, and a `_with` one taking a [`QuerySpec`] and returning the
//! projected JSON value. Every write triggers invalidation for the ids it
//! touched after the store accepted it and before the fresh value is read
//! back for the caller.

use crate::{QueryResult, RepoError, RepoResult};
use liveset_live::SubscriptionRegistry;
use liveset_model::{
    Entity, EntityHooks, QuerySpec, RelationPaths, SchemaRegistry, ValidationMode,
    extract_relation_paths, project, project_many, project_page, validate_spec,
};
use liveset_storage::{EntityStore, FindOptions};
use liveset_types::EntityKey;
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

const ID_FIELD: &str = "id";

/// Configuration for a repository.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepositoryConfig {
    /// How query specs with unknown keys are treated.
    pub validation: ValidationMode,
}

/// CRUD and live queries over one entity type.
///
/// Cloning is cheap; clones share the store, the subscription registry,
/// and the schema registry.
pub struct Repository<E: Entity> {
    store: Arc<dyn EntityStore>,
    pub(crate) registry: Arc<SubscriptionRegistry>,
    schemas: Arc<SchemaRegistry>,
    config: RepositoryConfig,
    hooks: Option<Arc<dyn EntityHooks>>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            registry: Arc::clone(&self.registry),
            schemas: Arc::clone(&self.schemas),
            config: self.config,
            hooks: self.hooks.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> fmt::Debug for Repository<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("entity_type", &E::ENTITY_TYPE)
            .field("config", &self.config)
            .field("hooks", &self.hooks.is_some())
            .finish_non_exhaustive()
    }
}

impl<E: Entity> Repository<E> {
    /// Creates a repository. `schemas` must hold the schema of `E` and of
    /// every entity type its relations reach.
    pub fn new(
        store: Arc<dyn EntityStore>,
        registry: Arc<SubscriptionRegistry>,
        schemas: Arc<SchemaRegistry>,
    ) -> Self {
        Self {
            store,
            registry,
            schemas,
            config: RepositoryConfig::default(),
            hooks: None,
            _entity: PhantomData,
        }
    }

    pub fn with_config(mut self, config: RepositoryConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn EntityHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    pub fn schemas(&self) -> &Arc<SchemaRegistry> {
        &self.schemas
    }

    // ── typed reads ─────────────────────────────────────────────

    pub async fn find_one_or_fail(&self, id: E::Id) -> RepoResult<E> {
        let key: EntityKey = id.into();
        self.reload(&key).await
    }

    pub async fn find_one(&self, id: E::Id) -> RepoResult<Option<E>> {
        self.load_one(&id.into(), &RelationPaths::new())
            .await?
            .map(decode::<E>)
            .transpose()
    }

    /// Rows for `ids` in request order; missing ids are skipped.
    pub async fn find_many(&self, ids: &[E::Id]) -> RepoResult<Vec<E>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.load_many(&keys::<E>(ids), &RelationPaths::new())
            .await?
            .into_iter()
            .map(decode::<E>)
            .collect()
    }

    pub async fn find_all(&self) -> RepoResult<Vec<E>> {
        self.find(&FindOptions::new()).await
    }

    pub async fn find(&self, options: &FindOptions) -> RepoResult<Vec<E>> {
        self.load_all(options, &RelationPaths::new())
            .await?
            .into_iter()
            .map(decode::<E>)
            .collect()
    }

    // ── projected reads ─────────────────────────────────────────

    pub async fn find_one_or_fail_with(&self, id: E::Id, spec: &QuerySpec) -> RepoResult<Value> {
        let key: EntityKey = id.into();
        self.fetch_one(&key, spec)
            .await?
            .ok_or_else(|| not_found::<E>(&key))
    }

    pub async fn find_one_with(&self, id: E::Id, spec: &QuerySpec) -> RepoResult<Option<Value>> {
        self.fetch_one(&id.into(), spec).await
    }

    pub async fn find_many_with(&self, ids: &[E::Id], spec: &QuerySpec) -> RepoResult<Vec<Value>> {
        self.fetch_many(&keys::<E>(ids), spec).await
    }

    /// Every row, projected. Pagination keys in `spec` are ignored.
    pub async fn find_all_with(&self, spec: &QuerySpec) -> RepoResult<Vec<Value>> {
        let (spec, relations) = self.prepare(&spec.without_pagination())?;
        let rows = self.load_all(&FindOptions::new(), &relations).await?;
        Ok(project_many(&spec, &rows))
    }

    /// Runs a filtered query. A spec carrying `page` or `limit` returns one
    /// page with its total; otherwise the full list.
    pub async fn query(&self, spec: &QuerySpec, options: &FindOptions) -> RepoResult<QueryResult> {
        let (spec, relations) = self.prepare(spec)?;
        match spec.pagination() {
            Some(pagination) => {
                let page = self
                    .store
                    .find_page(E::ENTITY_TYPE, options, pagination, &relations)
                    .await?
                    .map(|rows| self.after_load(rows));
                Ok(QueryResult::Page(project_page(&spec, page)))
            }
            None => {
                let rows = self.load_all(options, &relations).await?;
                Ok(QueryResult::List(project_many(&spec, &rows)))
            }
        }
    }

    // ── writes ──────────────────────────────────────────────────

    /// Merges `patch` into the row with `id` and returns the row as stored.
    pub async fn update(&self, id: E::Id, patch: Value) -> RepoResult<E> {
        let key = self.write_patch(id, patch).await?;
        self.reload(&key).await
    }

    pub async fn update_with(&self, id: E::Id, patch: Value, spec: &QuerySpec) -> RepoResult<Value> {
        let key = self.write_patch(id, patch).await?;
        self.fetch_one(&key, spec)
            .await?
            .ok_or_else(|| not_found::<E>(&key))
    }

    pub async fn upsert(&self, entity: &E) -> RepoResult<E> {
        let key: EntityKey = entity.id().into();
        self.write_rows(vec![encode(entity)?], &[key.clone()]).await?;
        self.reload(&key).await
    }

    pub async fn upsert_with(&self, entity: &E, spec: &QuerySpec) -> RepoResult<Value> {
        let key: EntityKey = entity.id().into();
        self.write_rows(vec![encode(entity)?], &[key.clone()]).await?;
        self.fetch_one(&key, spec)
            .await?
            .ok_or_else(|| not_found::<E>(&key))
    }

    /// Writes every entity and triggers once for the whole id set.
    ///
    /// The batch is only atomic if the store makes it so.
    pub async fn upsert_many(&self, entities: &[E]) -> RepoResult<Vec<E>> {
        if entities.is_empty() {
            return Ok(Vec::new());
        }
        let keys = self.write_entities(entities).await?;
        self.load_many(&keys, &RelationPaths::new())
            .await?
            .into_iter()
            .map(decode::<E>)
            .collect()
    }

    pub async fn upsert_many_with(&self, entities: &[E], spec: &QuerySpec) -> RepoResult<Vec<Value>> {
        if entities.is_empty() {
            return Ok(Vec::new());
        }
        let keys = self.write_entities(entities).await?;
        self.fetch_many(&keys, spec).await
    }

    /// Deletes the row with `id` and returns the id. A missing row is not an
    /// error; subscribers are still notified.
    pub async fn delete(&self, id: E::Id) -> RepoResult<E::Id> {
        let key: EntityKey = id.clone().into();
        let removed = self.store.delete(E::ENTITY_TYPE, &[key.clone()]).await?;
        debug!("Deleted {} {} (existed={})", E::ENTITY_TYPE, key, removed > 0);
        self.invalidate(&[key]).await;
        Ok(id)
    }

    pub async fn delete_many(&self, ids: &[E::Id]) -> RepoResult<Vec<E::Id>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let keys = keys::<E>(ids);
        let removed = self.store.delete(E::ENTITY_TYPE, &keys).await?;
        debug!("Deleted {} of {} {} rows", removed, keys.len(), E::ENTITY_TYPE);
        self.invalidate(&keys).await;
        Ok(ids.to_vec())
    }

    // ── internals ───────────────────────────────────────────────

    async fn reload(&self, key: &EntityKey) -> RepoResult<E> {
        match self.load_one(key, &RelationPaths::new()).await? {
            Some(row) => decode(row),
            None => Err(not_found::<E>(key)),
        }
    }

    /// Validates `spec` against the schema and extracts the relation paths
    /// to load. Runs before any store access.
    fn prepare(&self, spec: &QuerySpec) -> RepoResult<(QuerySpec, RelationPaths)> {
        let spec = validate_spec(&self.schemas, E::ENTITY_TYPE, spec, self.config.validation)?;
        let relations = extract_relation_paths(&spec);
        Ok((spec, relations))
    }

    pub(crate) async fn fetch_one(&self, key: &EntityKey, spec: &QuerySpec) -> RepoResult<Option<Value>> {
        let (spec, relations) = self.prepare(spec)?;
        Ok(self
            .load_one(key, &relations)
            .await?
            .map(|row| project(&spec, &row)))
    }

    pub(crate) async fn fetch_many(&self, keys: &[EntityKey], spec: &QuerySpec) -> RepoResult<Vec<Value>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let (spec, relations) = self.prepare(spec)?;
        let rows = self.load_many(keys, &relations).await?;
        Ok(project_many(&spec, &rows))
    }

    async fn load_one(&self, key: &EntityKey, relations: &RelationPaths) -> RepoResult<Option<Value>> {
        let row = self.store.find_by_id(E::ENTITY_TYPE, key, relations).await?;
        Ok(row.map(|row| self.after_load_one(row)))
    }

    async fn load_many(&self, keys: &[EntityKey], relations: &RelationPaths) -> RepoResult<Vec<Value>> {
        let rows = self.store.find_by_ids(E::ENTITY_TYPE, keys, relations).await?;
        Ok(self.after_load(rows))
    }

    async fn load_all(&self, options: &FindOptions, relations: &RelationPaths) -> RepoResult<Vec<Value>> {
        let rows = self.store.find(E::ENTITY_TYPE, options, relations).await?;
        Ok(self.after_load(rows))
    }

    fn after_load_one(&self, mut row: Value) -> Value {
        if let Some(hooks) = &self.hooks {
            hooks.on_after_load(&mut row);
        }
        row
    }

    fn after_load(&self, rows: Vec<Value>) -> Vec<Value> {
        rows.into_iter().map(|row| self.after_load_one(row)).collect()
    }

    async fn write_patch(&self, id: E::Id, patch: Value) -> RepoResult<EntityKey> {
        let Value::Object(mut fields) = patch else {
            return Err(RepoError::Validation(format!(
                "{} patch must be an object",
                E::ENTITY_TYPE
            )));
        };
        let key: EntityKey = id.into();
        fields.insert(ID_FIELD.to_string(), key.to_value());
        self.write_rows(vec![Value::Object(fields)], &[key.clone()])
            .await?;
        Ok(key)
    }

    async fn write_entities(&self, entities: &[E]) -> RepoResult<Vec<EntityKey>> {
        let keys: Vec<EntityKey> = entities.iter().map(|e| e.id().into()).collect();
        let rows = entities.iter().map(encode).collect::<RepoResult<Vec<_>>>()?;
        self.write_rows(rows, &keys).await?;
        Ok(keys)
    }

    /// Validates, saves, then triggers invalidation for `keys`.
    async fn write_rows(&self, rows: Vec<Value>, keys: &[EntityKey]) -> RepoResult<()> {
        if let Some(hooks) = &self.hooks {
            for row in &rows {
                hooks.validate(row).map_err(RepoError::Validation)?;
            }
        }
        let count = rows.len();
        self.store.save(E::ENTITY_TYPE, rows).await?;
        debug!("Saved {} {} rows", count, E::ENTITY_TYPE);
        self.invalidate(keys).await;
        Ok(())
    }

    async fn invalidate(&self, keys: &[EntityKey]) {
        let report = self.registry.trigger(self, keys).await;
        if report.matched > 0 {
            debug!(
                "Invalidated {} {} subscriptions ({} delivered, {} failed, {} discarded)",
                report.matched,
                E::ENTITY_TYPE,
                report.delivered,
                report.failed,
                report.discarded
            );
        }
    }
}

pub(crate) fn not_found<E: Entity>(key: &EntityKey) -> RepoError {
    RepoError::NotFound {
        entity_type: E::ENTITY_TYPE.to_string(),
        id: key.to_string(),
    }
}

fn keys<E: Entity>(ids: &[E::Id]) -> Vec<EntityKey> {
    ids.iter().cloned().map(Into::into).collect()
}

fn encode<E: Entity>(entity: &E) -> RepoResult<Value> {
    Ok(serde_json::to_value(entity)?)
}

fn decode<E: Entity>(row: Value) -> RepoResult<E> {
    Ok(serde_json::from_value(row)?)
}
