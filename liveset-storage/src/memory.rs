//! In-memory entity store.
//!
//! Holds one ordered table per registered entity type and resolves relations
//! through the schema registry, so it behaves like a small relational store
//! with eager loading. Every trait call is counted, and reads or writes can be
//! made to fail on demand.

use crate::{EntityStore, FindOptions, StorageError, StorageResult};
use async_trait::async_trait;
use liveset_model::{Page, Pagination, RelationKind, RelationPaths, RelationTree, SchemaRegistry};
use liveset_types::EntityKey;
use serde_json::{Map, Value};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

type Row = Map<String, Value>;
type Table = BTreeMap<EntityKey, Row>;
type Tables = HashMap<String, Table>;

const ID_FIELD: &str = "id";

/// Snapshot of how often a store was called.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub reads: u64,
    pub writes: u64,
}

impl StoreStats {
    pub fn total(&self) -> u64 {
        self.reads + self.writes
    }
}

/// An [`EntityStore`] kept entirely in memory.
pub struct MemoryStore {
    schemas: Arc<SchemaRegistry>,
    tables: RwLock<Tables>,
    reads: AtomicU64,
    writes: AtomicU64,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    /// Creates an empty table for every entity type in `schemas`.
    pub fn new(schemas: Arc<SchemaRegistry>) -> Self {
        let tables = schemas
            .entity_types()
            .map(|t| (t.to_string(), Table::new()))
            .collect();
        Self {
            schemas,
            tables: RwLock::new(tables),
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Inserts rows without counting the call or honouring failure injection.
    pub async fn seed(&self, entity_type: &str, rows: Vec<Value>) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        merge_rows(&self.schemas, &mut tables, entity_type, rows)
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            reads: self.reads.load(Ordering::SeqCst),
            writes: self.writes.load(Ordering::SeqCst),
        }
    }

    pub fn reset_stats(&self) {
        self.reads.store(0, Ordering::SeqCst);
        self.writes.store(0, Ordering::SeqCst);
    }

    /// Makes every subsequent read fail with a backend error.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent write fail with a backend error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of rows currently stored for an entity type.
    pub async fn len(&self, entity_type: &str) -> usize {
        self.tables
            .read()
            .await
            .get(entity_type)
            .map_or(0, BTreeMap::len)
    }

    fn begin_read(&self) -> StorageResult<()> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("read rejected".into()));
        }
        Ok(())
    }

    fn begin_write(&self) -> StorageResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("write rejected".into()));
        }
        Ok(())
    }

    /// Filters and sorts a table; rows come back unhydrated.
    fn scan<'a>(
        tables: &'a Tables,
        entity_type: &str,
        options: &FindOptions,
    ) -> StorageResult<Vec<&'a Row>> {
        let table = table(tables, entity_type)?;
        let mut rows: Vec<&Row> = table.values().filter(|r| options.matches(r)).collect();
        if !options.order_by.is_empty() {
            rows.sort_by(|a, b| options.compare(a, b));
        }
        Ok(rows)
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn find_by_id(
        &self,
        entity_type: &str,
        id: &EntityKey,
        relations: &RelationPaths,
    ) -> StorageResult<Option<Value>> {
        self.begin_read()?;
        let tables = self.tables.read().await;
        let tree = RelationTree::from_paths(relations);
        table(&tables, entity_type)?
            .get(id)
            .map(|row| hydrate(&self.schemas, &tables, entity_type, row, &tree))
            .transpose()
    }

    async fn find_by_ids(
        &self,
        entity_type: &str,
        ids: &[EntityKey],
        relations: &RelationPaths,
    ) -> StorageResult<Vec<Value>> {
        self.begin_read()?;
        let tables = self.tables.read().await;
        let table = table(&tables, entity_type)?;
        let tree = RelationTree::from_paths(relations);
        let mut seen = HashSet::new();
        ids.iter()
            .filter(|id| seen.insert(*id))
            .filter_map(|id| table.get(id))
            .map(|row| hydrate(&self.schemas, &tables, entity_type, row, &tree))
            .collect()
    }

    async fn find(
        &self,
        entity_type: &str,
        options: &FindOptions,
        relations: &RelationPaths,
    ) -> StorageResult<Vec<Value>> {
        self.begin_read()?;
        let tables = self.tables.read().await;
        let tree = RelationTree::from_paths(relations);
        Self::scan(&tables, entity_type, options)?
            .into_iter()
            .map(|row| hydrate(&self.schemas, &tables, entity_type, row, &tree))
            .collect()
    }

    async fn find_page(
        &self,
        entity_type: &str,
        options: &FindOptions,
        pagination: Pagination,
        relations: &RelationPaths,
    ) -> StorageResult<Page<Value>> {
        self.begin_read()?;
        let tables = self.tables.read().await;
        let tree = RelationTree::from_paths(relations);
        let rows = Self::scan(&tables, entity_type, options)?;
        let total = rows.len() as u64;
        let items = rows
            .into_iter()
            .skip(pagination.offset())
            .take(pagination.limit as usize)
            .map(|row| hydrate(&self.schemas, &tables, entity_type, row, &tree))
            .collect::<StorageResult<Vec<_>>>()?;
        Ok(Page {
            items,
            total,
            page: pagination.page.max(1),
            limit: pagination.limit,
        })
    }

    async fn save(&self, entity_type: &str, rows: Vec<Value>) -> StorageResult<()> {
        self.begin_write()?;
        let mut tables = self.tables.write().await;
        merge_rows(&self.schemas, &mut tables, entity_type, rows)
    }

    async fn delete(&self, entity_type: &str, ids: &[EntityKey]) -> StorageResult<u64> {
        self.begin_write()?;
        let mut tables = self.tables.write().await;
        let table = tables
            .get_mut(entity_type)
            .ok_or_else(|| StorageError::UnknownEntityType(entity_type.to_string()))?;
        let removed = ids.iter().filter(|id| table.remove(*id).is_some()).count() as u64;
        debug!("Deleted {} of {} {} rows", removed, ids.len(), entity_type);
        Ok(removed)
    }
}

fn table<'a>(tables: &'a Tables, entity_type: &str) -> StorageResult<&'a Table> {
    tables
        .get(entity_type)
        .ok_or_else(|| StorageError::UnknownEntityType(entity_type.to_string()))
}

/// Upserts rows, merging fields into existing rows. Keys that name relations
/// are not columns and are dropped.
fn merge_rows(
    schemas: &SchemaRegistry,
    tables: &mut Tables,
    entity_type: &str,
    rows: Vec<Value>,
) -> StorageResult<()> {
    let schema = schemas
        .get(entity_type)
        .ok_or_else(|| StorageError::UnknownEntityType(entity_type.to_string()))?;
    let table = tables.entry(entity_type.to_string()).or_default();

    for row in rows {
        let Value::Object(mut fields) = row else {
            return Err(StorageError::InvalidData(format!(
                "{entity_type} row must be an object"
            )));
        };
        let key = fields
            .get(ID_FIELD)
            .and_then(EntityKey::from_value)
            .ok_or_else(|| StorageError::InvalidData(format!("{entity_type} row has no id")))?;
        fields.retain(|name, _| schema.relation(name).is_none());

        match table.entry(key) {
            Entry::Occupied(mut existing) => existing.get_mut().extend(fields),
            Entry::Vacant(slot) => {
                slot.insert(fields);
            }
        }
    }
    Ok(())
}

/// Copies `row` and attaches every relation named in `tree`, recursively.
fn hydrate(
    schemas: &SchemaRegistry,
    tables: &Tables,
    entity_type: &str,
    row: &Row,
    tree: &RelationTree,
) -> StorageResult<Value> {
    let mut out = row.clone();
    if tree.is_empty() {
        return Ok(Value::Object(out));
    }
    let schema = schemas
        .get(entity_type)
        .ok_or_else(|| StorageError::UnknownEntityType(entity_type.to_string()))?;
    let own_key = row.get(ID_FIELD).and_then(EntityKey::from_value);

    for (name, subtree) in tree.children() {
        let relation = schema
            .relation(name)
            .ok_or_else(|| StorageError::UnknownRelation {
                entity_type: entity_type.to_string(),
                relation: name.to_string(),
            })?;
        let target = table(tables, &relation.target)?;
        let load = |r: &Row| hydrate(schemas, tables, &relation.target, r, subtree);
        let points_here = |fk: &str, r: &Row| {
            own_key.is_some() && r.get(fk).and_then(EntityKey::from_value) == own_key
        };

        let value = match &relation.kind {
            RelationKind::BelongsTo { foreign_key } => row
                .get(foreign_key)
                .and_then(EntityKey::from_value)
                .and_then(|k| target.get(&k))
                .map(load)
                .transpose()?
                .unwrap_or(Value::Null),
            RelationKind::HasMany { foreign_key } => Value::Array(
                target
                    .values()
                    .filter(|r| points_here(foreign_key, *r))
                    .map(load)
                    .collect::<StorageResult<Vec<_>>>()?,
            ),
            RelationKind::HasOne { foreign_key } => target
                .values()
                .find(|r| points_here(foreign_key, *r))
                .map(load)
                .transpose()?
                .unwrap_or(Value::Null),
        };
        out.insert(name.to_string(), value);
    }
    Ok(Value::Object(out))
}
