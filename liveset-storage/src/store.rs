use crate::{FindOptions, StorageResult};
use async_trait::async_trait;
use liveset_model::{Page, Pagination, RelationPaths};
use liveset_types::EntityKey;
use serde_json::Value;

/// A backing store of entity rows.
///
/// Rows are JSON objects carrying an `id`. Every read takes the set of dotted
/// relation paths to load eagerly; a loaded relation appears on the row under
/// its name as a row, `null`, or a list of rows.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Loads one row, or `None` when no row has this id.
    async fn find_by_id(
        &self,
        entity_type: &str,
        id: &EntityKey,
        relations: &RelationPaths,
    ) -> StorageResult<Option<Value>>;

    /// Loads the rows for `ids` in the order given. Missing ids are skipped.
    async fn find_by_ids(
        &self,
        entity_type: &str,
        ids: &[EntityKey],
        relations: &RelationPaths,
    ) -> StorageResult<Vec<Value>>;

    /// Loads every row matching `options`.
    async fn find(
        &self,
        entity_type: &str,
        options: &FindOptions,
        relations: &RelationPaths,
    ) -> StorageResult<Vec<Value>>;

    /// Loads one page of the rows matching `options`, with the total count.
    async fn find_page(
        &self,
        entity_type: &str,
        options: &FindOptions,
        pagination: Pagination,
        relations: &RelationPaths,
    ) -> StorageResult<Page<Value>>;

    /// Inserts rows that do not exist yet and merges the given fields into
    /// rows that do. Fields a row does not mention keep their stored value.
    ///
    /// A batch is not atomic unless the backend says so.
    async fn save(&self, entity_type: &str, rows: Vec<Value>) -> StorageResult<()>;

    /// Deletes rows by id and returns how many existed.
    async fn delete(&self, entity_type: &str, ids: &[EntityKey]) -> StorageResult<u64>;
}
