//! Storage boundary for liveset.
//!
//! The relational engine that actually holds rows is an external collaborator.
//! This crate defines what the repository needs from it and ships one
//! implementation that keeps everything in memory.
//!
//! # Architecture
//!
//! - [`EntityStore`] is the async trait a backing store implements: id lookups,
//!   filtered scans, paginated scans, merge-upserts and deletes, each loading
//!   the requested relation paths eagerly
//! - [`FindOptions`] carries filters and sort order; relations are never part of it
//! - [`MemoryStore`] resolves relations from the [`SchemaRegistry`](liveset_model::SchemaRegistry)
//!   and counts every call, which makes it the store spy in tests

mod error;
mod memory;
mod options;
mod store;

pub use error::{StorageError, StorageResult};
pub use memory::{MemoryStore, StoreStats};
pub use options::{compare_values, Filter, FilterOp, FindOptions, OrderBy, SortDirection};
pub use store::EntityStore;
