//! Query model for liveset.
//!
//! Defines the types every other liveset crate builds on:
//! - [`EntitySchema`] / [`SchemaRegistry`]: the scalar fields and relations of each entity type
//! - [`QuerySpec`]: a recursive "which fields and relations do I want" tree, with optional pagination
//! - [`extract_relation_paths`]: the dotted relation paths a spec needs the store to load
//! - [`project`]: trims a loaded entity graph down to exactly the shape a spec names
//! - [`Entity`]: the trait a typed record implements to be served by a repository
//! - [`EntityHooks`]: optional validation and post-load processing
//!
//! Specs are validated once against the schema registry ([`validate_spec`]) before
//! any store access; extraction and projection then trust their input.

mod entity;
mod error;
mod handler;
mod page;
mod projection;
mod relations;
mod schema;
mod spec;
mod validate;

pub use entity::Entity;
pub use error::{ModelError, ModelResult};
pub use handler::EntityHooks;
pub use page::Page;
pub use projection::{project, project_many, project_page};
pub use relations::{extract_relation_paths, RelationPaths, RelationTree};
pub use schema::{EntitySchema, FieldDef, FieldType, RelationDef, RelationKind, SchemaRegistry};
pub use spec::{Pagination, QuerySpec, Selection, DEFAULT_PAGE_LIMIT, LIMIT_KEY, PAGE_KEY};
pub use validate::{validate_spec, ValidationMode};
