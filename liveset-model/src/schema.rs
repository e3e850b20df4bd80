use crate::{Entity, ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Name of the primary key field every entity carries.
pub(crate) const ID_FIELD: &str = "id";

/// Describes an entity type's scalar fields and the relations it can load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySchema {
    pub entity_type: String,
    pub fields: Vec<FieldDef>,
    pub relations: Vec<RelationDef>,
}

impl EntitySchema {
    /// Starts a schema with only the `id` field.
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            fields: vec![FieldDef::new(ID_FIELD, FieldType::Id)],
            relations: Vec::new(),
        }
    }

    /// Adds a scalar field of any type.
    pub fn field(mut self, name: &str, field_type: FieldType) -> Self {
        self.fields.push(FieldDef::new(name, field_type));
        self
    }

    /// Shorthand for a text field.
    pub fn text(self, name: &str) -> Self {
        self.field(name, FieldType::Text)
    }

    /// Shorthand for a numeric field.
    pub fn number(self, name: &str) -> Self {
        self.field(name, FieldType::Number)
    }

    /// Shorthand for a boolean field.
    pub fn bool(self, name: &str) -> Self {
        self.field(name, FieldType::Bool)
    }

    /// Shorthand for a DateTime field.
    pub fn datetime(self, name: &str) -> Self {
        self.field(name, FieldType::DateTime)
    }

    /// Shorthand for an opaque JSON field. Selected as a whole; never walked.
    pub fn json(self, name: &str) -> Self {
        self.field(name, FieldType::Json)
    }

    /// This entity holds `foreign_key` pointing at one `target` row.
    pub fn belongs_to(mut self, name: &str, target: &str, foreign_key: &str) -> Self {
        self.relations.push(RelationDef {
            name: name.into(),
            target: target.into(),
            kind: RelationKind::BelongsTo {
                foreign_key: foreign_key.into(),
            },
        });
        self
    }

    /// Every `target` row whose `foreign_key` equals this entity's id.
    pub fn has_many(mut self, name: &str, target: &str, foreign_key: &str) -> Self {
        self.relations.push(RelationDef {
            name: name.into(),
            target: target.into(),
            kind: RelationKind::HasMany {
                foreign_key: foreign_key.into(),
            },
        });
        self
    }

    /// The first `target` row whose `foreign_key` equals this entity's id.
    pub fn has_one(mut self, name: &str, target: &str, foreign_key: &str) -> Self {
        self.relations.push(RelationDef {
            name: name.into(),
            target: target.into(),
            kind: RelationKind::HasOne {
                foreign_key: foreign_key.into(),
            },
        });
        self
    }

    pub fn field_def(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn relation(&self, name: &str) -> Option<&RelationDef> {
        self.relations.iter().find(|r| r.name == name)
    }

    /// Whether `name` is a field or a relation of this entity type.
    pub fn has_key(&self, name: &str) -> bool {
        self.field_def(name).is_some() || self.relation(name).is_some()
    }
}

/// A scalar column of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub field_type: FieldType,
}

impl FieldDef {
    pub fn new(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

/// The data type of a scalar field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Id,
    Text,
    Number,
    Bool,
    DateTime,
    Json,
}

/// A named link from one entity type to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDef {
    pub name: String,
    /// Entity type on the other end of the relation.
    pub target: String,
    pub kind: RelationKind,
}

/// How a relation's rows are located.
///
/// The foreign key is a plain scalar field: on this entity for `BelongsTo`,
/// on the target entity for `HasMany`/`HasOne`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RelationKind {
    BelongsTo { foreign_key: String },
    HasMany { foreign_key: String },
    HasOne { foreign_key: String },
}

impl RelationKind {
    pub fn foreign_key(&self) -> &str {
        match self {
            Self::BelongsTo { foreign_key }
            | Self::HasMany { foreign_key }
            | Self::HasOne { foreign_key } => foreign_key,
        }
    }

    /// Whether the relation loads a sequence rather than a single optional row.
    pub fn is_collection(&self) -> bool {
        matches!(self, Self::HasMany { .. })
    }
}

/// All schemas known to a process, keyed by entity type.
///
/// Relations refer to each other by entity type name, so the schema graph may
/// contain cycles (`user.posts.author`); query specs stay finite trees.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, EntitySchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a schema.
    pub fn register(&mut self, schema: EntitySchema) -> &mut Self {
        self.schemas.insert(schema.entity_type.clone(), schema);
        self
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, schema: EntitySchema) -> Self {
        self.register(schema);
        self
    }

    /// Registers the schema declared by a typed entity.
    pub fn with_entity<E: Entity>(self) -> Self {
        self.with(E::schema())
    }

    pub fn get(&self, entity_type: &str) -> Option<&EntitySchema> {
        self.schemas.get(entity_type)
    }

    /// Like [`get`](Self::get) but fails with `UnknownEntityType`.
    pub fn require(&self, entity_type: &str) -> ModelResult<&EntitySchema> {
        self.get(entity_type)
            .ok_or_else(|| ModelError::UnknownEntityType(entity_type.to_string()))
    }

    pub fn contains(&self, entity_type: &str) -> bool {
        self.schemas.contains_key(entity_type)
    }

    pub fn entity_types(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }
}
