//! Recursive selection trees.
//!
//! On the wire a spec is a JSON object whose values are either `true`
//! (select this scalar field) or a nested object (load this relation and
//! project it the same way):
//!
//! ```json
//! { "id": true, "title": true, "author": { "name": true }, "page": 2, "limit": 10 }
//! ```
//!
//! `page` and `limit` are only reserved at the top level; further down they
//! are ordinary field names.

use crate::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Reserved top-level key carrying the 1-based page number.
pub const PAGE_KEY: &str = "page";

/// Reserved top-level key carrying the page size.
pub const LIMIT_KEY: &str = "limit";

/// Page size used when a spec names a page but no limit.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;

/// What to do with one key of a spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Copy the field as-is.
    Field,
    /// Load the relation and project it with the nested spec.
    Nested(QuerySpec),
}

/// Page request attached to a top-level spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Pagination {
    /// Clamps `page` to at least 1.
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit,
        }
    }

    /// Number of rows to skip before this page.
    pub fn offset(&self) -> usize {
        (self.page.max(1) as usize - 1) * self.limit as usize
    }
}

/// A finite tree describing the projection a caller wants.
///
/// Keys are kept sorted so that equal specs compare and hash identically
/// regardless of the order the caller wrote them in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct QuerySpec {
    selections: BTreeMap<String, Selection>,
    pagination: Option<Pagination>,
}

impl QuerySpec {
    /// An empty spec: every default field, no relations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects a scalar field.
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.selections.insert(name.into(), Selection::Field);
        self
    }

    /// Selects several scalar fields.
    pub fn fields<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.selections.insert(name.into(), Selection::Field);
        }
        self
    }

    /// Selects a relation projected by `nested`. Pagination on `nested` is
    /// dropped: it only has meaning at the top level.
    pub fn relation(mut self, name: impl Into<String>, mut nested: QuerySpec) -> Self {
        nested.pagination = None;
        self.selections.insert(name.into(), Selection::Nested(nested));
        self
    }

    /// Requests one page of results.
    pub fn paginate(mut self, page: u32, limit: u32) -> Self {
        self.pagination = Some(Pagination::new(page, limit));
        self
    }

    /// Parses the JSON wire shape.
    pub fn from_json(value: Value) -> ModelResult<Self> {
        Self::try_from(value)
    }

    pub fn pagination(&self) -> Option<Pagination> {
        self.pagination
    }

    /// The same selection with pagination removed.
    pub fn without_pagination(&self) -> Self {
        Self {
            selections: self.selections.clone(),
            pagination: None,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Selection> {
        self.selections.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Selection)> {
        self.selections.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Names selected with `true`.
    pub fn scalar_fields(&self) -> impl Iterator<Item = &str> {
        self.iter()
            .filter(|(_, s)| matches!(s, Selection::Field))
            .map(|(k, _)| k)
    }

    /// Relations selected with a nested spec.
    pub fn relations(&self) -> impl Iterator<Item = (&str, &QuerySpec)> {
        self.iter().filter_map(|(k, s)| match s {
            Selection::Nested(nested) => Some((k, nested)),
            Selection::Field => None,
        })
    }

    /// True when no key is selected. Pagination does not count.
    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.selections.len()
    }

    pub(crate) fn insert(&mut self, name: String, selection: Selection) {
        self.selections.insert(name, selection);
    }

    fn parse_level(map: Map<String, Value>, path: &str, top_level: bool) -> ModelResult<Self> {
        let mut spec = Self::new();
        let mut page = None;
        let mut limit = None;

        for (key, value) in map {
            let key_path = if path.is_empty() {
                key.clone()
            } else {
                format!("{path}.{key}")
            };

            if top_level && (key == PAGE_KEY || key == LIMIT_KEY) {
                let n = value
                    .as_u64()
                    .and_then(|n| u32::try_from(n).ok())
                    .ok_or_else(|| {
                        ModelError::InvalidSpec(format!("`{key}` must be a non-negative integer"))
                    })?;
                if key == PAGE_KEY {
                    page = Some(n);
                } else {
                    limit = Some(n);
                }
                continue;
            }

            match value {
                Value::Bool(true) => {
                    spec.selections.insert(key, Selection::Field);
                }
                // An explicit `false` deselects.
                Value::Bool(false) => {}
                Value::Object(nested) => {
                    let nested = Self::parse_level(nested, &key_path, false)?;
                    spec.selections.insert(key, Selection::Nested(nested));
                }
                other => {
                    return Err(ModelError::InvalidSpec(format!(
                        "`{key_path}` must be true or an object, got {other}"
                    )));
                }
            }
        }

        if page.is_some() || limit.is_some() {
            spec.pagination = Some(Pagination::new(
                page.unwrap_or(1),
                limit.unwrap_or(DEFAULT_PAGE_LIMIT),
            ));
        }
        Ok(spec)
    }

    fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        for (key, selection) in &self.selections {
            let value = match selection {
                Selection::Field => Value::Bool(true),
                Selection::Nested(nested) => Value::Object(nested.to_map()),
            };
            map.insert(key.clone(), value);
        }
        if let Some(p) = self.pagination {
            map.insert(PAGE_KEY.into(), Value::from(p.page));
            map.insert(LIMIT_KEY.into(), Value::from(p.limit));
        }
        map
    }
}

impl TryFrom<Value> for QuerySpec {
    type Error = ModelError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Self::parse_level(map, "", true),
            // `null` stands for "no spec".
            Value::Null => Ok(Self::new()),
            other => Err(ModelError::InvalidSpec(format!(
                "spec must be an object, got {other}"
            ))),
        }
    }
}

impl From<QuerySpec> for Value {
    fn from(spec: QuerySpec) -> Self {
        Value::Object(spec.to_map())
    }
}
