//! Result projection.
//!
//! The store returns rows with every scalar column and whichever relations
//! were requested. Projection trims that graph to exactly the keys a spec
//! names, recursing into relations whether they hold a row, `null`, or a list.

use crate::{Page, QuerySpec, Selection};
use serde_json::{Map, Value};

/// Projects a single value: an entity, a list of entities, or `null`.
///
/// An empty spec keeps the value as loaded. Keys named by the spec but
/// missing from the row are left out rather than invented.
pub fn project(spec: &QuerySpec, value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(project_many(spec, items)),
        Value::Object(row) => Value::Object(project_row(spec, row)),
        other => other.clone(),
    }
}

/// Projects each element independently, keeping input order.
pub fn project_many(spec: &QuerySpec, items: &[Value]) -> Vec<Value> {
    items.iter().map(|item| project(spec, item)).collect()
}

/// Projects the items of a page; pagination metadata passes through.
pub fn project_page(spec: &QuerySpec, page: Page<Value>) -> Page<Value> {
    page.map(|items| project_many(spec, &items))
}

fn project_row(spec: &QuerySpec, row: &Map<String, Value>) -> Map<String, Value> {
    if spec.is_empty() {
        return row.clone();
    }
    let mut out = Map::new();
    for (key, selection) in spec.iter() {
        let Some(value) = row.get(key) else {
            continue;
        };
        let projected = match selection {
            Selection::Field => value.clone(),
            Selection::Nested(nested) => project(nested, value),
        };
        out.insert(key.to_string(), projected);
    }
    out
}
