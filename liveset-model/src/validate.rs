//! Spec validation against the schema registry.

use crate::{ModelError, ModelResult, QuerySpec, SchemaRegistry, Selection};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How unknown spec keys are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    /// Fail on the first key the schema does not know.
    Strict,
    /// Drop unknown keys and carry on.
    Trusted,
}

impl Default for ValidationMode {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Strict
        } else {
            Self::Trusted
        }
    }
}

/// Checks every key of `spec` against the schema of `entity_type`, following
/// nested keys into their relation targets.
///
/// Returns the spec to execute: the input's selection in `Strict` mode, with
/// unknown keys pruned in `Trusted` mode. A relation selected with `true`
/// comes back as an empty nested spec so it is fetched and kept as loaded;
/// a scalar field may not carry a nested spec.
pub fn validate_spec(
    registry: &SchemaRegistry,
    entity_type: &str,
    spec: &QuerySpec,
    mode: ValidationMode,
) -> ModelResult<QuerySpec> {
    let mut checked = walk(registry, entity_type, spec, "", mode, entity_type)?;
    if let Some(p) = spec.pagination() {
        checked = checked.paginate(p.page, p.limit);
    }
    Ok(checked)
}

fn walk(
    registry: &SchemaRegistry,
    entity_type: &str,
    spec: &QuerySpec,
    prefix: &str,
    mode: ValidationMode,
    root_type: &str,
) -> ModelResult<QuerySpec> {
    let schema = registry.require(entity_type)?;
    let mut checked = QuerySpec::new();

    for (key, selection) in spec.iter() {
        let path = if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{prefix}.{key}")
        };

        let accepted = match selection {
            // A relation selected with `true` is loaded whole.
            Selection::Field if schema.relation(key).is_some() => {
                Some(Selection::Nested(QuerySpec::new()))
            }
            Selection::Field => schema.field_def(key).map(|_| Selection::Field),
            Selection::Nested(nested) => match schema.relation(key) {
                Some(relation) => Some(Selection::Nested(walk(
                    registry,
                    &relation.target,
                    nested,
                    &path,
                    mode,
                    root_type,
                )?)),
                None => None,
            },
        };

        match (accepted, mode) {
            (Some(selection), _) => checked.insert(key.to_string(), selection),
            (None, ValidationMode::Strict) => {
                return Err(ModelError::SchemaMismatch {
                    entity_type: root_type.to_string(),
                    path,
                });
            }
            (None, ValidationMode::Trusted) => {
                debug!("Dropping unknown spec key {} on {}", path, root_type);
            }
        }
    }

    Ok(checked)
}
