//! Relation path extraction.
//!
//! A spec's nested keys name relations that must be loaded before projection.
//! Each relation is reported as a dotted path from the root entity, so
//! `{author: {profile: true}}` needs `author` and `author.profile`.

use crate::{QuerySpec, Selection};
use std::collections::BTreeMap;
use std::collections::BTreeSet;

/// Deduplicated set of dotted relation paths.
pub type RelationPaths = BTreeSet<String>;

/// Collects every relation path reachable through nested keys of `spec`.
///
/// Scalar selections contribute nothing. Pagination never appears here since
/// it is not stored as a selection. An empty spec yields an empty set.
pub fn extract_relation_paths(spec: &QuerySpec) -> RelationPaths {
    let mut paths = RelationPaths::new();
    collect(spec, None, &mut paths);
    paths
}

fn collect(spec: &QuerySpec, prefix: Option<&str>, out: &mut RelationPaths) {
    for (key, selection) in spec.iter() {
        let Selection::Nested(nested) = selection else {
            continue;
        };
        let path = match prefix {
            Some(prefix) => format!("{prefix}.{key}"),
            None => key.to_string(),
        };
        collect(nested, Some(&path), out);
        out.insert(path);
    }
}

/// Relation paths folded back into a tree, the form a store walks while
/// hydrating rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationTree {
    children: BTreeMap<String, RelationTree>,
}

impl RelationTree {
    pub fn from_paths<'a, I>(paths: I) -> Self
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut root = Self::default();
        for path in paths {
            let mut node = &mut root;
            for segment in path.split('.').filter(|s| !s.is_empty()) {
                node = node.children.entry(segment.to_string()).or_default();
            }
        }
        root
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, &RelationTree)> {
        self.children.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}
