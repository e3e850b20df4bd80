use liveset_model::Page;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result of a projected query: the full list, or one page of it when the
/// spec asked for pagination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryResult {
    Page(Page<Value>),
    List(Vec<Value>),
}

impl QueryResult {
    /// The projected rows, whichever mode produced them.
    pub fn items(&self) -> &[Value] {
        match self {
            Self::Page(page) => &page.items,
            Self::List(items) => items,
        }
    }

    pub fn is_paginated(&self) -> bool {
        matches!(self, Self::Page(_))
    }

    /// Rows matching the query across all pages.
    pub fn total(&self) -> u64 {
        match self {
            Self::Page(page) => page.total,
            Self::List(items) => items.len() as u64,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Self::Page(page) => serde_json::json!({
                "items": page.items,
                "total": page.total,
                "page": page.page,
                "limit": page.limit,
            }),
            Self::List(items) => Value::Array(items),
        }
    }
}
