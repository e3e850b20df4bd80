use serde::{Deserialize, Serialize};

/// One page of a paginated result with its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Rows matching the query across all pages.
    pub total: u64,
    /// 1-based page number.
    pub page: u32,
    pub limit: u32,
}

impl<T> Page<T> {
    /// Number of pages needed to hold `total` rows. Zero when `limit` is zero.
    pub fn page_count(&self) -> u64 {
        if self.limit == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.limit))
    }

    /// Replaces the items, keeping the metadata.
    pub fn map<U>(self, f: impl FnOnce(Vec<T>) -> Vec<U>) -> Page<U> {
        Page {
            items: f(self.items),
            total: self.total,
            page: self.page,
            limit: self.limit,
        }
    }
}
