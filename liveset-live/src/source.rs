use crate::LiveResult;
use crate::subscription::LiveQuery;
use async_trait::async_trait;
use serde_json::Value;

/// The read side of a repository, as the registry needs it.
///
/// Implemented by whatever serves one entity type; the registry matches
/// subscriptions against `entity_type()` and calls `recompute` to refresh them.
#[async_trait]
pub trait LiveSource: Send + Sync {
    /// Entity type this source serves.
    fn entity_type(&self) -> &str;

    /// Runs the query and returns the projected result to push.
    async fn recompute(&self, query: &LiveQuery) -> LiveResult<Value>;
}
