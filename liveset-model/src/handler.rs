use serde_json::Value;

/// Optional per-entity-type hooks for repositories that need validation or
/// post-load processing beyond plain CRUD.
///
/// Most entity types do NOT need this: a repository without hooks reads and
/// writes rows as they are.
pub trait EntityHooks: Send + Sync {
    /// Validate a row before it is written.
    /// Return `Err(message)` to reject the write.
    fn validate(&self, row: &Value) -> Result<(), String> {
        let _ = row;
        Ok(())
    }

    /// Called after a row is loaded, before it is projected.
    /// Use this for computing derived fields.
    fn on_after_load(&self, row: &mut Value) {
        let _ = row;
    }
}
