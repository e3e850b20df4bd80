//! Repository façade for liveset.
//!
//! [`Repository`] serves one entity type on top of an
//! [`EntityStore`](liveset_storage::EntityStore): reads are shaped by a
//! [`QuerySpec`](liveset_model::QuerySpec), writes notify the shared
//! [`SubscriptionRegistry`](liveset_live::SubscriptionRegistry) so live
//! subscribers receive the new state.
//!
//! # Read path
//!
//! spec → validate against the schema → extract relation paths → store fetch
//! → entity hooks → project
//!
//! # Write path
//!
//! entity hooks → store save/delete → invalidation trigger → re-read
//!
//! The trigger runs before the re-read, so a subscriber is never pushed a
//! value older than the one the writer gets back.

mod error;
mod live;
mod repository;
mod result;

pub use error::{RepoError, RepoResult};
pub use repository::{Repository, RepositoryConfig};
pub use result::QueryResult;
