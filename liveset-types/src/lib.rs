//! Core identifier types for liveset.
//!
//! This crate defines the small, store-agnostic types shared by every layer:
//! - [`EntityKey`], the primary key of any entity (string or integer)
//! - [`ConnectionId`], the handle of one bidirectional client connection (UUID v7)
//! - [`ChannelId`], a named live-query slot on a connection
//! - [`SubscriptionId`], the registry-assigned generation of a subscription

mod ids;
mod key;

pub use ids::{ChannelId, ConnectionId, SubscriptionId};
pub use key::EntityKey;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("invalid entity key: {0}")]
    InvalidKey(String),
}
