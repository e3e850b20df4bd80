//! Live query subscription records.
//!
//! A subscription stores the query it serves rather than a closure, so the
//! registry can show what every channel is watching and rebuild the read on
//! each invalidation.
//!
//! # Lifecycle
//!
//! 1. **Active**: created by a subscribe call, initial snapshot pushed
//! 2. **Replaced**: another subscribe on the same connection and channel
//!    discards it without a final push
//! 3. **Removed**: unsubscribe or disconnect; never resurrected

use liveset_model::QuerySpec;
use liveset_storage::FindOptions;
use liveset_types::{ChannelId, ConnectionId, EntityKey, SubscriptionId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The read a subscription re-runs on every invalidation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LiveQuery {
    /// One entity by id; fails with not-found once the row is gone.
    One { id: EntityKey, spec: QuerySpec },
    /// A fixed set of entities; missing ids drop out of the result.
    Many { ids: Vec<EntityKey>, spec: QuerySpec },
    /// An arbitrary filtered, optionally paginated query.
    Query {
        spec: QuerySpec,
        #[serde(default)]
        options: FindOptions,
    },
}

impl LiveQuery {
    /// Which invalidations this query reacts to.
    pub fn identity_filter(&self) -> IdentityFilter {
        match self {
            Self::One { id, .. } => IdentityFilter::One(id.clone()),
            Self::Many { ids, .. } => IdentityFilter::Many(ids.iter().cloned().collect()),
            Self::Query { .. } => IdentityFilter::Always,
        }
    }

    pub fn spec(&self) -> &QuerySpec {
        match self {
            Self::One { spec, .. } | Self::Many { spec, .. } | Self::Query { spec, .. } => spec,
        }
    }
}

/// Predicate deciding which triggers reach a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityFilter {
    One(EntityKey),
    Many(HashSet<EntityKey>),
    /// Matches every trigger regardless of the ids involved.
    Always,
}

impl IdentityFilter {
    pub fn matches(&self, affected: &[EntityKey]) -> bool {
        match self {
            Self::One(id) => affected.contains(id),
            Self::Many(ids) => affected.iter().any(|a| ids.contains(a)),
            Self::Always => true,
        }
    }
}

/// An active live query on one channel of one connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Subscription {
    /// Generation assigned by the registry; a replacement gets a new one
    pub id: SubscriptionId,

    pub connection: ConnectionId,

    pub channel: ChannelId,

    /// Entity type whose writes invalidate this subscription
    pub entity_type: String,

    pub query: LiveQuery,

    /// Derived from `query` when the subscription is created
    pub filter: IdentityFilter,

    /// Number of frames delivered, snapshots and error reports alike
    pub pushes: u64,

    /// Unix epoch milliseconds
    pub created_at: i64,
}

impl Subscription {
    pub fn new(
        id: SubscriptionId,
        connection: ConnectionId,
        channel: ChannelId,
        entity_type: impl Into<String>,
        query: LiveQuery,
    ) -> Self {
        Self {
            id,
            connection,
            channel,
            entity_type: entity_type.into(),
            filter: query.identity_filter(),
            query,
            pushes: 0,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Whether a trigger for `affected` ids of `entity_type` reaches this subscription.
    pub fn is_affected_by(&self, entity_type: &str, affected: &[EntityKey]) -> bool {
        self.entity_type == entity_type && self.filter.matches(affected)
    }
}
