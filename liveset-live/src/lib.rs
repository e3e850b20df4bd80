//! Live queries for liveset.
//!
//! A client connection opens named channels; each channel holds at most one
//! live query. Whenever a repository writes, it hands the affected ids to the
//! [`SubscriptionRegistry`], which recomputes every matching subscription and
//! pushes the fresh result down that subscription's connection.
//!
//! # Architecture
//!
//! ## Components
//!
//! - **Subscription**: identity filter + stored query, enough to rebuild the
//!   read that feeds the channel
//! - **LiveSource**: the read side of a repository, asked to recompute queries
//! - **Registry**: connection → channel → subscription map behind one lock
//! - **Transport**: [`PushSink`] abstracts the socket a connection pushes into
//!
//! ## Invalidation
//!
//! 1. **Match**: under a read lock, collect subscriptions whose filter
//!    intersects the affected ids (or that match everything)
//! 2. **Recompute**: outside the lock, run every recompute concurrently
//! 3. **Deliver**: re-check each subscription is still the one registered on
//!    its channel, then push; stale results are discarded
//!
//! # Example
//!
//! ```
//! use liveset_live::{LiveConfig, SubscriptionRegistry};
//!
//! let registry = SubscriptionRegistry::new(LiveConfig::default());
//! ```

mod error;
pub mod protocol;
mod registry;
mod source;
pub mod subscription;
pub mod transport;

pub use error::{LiveError, LiveResult};
pub use protocol::{ErrorMessage, PushFrame, PushPayload};
pub use registry::{LiveConfig, OrderingPolicy, SubscriptionRegistry, TriggerReport};
pub use source::LiveSource;
pub use subscription::{IdentityFilter, LiveQuery, Subscription};
pub use transport::{ConnectionHandle, PushSink};
