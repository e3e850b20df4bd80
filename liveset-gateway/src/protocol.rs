//! WebSocket message types.
//!
//! # JSON wire format
//!
//! ```json
//! {"type": "subscribe_one", "entity": "user", "channel": "me", "id": 1, "spec": {"name": true}}
//! {"type": "subscribe_many", "entity": "user", "channel": "team", "ids": [1, 2]}
//! {"type": "subscribe_query", "entity": "post", "channel": "feed", "spec": {"title": true, "limit": 10}}
//! {"type": "unsubscribe", "channel": "me"}
//! ```
//!
//! Server messages are pushes, acknowledgements, and errors. A subscribe is
//! acknowledged after its initial snapshot has been pushed.

use liveset_live::{LiveError, PushFrame, PushSink};
use liveset_model::QuerySpec;
use liveset_storage::FindOptions;
use liveset_types::{ChannelId, EntityKey, SubscriptionId};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::warn;

/// Client-to-server request messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Watch one entity by id.
    SubscribeOne {
        entity: String,
        channel: ChannelId,
        id: EntityKey,
        #[serde(default)]
        spec: QuerySpec,
    },

    /// Watch a fixed set of entities.
    SubscribeMany {
        entity: String,
        channel: ChannelId,
        ids: Vec<EntityKey>,
        #[serde(default)]
        spec: QuerySpec,
    },

    /// Watch a filtered, optionally paginated query.
    SubscribeQuery {
        entity: String,
        channel: ChannelId,
        #[serde(default)]
        spec: QuerySpec,
        #[serde(default)]
        options: FindOptions,
    },

    /// Stop watching a channel.
    Unsubscribe { channel: ChannelId },
}

/// Server-to-client messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A live query result or recompute error.
    Push(PushFrame),

    /// The subscription is registered and its initial snapshot was sent.
    Subscribed {
        channel: ChannelId,
        subscription: SubscriptionId,
    },

    Unsubscribed { channel: ChannelId, removed: bool },

    /// A request could not be served.
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        channel: Option<ChannelId>,
        code: u16,
        message: String,
    },
}

impl ServerMessage {
    pub fn error(channel: Option<ChannelId>, code: u16, message: impl Into<String>) -> Self {
        Self::Error {
            channel,
            code,
            message: message.into(),
        }
    }
}

/// Outbound messages a socket may have queued before it counts as stalled.
pub const SOCKET_QUEUE_CAPACITY: usize = 1000;

/// Push sink feeding a socket's bounded outbound queue.
///
/// A full queue means the client stopped reading; the push fails as if the
/// socket had closed, and the registry drops the connection.
pub struct SocketSink(pub mpsc::Sender<ServerMessage>);

impl PushSink for SocketSink {
    fn push(&self, frame: PushFrame) -> Result<(), LiveError> {
        self.0
            .try_send(ServerMessage::Push(frame))
            .map_err(|e| {
                if matches!(e, mpsc::error::TrySendError::Full(_)) {
                    warn!("Socket queue full, dropping connection");
                }
                LiveError::ChannelClosed
            })
    }
}
