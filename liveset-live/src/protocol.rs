//! Frames pushed to subscribers.
//!
//! Every push is tagged with the channel it belongs to and the subscription
//! that produced it, so a client that re-subscribed on a channel can tell
//! late frames of the old subscription apart.

use crate::LiveError;
use liveset_types::{ChannelId, SubscriptionId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A frame pushed to one connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushFrame {
    pub channel: ChannelId,
    pub subscription: SubscriptionId,
    pub payload: PushPayload,
}

impl PushFrame {
    pub fn snapshot(channel: ChannelId, subscription: SubscriptionId, data: Value) -> Self {
        Self {
            channel,
            subscription,
            payload: PushPayload::Snapshot(data),
        }
    }

    pub fn error(channel: ChannelId, subscription: SubscriptionId, error: ErrorMessage) -> Self {
        Self {
            channel,
            subscription,
            payload: PushPayload::Error(error),
        }
    }

    /// The pushed data, if this is not an error frame.
    pub fn data(&self) -> Option<&Value> {
        match &self.payload {
            PushPayload::Snapshot(data) => Some(data),
            PushPayload::Error(_) => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.payload, PushPayload::Error(_))
    }
}

/// What a push carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum PushPayload {
    /// The freshly recomputed, projected result.
    Snapshot(Value),
    /// The recompute failed; the subscription stays active.
    Error(ErrorMessage),
}

/// Error report sent in place of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    /// HTTP-style status code.
    pub code: u16,
    /// Human-readable message.
    pub message: String,
}

impl ErrorMessage {
    /// Creates a new error message.
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<&LiveError> for ErrorMessage {
    fn from(error: &LiveError) -> Self {
        Self::new(error.code(), error.to_string())
    }
}
