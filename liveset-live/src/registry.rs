//! Subscription registry and invalidation fan-out.
//!
//! The registry owns every live subscription, keyed by connection and then by
//! channel. All structural changes and every push happen under one write
//! lock, so once `unsubscribe` or `on_disconnect` returns no further frame
//! reaches the removed subscription. Recomputes run outside the lock.

use crate::protocol::{ErrorMessage, PushFrame};
use crate::source::LiveSource;
use crate::subscription::{LiveQuery, Subscription};
use crate::transport::{ConnectionHandle, PushSink};
use crate::{LiveError, LiveResult};
use futures::future::join_all;
use liveset_types::{ChannelId, ConnectionId, EntityKey, SubscriptionId};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// How pushes for one subscription are ordered when triggers overlap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderingPolicy {
    /// Pushes go out in whatever order their recomputes finish.
    #[default]
    CompletionOrder,
    /// Recompute and push for one subscription run one at a time, in the
    /// order the triggers arrived.
    Serialized,
}

/// Configuration for the subscription registry.
#[derive(Debug, Clone)]
pub struct LiveConfig {
    /// Ordering of overlapping pushes on the same subscription.
    pub ordering: OrderingPolicy,
    /// Upper bound for one recompute (ms). Zero disables the bound.
    pub recompute_timeout_ms: u64,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            ordering: OrderingPolicy::default(),
            recompute_timeout_ms: 30_000,
        }
    }
}

/// What one trigger did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TriggerReport {
    /// Subscriptions whose identity filter matched the affected ids.
    pub matched: usize,
    /// Snapshots pushed.
    pub delivered: usize,
    /// Error frames pushed in place of a snapshot.
    pub failed: usize,
    /// Results dropped because the subscription was replaced, removed, or
    /// its connection closed while recomputing.
    pub discarded: usize,
}

struct Slot {
    subscription: Subscription,
    gate: Arc<Mutex<()>>,
}

struct ConnectionEntry {
    sink: Arc<dyn PushSink>,
    channels: HashMap<ChannelId, Slot>,
}

/// Everything a refresh needs, copied out of the registry so the lock is
/// not held while recomputing.
struct Target {
    connection: ConnectionId,
    channel: ChannelId,
    subscription: SubscriptionId,
    query: LiveQuery,
    gate: Arc<Mutex<()>>,
}

enum Outcome {
    Delivered,
    Failed,
    Discarded,
    Closed,
}

/// Tracks live subscriptions per connection and channel.
pub struct SubscriptionRegistry {
    config: LiveConfig,
    connections: RwLock<HashMap<ConnectionId, ConnectionEntry>>,
    next_id: AtomicU64,
}

impl SubscriptionRegistry {
    pub fn new(config: LiveConfig) -> Self {
        Self {
            config,
            connections: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &LiveConfig {
        &self.config
    }

    /// Registers a connection before it subscribes to anything.
    pub async fn on_connect(&self, connection: &ConnectionHandle) {
        let mut connections = self.connections.write().await;
        connections
            .entry(connection.id())
            .or_insert_with(|| ConnectionEntry {
                sink: connection.sink(),
                channels: HashMap::new(),
            });
        debug!("Connection {} registered", connection.id());
    }

    /// Registers `query` on `channel`, replacing whatever the channel held,
    /// then recomputes once and pushes the initial result.
    ///
    /// A failing initial recompute is reported as an error frame and leaves
    /// the subscription active. Only a closed connection fails the call.
    pub async fn subscribe(
        &self,
        source: &dyn LiveSource,
        connection: &ConnectionHandle,
        channel: ChannelId,
        query: LiveQuery,
    ) -> LiveResult<SubscriptionId> {
        let id = SubscriptionId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let subscription = Subscription::new(
            id,
            connection.id(),
            channel.clone(),
            source.entity_type(),
            query.clone(),
        );
        let gate = Arc::new(Mutex::new(()));

        {
            let mut connections = self.connections.write().await;
            let entry = connections
                .entry(connection.id())
                .or_insert_with(|| ConnectionEntry {
                    sink: connection.sink(),
                    channels: HashMap::new(),
                });
            let replaced = entry
                .channels
                .insert(
                    channel.clone(),
                    Slot {
                        subscription,
                        gate: Arc::clone(&gate),
                    },
                )
                .is_some();
            debug!(
                "Subscribed {} on {}/{} ({}, replaced={})",
                id,
                connection.id(),
                channel,
                source.entity_type(),
                replaced
            );
        }

        let target = Target {
            connection: connection.id(),
            channel,
            subscription: id,
            query,
            gate,
        };
        match self.refresh(source, &target).await {
            Outcome::Closed => Err(LiveError::ChannelClosed),
            _ => Ok(id),
        }
    }

    /// Removes the subscription on `channel`. Returns whether one existed.
    pub async fn unsubscribe(&self, connection: ConnectionId, channel: &ChannelId) -> bool {
        let mut connections = self.connections.write().await;
        let removed = connections
            .get_mut(&connection)
            .and_then(|entry| entry.channels.remove(channel))
            .is_some();
        if removed {
            debug!("Unsubscribed {}/{}", connection, channel);
        }
        removed
    }

    /// Drops a connection and all its subscriptions. Returns how many
    /// subscriptions were removed.
    pub async fn on_disconnect(&self, connection: ConnectionId) -> usize {
        let mut connections = self.connections.write().await;
        let removed = connections
            .remove(&connection)
            .map_or(0, |entry| entry.channels.len());
        info!(
            "Connection {} disconnected, dropped {} subscriptions",
            connection, removed
        );
        removed
    }

    /// Recomputes and pushes every subscription of `source`'s entity type
    /// whose filter matches `affected`.
    ///
    /// Recomputes run concurrently; one failing does not stop the others.
    pub async fn trigger(&self, source: &dyn LiveSource, affected: &[EntityKey]) -> TriggerReport {
        let targets = self.matching(source.entity_type(), affected).await;
        let mut report = TriggerReport {
            matched: targets.len(),
            ..TriggerReport::default()
        };
        if targets.is_empty() {
            return report;
        }

        let outcomes = join_all(targets.iter().map(|t| self.refresh(source, t))).await;
        for outcome in outcomes {
            match outcome {
                Outcome::Delivered => report.delivered += 1,
                Outcome::Failed => report.failed += 1,
                Outcome::Discarded | Outcome::Closed => report.discarded += 1,
            }
        }
        debug!(
            "Trigger on {} ({} ids): {:?}",
            source.entity_type(),
            affected.len(),
            report
        );
        report
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn subscription_count(&self) -> usize {
        self.connections
            .read()
            .await
            .values()
            .map(|entry| entry.channels.len())
            .sum()
    }

    /// The subscription currently registered on `channel`.
    pub async fn subscription(
        &self,
        connection: ConnectionId,
        channel: &ChannelId,
    ) -> Option<Subscription> {
        self.connections
            .read()
            .await
            .get(&connection)?
            .channels
            .get(channel)
            .map(|slot| slot.subscription.clone())
    }

    /// All subscriptions of a connection, ordered by channel.
    pub async fn subscriptions_for(&self, connection: ConnectionId) -> Vec<Subscription> {
        let connections = self.connections.read().await;
        let mut subs: Vec<Subscription> = connections
            .get(&connection)
            .map(|entry| {
                entry
                    .channels
                    .values()
                    .map(|slot| slot.subscription.clone())
                    .collect()
            })
            .unwrap_or_default();
        subs.sort_by(|a, b| a.channel.cmp(&b.channel));
        subs
    }

    /// Drops every connection and subscription.
    pub async fn clear(&self) {
        self.connections.write().await.clear();
    }

    async fn matching(&self, entity_type: &str, affected: &[EntityKey]) -> Vec<Target> {
        let connections = self.connections.read().await;
        connections
            .values()
            .flat_map(|entry| entry.channels.values())
            .filter(|slot| slot.subscription.is_affected_by(entity_type, affected))
            .map(|slot| Target {
                connection: slot.subscription.connection,
                channel: slot.subscription.channel.clone(),
                subscription: slot.subscription.id,
                query: slot.subscription.query.clone(),
                gate: Arc::clone(&slot.gate),
            })
            .collect()
    }

    async fn refresh(&self, source: &dyn LiveSource, target: &Target) -> Outcome {
        let _turn = match self.config.ordering {
            OrderingPolicy::Serialized => Some(target.gate.lock().await),
            OrderingPolicy::CompletionOrder => None,
        };
        let result = self.recompute(source, &target.query).await;
        self.deliver(target, result).await
    }

    async fn recompute(&self, source: &dyn LiveSource, query: &LiveQuery) -> LiveResult<Value> {
        let ms = self.config.recompute_timeout_ms;
        if ms == 0 {
            return source.recompute(query).await;
        }
        tokio::time::timeout(Duration::from_millis(ms), source.recompute(query))
            .await
            .unwrap_or_else(|_| {
                Err(LiveError::RecomputeFailure(format!(
                    "recompute timed out after {ms}ms"
                )))
            })
    }

    /// Pushes a recompute result if its subscription is still the one
    /// registered on the channel.
    async fn deliver(&self, target: &Target, result: LiveResult<Value>) -> Outcome {
        let mut connections = self.connections.write().await;
        let Some(entry) = connections.get_mut(&target.connection) else {
            return Outcome::Discarded;
        };
        let Some(slot) = entry
            .channels
            .get_mut(&target.channel)
            .filter(|slot| slot.subscription.id == target.subscription)
        else {
            debug!(
                "Discarding stale result for {} on {}",
                target.subscription, target.channel
            );
            return Outcome::Discarded;
        };

        let (frame, outcome) = match result {
            Ok(data) => (
                PushFrame::snapshot(target.channel.clone(), target.subscription, data),
                Outcome::Delivered,
            ),
            Err(e) => {
                warn!(
                    "Recompute failed for {} on {}: {}",
                    target.subscription, target.channel, e
                );
                (
                    PushFrame::error(
                        target.channel.clone(),
                        target.subscription,
                        ErrorMessage::from(&e),
                    ),
                    Outcome::Failed,
                )
            }
        };

        if entry.sink.push(frame).is_ok() {
            slot.subscription.pushes += 1;
            return outcome;
        }

        let dropped = connections
            .remove(&target.connection)
            .map_or(0, |entry| entry.channels.len());
        warn!(
            "Connection {} closed, dropped {} subscriptions",
            target.connection, dropped
        );
        Outcome::Closed
    }
}
