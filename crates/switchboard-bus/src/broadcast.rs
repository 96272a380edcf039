// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process notification transport built on tokio broadcast channels.

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::trace;

use switchboard_core::{
    AdapterType, ChannelKey, HealthStatus, Notification, NotificationAdapter, PluginAdapter,
    SwitchboardError,
};

/// Fan-out hub with one lazily created broadcast channel per [`ChannelKey`].
///
/// Publishing to a channel nobody listens on is not an error: delivery is
/// best-effort and the event is simply dropped. Slow subscribers lag and
/// observe `RecvError::Lagged` once `capacity` events are buffered.
#[derive(Debug)]
pub struct BroadcastNotifier {
    channels: DashMap<String, broadcast::Sender<Notification>>,
    capacity: usize,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Subscribe to a channel, creating it if needed.
    pub fn subscribe(&self, channel: &ChannelKey) -> broadcast::Receiver<Notification> {
        self.channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Number of live subscribers on a channel.
    pub fn subscriber_count(&self, channel: &ChannelKey) -> usize {
        self.channels
            .get(&channel.to_string())
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    /// Drop channels whose subscribers have all gone away.
    pub fn prune(&self) -> usize {
        let before = self.channels.len();
        self.channels.retain(|_, tx| tx.receiver_count() > 0);
        before - self.channels.len()
    }
}

#[async_trait]
impl PluginAdapter for BroadcastNotifier {
    fn name(&self) -> &str {
        "broadcast"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Notification
    }

    async fn health_check(&self) -> Result<HealthStatus, SwitchboardError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SwitchboardError> {
        self.channels.clear();
        Ok(())
    }
}

#[async_trait]
impl NotificationAdapter for BroadcastNotifier {
    async fn publish(
        &self,
        channel: &ChannelKey,
        notification: &Notification,
    ) -> Result<(), SwitchboardError> {
        let key = channel.to_string();
        let Some(tx) = self.channels.get(&key).map(|tx| tx.clone()) else {
            trace!(channel = %key, "no subscribers, notification dropped");
            return Ok(());
        };
        if tx.send(notification.clone()).is_err() {
            trace!(channel = %key, "all subscribers gone, notification dropped");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use switchboard_core::EventType;

    fn event(kind: EventType) -> Notification {
        Notification::new(kind, serde_json::json!({"position": 1}), Utc::now())
    }

    #[tokio::test]
    async fn subscribers_receive_only_their_channel() {
        let hub = BroadcastNotifier::new(8);
        let conv = ChannelKey::Conversation("c1".to_string());
        let queue = ChannelKey::TenantQueue("t1".to_string());
        let mut conv_rx = hub.subscribe(&conv);
        let mut queue_rx = hub.subscribe(&queue);

        hub.publish(&conv, &event(EventType::QueuePosition)).await.unwrap();

        let got = conv_rx.recv().await.unwrap();
        assert_eq!(got.event_type, EventType::QueuePosition);
        assert!(queue_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_ok() {
        let hub = BroadcastNotifier::new(8);
        let channel = ChannelKey::Agent("a1".to_string());
        hub.publish(&channel, &event(EventType::AgentStatusChanged))
            .await
            .unwrap();
        assert_eq!(hub.subscriber_count(&channel), 0);
    }

    #[tokio::test]
    async fn prune_removes_abandoned_channels() {
        let hub = BroadcastNotifier::new(8);
        let kept = ChannelKey::TenantAgents("t1".to_string());
        let dropped = ChannelKey::Conversation("c9".to_string());
        let _rx = hub.subscribe(&kept);
        drop(hub.subscribe(&dropped));

        assert_eq!(hub.prune(), 1);
        assert_eq!(hub.subscriber_count(&kept), 1);
    }
}
