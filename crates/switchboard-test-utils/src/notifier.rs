// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification adapters that record or reject publishes.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use switchboard_core::types::{AdapterType, ChannelKey, EventType, HealthStatus, Notification};
use switchboard_core::{NotificationAdapter, PluginAdapter, SwitchboardError};

/// Captures every publish for later assertion.
///
/// Publishes arrive from the dispatcher's background worker, so tests should go through
/// [`wait_for`](Self::wait_for) rather than reading immediately.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    published: Arc<Mutex<Vec<(ChannelKey, Notification)>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything published so far, in publish order.
    pub async fn published(&self) -> Vec<(ChannelKey, Notification)> {
        self.published.lock().await.clone()
    }

    /// Notifications published on one channel.
    pub async fn on_channel(&self, channel: &ChannelKey) -> Vec<Notification> {
        self.published
            .lock()
            .await
            .iter()
            .filter(|(c, _)| c == channel)
            .map(|(_, n)| n.clone())
            .collect()
    }

    /// Notifications of one event type, with their channels.
    pub async fn of_type(&self, event_type: EventType) -> Vec<(ChannelKey, Notification)> {
        self.published
            .lock()
            .await
            .iter()
            .filter(|(_, n)| n.event_type == event_type)
            .cloned()
            .collect()
    }

    pub async fn clear(&self) {
        self.published.lock().await.clear();
    }

    /// Wait up to two seconds for at least `count` publishes.
    pub async fn wait_for(&self, count: usize) -> Vec<(ChannelKey, Notification)> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            let published = self.published().await;
            if published.len() >= count || tokio::time::Instant::now() >= deadline {
                return published;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Give the dispatch worker a chance to run, then return what arrived.
    pub async fn settle(&self) -> Vec<(ChannelKey, Notification)> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.published().await
    }
}

#[async_trait]
impl PluginAdapter for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
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
        Ok(())
    }
}

#[async_trait]
impl NotificationAdapter for RecordingNotifier {
    async fn publish(
        &self,
        channel: &ChannelKey,
        notification: &Notification,
    ) -> Result<(), SwitchboardError> {
        self.published
            .lock()
            .await
            .push((channel.clone(), notification.clone()));
        Ok(())
    }
}

/// Rejects every publish and counts the attempts.
#[derive(Clone, Default)]
pub struct FailingNotifier {
    attempts: Arc<AtomicUsize>,
}

impl FailingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PluginAdapter for FailingNotifier {
    fn name(&self) -> &str {
        "failing"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Notification
    }

    async fn health_check(&self) -> Result<HealthStatus, SwitchboardError> {
        Ok(HealthStatus::Unhealthy("always fails".to_string()))
    }

    async fn shutdown(&self) -> Result<(), SwitchboardError> {
        Ok(())
    }
}

#[async_trait]
impl NotificationAdapter for FailingNotifier {
    async fn publish(
        &self,
        channel: &ChannelKey,
        _notification: &Notification,
    ) -> Result<(), SwitchboardError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(SwitchboardError::Notification {
            channel: channel.to_string(),
            message: "injected publish failure".to_string(),
        })
    }
}
