// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Best-effort, non-blocking notification dispatch.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use switchboard_core::{ChannelKey, Notification, NotificationAdapter};

/// Upper bound on a single publish before it is abandoned.
const PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);

enum Job {
    Publish(ChannelKey, Notification),
    Flush(oneshot::Sender<()>),
}

/// Publishes notifications from a single background worker.
///
/// `dispatch` only enqueues, so the caller never awaits delivery. The worker
/// publishes in enqueue order, so two events on the same channel arrive in
/// the order they were dispatched regardless of transport latency. Failures
/// and timeouts are logged at `warn` and counted in
/// `switchboard_notifications_failed_total`; they are never retried and
/// never reach the caller.
#[derive(Clone)]
pub struct Dispatcher {
    adapter: Arc<dyn NotificationAdapter>,
    queue: Arc<OnceLock<mpsc::UnboundedSender<Job>>>,
}

impl Dispatcher {
    pub fn new(adapter: Arc<dyn NotificationAdapter>) -> Self {
        Self {
            adapter,
            queue: Arc::new(OnceLock::new()),
        }
    }

    /// The worker is spawned on first use so construction needs no runtime.
    fn queue(&self) -> &mpsc::UnboundedSender<Job> {
        self.queue.get_or_init(|| {
            let (tx, rx) = mpsc::unbounded_channel();
            tokio::spawn(run_worker(Arc::clone(&self.adapter), rx));
            tx
        })
    }

    /// Enqueue a publish.
    pub fn dispatch(&self, channel: ChannelKey, notification: Notification) {
        if self.queue().send(Job::Publish(channel, notification)).is_err() {
            debug!("notification worker gone, event dropped");
        }
    }

    /// Enqueue one publish per channel for the same notification.
    pub fn dispatch_all(
        &self,
        channels: impl IntoIterator<Item = ChannelKey>,
        notification: Notification,
    ) {
        for channel in channels {
            self.dispatch(channel, notification.clone());
        }
    }

    /// Wait until everything dispatched before this call has been attempted.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.queue().send(Job::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}

async fn run_worker(adapter: Arc<dyn NotificationAdapter>, mut rx: mpsc::UnboundedReceiver<Job>) {
    while let Some(job) = rx.recv().await {
        match job {
            Job::Publish(channel, notification) => {
                publish_one(adapter.as_ref(), &channel, &notification).await;
            }
            Job::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

async fn publish_one(
    adapter: &dyn NotificationAdapter,
    channel: &ChannelKey,
    notification: &Notification,
) {
    let error = match tokio::time::timeout(PUBLISH_TIMEOUT, adapter.publish(channel, notification))
        .await
    {
        Ok(Ok(())) => return,
        Ok(Err(e)) => e.to_string(),
        Err(_) => format!("timed out after {}s", PUBLISH_TIMEOUT.as_secs()),
    };
    warn!(
        channel = %channel,
        event = %notification.event_type,
        error = %error,
        "notification publish failed"
    );
    #[cfg(feature = "prometheus")]
    switchboard_prometheus::record_notification_failure(&notification.event_type.to_string());
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("adapter", &self.adapter.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::Utc;
    use switchboard_core::{
        AdapterType, EventType, HealthStatus, PluginAdapter, SwitchboardError,
    };

    use crate::BroadcastNotifier;

    struct Broken;

    #[async_trait]
    impl PluginAdapter for Broken {
        fn name(&self) -> &str {
            "broken"
        }
        fn version(&self) -> semver::Version {
            semver::Version::new(0, 0, 0)
        }
        fn adapter_type(&self) -> AdapterType {
            AdapterType::Notification
        }
        async fn health_check(&self) -> Result<HealthStatus, SwitchboardError> {
            Ok(HealthStatus::Unhealthy("down".to_string()))
        }
        async fn shutdown(&self) -> Result<(), SwitchboardError> {
            Ok(())
        }
    }

    #[async_trait]
    impl NotificationAdapter for Broken {
        async fn publish(
            &self,
            channel: &ChannelKey,
            _notification: &Notification,
        ) -> Result<(), SwitchboardError> {
            Err(SwitchboardError::Notification {
                channel: channel.to_string(),
                message: "transport down".to_string(),
            })
        }
    }

    fn event() -> Notification {
        Notification::new(EventType::QueueUpdated, serde_json::json!({"depth": 2}), Utc::now())
    }

    #[tokio::test]
    async fn dispatch_delivers_through_adapter() {
        let hub = Arc::new(BroadcastNotifier::new(8));
        let channel = ChannelKey::TenantQueue("t1".to_string());
        let mut rx = hub.subscribe(&channel);
        let dispatcher = Dispatcher::new(hub.clone());

        dispatcher.dispatch(channel, event());
        assert_eq!(rx.recv().await.unwrap().event_type, EventType::QueueUpdated);
    }

    #[tokio::test]
    async fn failures_are_swallowed() {
        let dispatcher = Dispatcher::new(Arc::new(Broken));
        dispatcher.dispatch_all(
            [
                ChannelKey::Conversation("c1".to_string()),
                ChannelKey::Agent("a1".to_string()),
            ],
            event(),
        );
        dispatcher.flush().await;
    }

    /// Records queue positions; the first publish is slow.
    struct Laggy {
        calls: AtomicUsize,
        delivered: Mutex<Vec<i64>>,
    }

    #[async_trait]
    impl PluginAdapter for Laggy {
        fn name(&self) -> &str {
            "laggy"
        }
        fn version(&self) -> semver::Version {
            semver::Version::new(0, 0, 0)
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
    impl NotificationAdapter for Laggy {
        async fn publish(
            &self,
            _channel: &ChannelKey,
            notification: &Notification,
        ) -> Result<(), SwitchboardError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            let position = notification.payload["position"].as_i64().unwrap_or(-1);
            self.delivered.lock().unwrap().push(position);
            Ok(())
        }
    }

    #[tokio::test]
    async fn slow_transport_keeps_dispatch_order() {
        let laggy = Arc::new(Laggy {
            calls: AtomicUsize::new(0),
            delivered: Mutex::new(Vec::new()),
        });
        let dispatcher = Dispatcher::new(laggy.clone());
        let channel = ChannelKey::Conversation("c2".to_string());
        let now = Utc::now();

        dispatcher.dispatch(
            channel.clone(),
            Notification::new(EventType::QueuePosition, serde_json::json!({"position": 2}), now),
        );
        dispatcher.dispatch(
            channel,
            Notification::new(EventType::QueuePosition, serde_json::json!({"position": 1}), now),
        );
        dispatcher.flush().await;

        assert_eq!(*laggy.delivered.lock().unwrap(), vec![2, 1]);
    }

    #[tokio::test]
    async fn clones_share_one_worker() {
        let laggy = Arc::new(Laggy {
            calls: AtomicUsize::new(0),
            delivered: Mutex::new(Vec::new()),
        });
        let first = Dispatcher::new(laggy.clone());
        let second = first.clone();
        let channel = ChannelKey::Conversation("c1".to_string());
        let now = Utc::now();

        first.dispatch(
            channel.clone(),
            Notification::new(EventType::QueuePosition, serde_json::json!({"position": 3}), now),
        );
        second.dispatch(
            channel,
            Notification::new(EventType::QueuePosition, serde_json::json!({"position": 2}), now),
        );
        second.flush().await;

        assert_eq!(*laggy.delivered.lock().unwrap(), vec![3, 2]);
    }
}
