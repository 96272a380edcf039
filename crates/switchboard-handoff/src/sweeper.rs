// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic presence and abandonment sweeps.
//!
//! There is no leader: every process instance may run a [`Sweeper`] and the
//! sweeps stay correct because each row write is conditional.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use switchboard_config::model::SwitchboardConfig;

use crate::service::HandoffService;

/// Drives [`HandoffService::sweep_agents`] and
/// [`HandoffService::sweep_abandoned_conversations`] on fixed intervals.
pub struct Sweeper {
    service: Arc<HandoffService>,
    agent_interval: Duration,
    abandonment_interval: Duration,
}

impl Sweeper {
    pub fn new(service: Arc<HandoffService>, agent_interval: Duration, abandonment_interval: Duration) -> Self {
        Self {
            service,
            agent_interval,
            abandonment_interval,
        }
    }

    pub fn from_config(service: Arc<HandoffService>, config: &SwitchboardConfig) -> Self {
        Self::new(
            service,
            Duration::from_secs(config.presence.agent_sweep_interval_secs),
            Duration::from_secs(config.abandonment.sweep_interval_secs),
        )
    }

    /// Run both sweeps until `cancel` fires. Each sweep runs once immediately.
    pub async fn run(self, cancel: CancellationToken) {
        let mut agent_tick = interval(self.agent_interval);
        agent_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut abandonment_tick = interval(self.abandonment_interval);
        abandonment_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            agent_interval_secs = self.agent_interval.as_secs(),
            abandonment_interval_secs = self.abandonment_interval.as_secs(),
            "sweeper running"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("sweeper stopping");
                    break;
                }
                _ = agent_tick.tick() => self.agent_sweep().await,
                _ = abandonment_tick.tick() => self.abandonment_sweep().await,
            }
        }
    }

    async fn agent_sweep(&self) {
        match self.service.sweep_agents().await {
            Ok(report) => debug!(
                examined = report.examined,
                away = report.demoted_away,
                offline = report.demoted_offline,
                lost_races = report.lost_races,
                failed = report.failed,
                "agent sweep complete"
            ),
            Err(e) => warn!(error = %e, "agent sweep failed"),
        }
    }

    async fn abandonment_sweep(&self) {
        match self.service.sweep_abandoned_conversations().await {
            Ok(report) => debug!(
                examined = report.examined,
                closed = report.closed,
                skipped = report.skipped,
                failed = report.failed,
                "abandonment sweep complete"
            ),
            Err(e) => warn!(error = %e, "abandonment sweep failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use switchboard_core::{Presence, StorageAdapter};
    use switchboard_test_utils::fixtures::{agent, monday_at};
    use switchboard_test_utils::{ManualClock, MemoryStorage, RecordingNotifier};

    use crate::service::HandoffConfig;

    #[tokio::test]
    async fn runs_immediately_and_stops_on_cancel() {
        let now = monday_at(12, 0, 0);
        let storage = Arc::new(MemoryStorage::new());
        storage
            .put_agent(agent("t1", "a1", 1, 3, now - ChronoDuration::minutes(40)))
            .await;
        let service = Arc::new(
            HandoffService::new(
                storage.clone(),
                Arc::new(RecordingNotifier::new()),
                Arc::new(ManualClock::new(now)),
                HandoffConfig::default(),
            )
            .unwrap(),
        );

        let cancel = CancellationToken::new();
        let sweeper = Sweeper::new(service, Duration::from_secs(300), Duration::from_secs(3600));
        let handle = tokio::spawn(sweeper.run(cancel.clone()));

        let mut demoted = false;
        for _ in 0..100 {
            let a = storage.get_agent("t1", "a1").await.unwrap().unwrap();
            if a.status == Presence::Offline {
                assert_eq!(a.current_chat_count, 0);
                demoted = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(demoted, "first tick should sweep immediately");

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("sweeper should stop")
            .unwrap();
    }
}
