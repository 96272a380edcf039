// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Utc};
use switchboard_core::{Conversation, ConversationStatus, StorageAdapter};
use switchboard_handoff::{HandoffConfig, HandoffService};
use switchboard_test_utils::fixtures::monday_at;
use switchboard_test_utils::{ManualClock, MemoryStorage, RecordingNotifier};

pub struct Harness {
    pub storage: Arc<MemoryStorage>,
    pub notifier: RecordingNotifier,
    pub clock: ManualClock,
    pub service: Arc<HandoffService>,
}

impl Harness {
    pub fn new() -> Self {
        Self::starting_at(monday_at(10, 0, 0))
    }

    pub fn starting_at(now: DateTime<Utc>) -> Self {
        let storage = Arc::new(MemoryStorage::new());
        let notifier = RecordingNotifier::new();
        let clock = ManualClock::new(now);
        let service = HandoffService::new(
            storage.clone(),
            Arc::new(notifier.clone()),
            Arc::new(clock.clone()),
            HandoffConfig::default(),
        )
        .expect("service");
        Self {
            storage,
            notifier,
            clock,
            service: Arc::new(service),
        }
    }

    pub fn advance_secs(&self, secs: i64) {
        self.clock.advance(chrono::Duration::seconds(secs));
    }

    pub async fn conversation(&self, id: &str) -> Conversation {
        self.storage
            .get_conversation(id)
            .await
            .unwrap()
            .expect("conversation exists")
    }

    /// Insert a conversation that was once handled by `agent_id` and is now
    /// back with the automated agent.
    pub async fn returning_conversation(
        &self,
        id: &str,
        tenant_id: &str,
        visitor_id: &str,
        agent_id: &str,
    ) -> Conversation {
        let now = switchboard_core::Clock::now(&self.clock);
        let conversation = Conversation {
            status: ConversationStatus::AiActive,
            last_agent_id: Some(agent_id.to_string()),
            ..switchboard_test_utils::fixtures::conversation(id, tenant_id, visitor_id, now)
        };
        self.storage.insert_conversation(&conversation).await.unwrap();
        conversation
    }
}
