// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-time queue positions.
//!
//! The queue is not stored. A waiting conversation's position is the number
//! of waiting conversations in the same tenant that entered strictly earlier,
//! plus one. Positions are only consistent as of the read that computed
//! them; two conversations entering at the same instant share a position.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use switchboard_core::{ChannelKey, Conversation, ConversationStatus, EventType, SwitchboardError};

use crate::service::HandoffService;
use crate::templates::estimated_wait;

/// One waiting conversation in a [`HandoffService::queue_snapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueEntry {
    pub conversation_id: String,
    pub visitor_id: String,
    pub position: u32,
    pub queue_entered_at: DateTime<Utc>,
}

/// Assign positions to conversations already sorted by `queue_entered_at`.
fn rank(waiting: Vec<Conversation>) -> Vec<QueueEntry> {
    let mut entries = Vec::with_capacity(waiting.len());
    let mut position = 0u32;
    let mut previous: Option<DateTime<Utc>> = None;

    for (index, conversation) in waiting.into_iter().enumerate() {
        let Some(entered) = conversation.queue_entered_at else {
            continue;
        };
        if previous != Some(entered) {
            position = index as u32 + 1;
            previous = Some(entered);
        }
        entries.push(QueueEntry {
            conversation_id: conversation.id,
            visitor_id: conversation.visitor_id,
            position,
            queue_entered_at: entered,
        });
    }
    entries
}

impl HandoffService {
    /// Current 1-based position, or `None` when the conversation is not waiting.
    pub async fn queue_position(
        &self,
        conversation: &Conversation,
    ) -> Result<Option<u32>, SwitchboardError> {
        if conversation.status != ConversationStatus::Waiting {
            return Ok(None);
        }
        let Some(entered) = conversation.queue_entered_at else {
            return Ok(None);
        };
        let ahead = self
            .storage
            .count_waiting_before(&conversation.tenant_id, entered)
            .await?;
        Ok(Some(ahead + 1))
    }

    /// All waiting conversations in a tenant with their positions, from one read.
    pub async fn queue_snapshot(&self, tenant_id: &str) -> Result<Vec<QueueEntry>, SwitchboardError> {
        let waiting = self.storage.list_waiting(tenant_id).await?;
        Ok(rank(waiting))
    }

    /// Recompute every position in the tenant and push them to clients.
    ///
    /// Each waiting conversation gets `queue_position` on its own channel;
    /// the tenant queue channel gets `queue_updated` with the depth.
    pub async fn republish_queue(&self, tenant_id: &str) -> Result<usize, SwitchboardError> {
        let entries = self.queue_snapshot(tenant_id).await?;
        let depth = entries.len();

        for entry in &entries {
            self.publish(
                ChannelKey::Conversation(entry.conversation_id.clone()),
                EventType::QueuePosition,
                json!({
                    "conversation_id": entry.conversation_id,
                    "position": entry.position,
                    "estimated_wait": estimated_wait(entry.position),
                }),
            );
        }
        self.publish(
            ChannelKey::TenantQueue(tenant_id.to_string()),
            EventType::QueueUpdated,
            json!({ "tenant_id": tenant_id, "depth": depth }),
        );

        #[cfg(feature = "prometheus")]
        switchboard_prometheus::set_queue_depth(tenant_id, depth as u32);
        debug!(tenant_id, depth, "queue republished");
        Ok(depth)
    }
}
