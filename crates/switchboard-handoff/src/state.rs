// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation state machine.
//!
//! Every transition is validated against [`ConversationStatus::can_transition_to`]
//! and persisted as a conditional update on the status the caller observed.
//! A concurrent writer that got there first turns the update into
//! [`SwitchboardError::Conflict`]. Slot bookkeeping happens around the
//! transition: a slot is claimed before entering `agent_active` and released
//! after leaving it.

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, info, warn};

use switchboard_core::{
    ChannelKey, ChatMessage, Conversation, ConversationStatus, EventType, HandoffReason,
    MessageSender, SwitchboardError,
};

use crate::service::HandoffService;

impl HandoffService {
    /// Persist `next` over `current`, conditional on `current.status`.
    async fn apply_transition(
        &self,
        current: &Conversation,
        next: Conversation,
    ) -> Result<Conversation, SwitchboardError> {
        self.apply_guarded_transition(current, next, None).await
    }

    /// `apply_transition` that can also require the customer to not have
    /// been seen since `idle_since`.
    async fn apply_guarded_transition(
        &self,
        current: &Conversation,
        mut next: Conversation,
        idle_since: Option<DateTime<Utc>>,
    ) -> Result<Conversation, SwitchboardError> {
        let from = current.status;
        let to = next.status;
        if !from.can_transition_to(to) {
            return Err(SwitchboardError::InvalidTransition { from, to });
        }

        next.updated_at = self.now();
        let written = match idle_since {
            Some(seen) => {
                self.storage
                    .update_conversation_if_idle(&next, from, seen)
                    .await?
            }
            None => self.storage.update_conversation_if(&next, from).await?,
        };
        if !written {
            warn!(conversation_id = %current.id, %from, %to, "transition lost a race");
            return Err(SwitchboardError::Conflict(format!(
                "conversation {} is no longer {from}",
                current.id
            )));
        }

        #[cfg(feature = "prometheus")]
        switchboard_prometheus::record_transition(&to.to_string());
        info!(
            conversation_id = %next.id,
            tenant_id = %next.tenant_id,
            %from,
            %to,
            "conversation transitioned"
        );
        self.publish(
            ChannelKey::Conversation(next.id.clone()),
            EventType::ConversationStatusChanged,
            json!({
                "conversation_id": next.id,
                "from": from,
                "to": to,
                "assigned_agent_id": next.assigned_agent_id,
                "queue_entered_at": next.queue_entered_at,
            }),
        );

        if from == ConversationStatus::Waiting || to == ConversationStatus::Waiting {
            if let Err(e) = self.republish_queue(&next.tenant_id).await {
                warn!(tenant_id = %next.tenant_id, error = %e, "queue republish failed");
            }
        }
        Ok(next)
    }

    /// Give back the slot held by the conversation's agent, if it held one.
    ///
    /// Runs after the transition is persisted, so a failure here only logs:
    /// the agent's count stays one high until they go offline.
    async fn release_held_slot(&self, conversation: &Conversation) {
        if conversation.status != ConversationStatus::AgentActive {
            return;
        }
        let Some(agent_id) = conversation.assigned_agent_id.as_deref() else {
            return;
        };
        if let Err(e) = self
            .storage
            .release_slot(&conversation.tenant_id, agent_id)
            .await
        {
            warn!(
                conversation_id = %conversation.id,
                agent_id,
                error = %e,
                "failed to release agent slot"
            );
        }
    }

    /// Move a conversation into the queue.
    ///
    /// From `ai_active` this is the normal handoff; from `agent_active` it is
    /// a transfer back to the queue and frees the agent's slot.
    pub async fn enqueue(
        &self,
        conversation: &Conversation,
        reason: HandoffReason,
        trigger_keyword: Option<&str>,
    ) -> Result<Conversation, SwitchboardError> {
        let next = Conversation {
            status: ConversationStatus::Waiting,
            queue_entered_at: Some(self.now()),
            assigned_agent_id: None,
            handoff_reason: Some(reason),
            trigger_keyword: trigger_keyword.map(str::to_string),
            ..conversation.clone()
        };
        let next = self.apply_transition(conversation, next).await?;
        self.release_held_slot(conversation).await;

        self.publish(
            ChannelKey::TenantAgents(next.tenant_id.clone()),
            EventType::HandoffRequested,
            json!({
                "conversation_id": next.id,
                "visitor_id": next.visitor_id,
                "reason": reason,
                "trigger_keyword": next.trigger_keyword,
            }),
        );
        Ok(next)
    }

    /// Put an agent's conversation back in the queue.
    pub async fn transfer_to_queue(
        &self,
        conversation_id: &str,
    ) -> Result<Conversation, SwitchboardError> {
        let conversation = self.conversation(conversation_id).await?;
        if conversation.status != ConversationStatus::AgentActive {
            return Err(SwitchboardError::InvalidTransition {
                from: conversation.status,
                to: ConversationStatus::Waiting,
            });
        }
        let reason = conversation
            .handoff_reason
            .unwrap_or(HandoffReason::ButtonClick);
        let keyword = conversation.trigger_keyword.clone();
        self.enqueue(&conversation, reason, keyword.as_deref()).await
    }

    /// Claim a slot for `agent_id` and move the conversation to `agent_active`.
    ///
    /// `Ok(None)` when the agent had no free slot at claim time.
    async fn assign(
        &self,
        conversation: &Conversation,
        agent_id: &str,
        reason: Option<HandoffReason>,
        trigger_keyword: Option<&str>,
    ) -> Result<Option<Conversation>, SwitchboardError> {
        let from = conversation.status;
        if !from.can_transition_to(ConversationStatus::AgentActive) {
            return Err(SwitchboardError::InvalidTransition {
                from,
                to: ConversationStatus::AgentActive,
            });
        }

        let now = self.now();
        if !self
            .storage
            .try_claim_slot(&conversation.tenant_id, agent_id, now)
            .await?
        {
            debug!(conversation_id = %conversation.id, agent_id, "agent slot claim refused");
            return Ok(None);
        }

        let mut next = Conversation {
            status: ConversationStatus::AgentActive,
            assigned_agent_id: Some(agent_id.to_string()),
            last_agent_id: Some(agent_id.to_string()),
            claimed_at: Some(now),
            queue_entered_at: None,
            ..conversation.clone()
        };
        if let Some(reason) = reason {
            next.handoff_reason = Some(reason);
            next.trigger_keyword = trigger_keyword.map(str::to_string);
        }

        let next = match self.apply_transition(conversation, next).await {
            Ok(next) => next,
            Err(e) => {
                if let Err(release) = self
                    .storage
                    .release_slot(&conversation.tenant_id, agent_id)
                    .await
                {
                    warn!(agent_id, error = %release, "failed to return claimed slot");
                }
                return Err(e);
            }
        };

        self.publish_all(
            [
                ChannelKey::Agent(agent_id.to_string()),
                ChannelKey::Conversation(next.id.clone()),
            ],
            EventType::ConversationAssigned,
            json!({
                "conversation_id": next.id,
                "tenant_id": next.tenant_id,
                "visitor_id": next.visitor_id,
                "agent_id": agent_id,
            }),
        );
        Ok(Some(next))
    }

    /// Route a returning conversation straight back to its previous agent.
    ///
    /// `Ok(None)` when there is no previous agent, the agent is no longer
    /// eligible, or the slot claim loses to a concurrent assignment.
    pub async fn reassign_to_previous_agent(
        &self,
        conversation: &Conversation,
        reason: HandoffReason,
        trigger_keyword: Option<&str>,
    ) -> Result<Option<Conversation>, SwitchboardError> {
        let Some(agent_id) = conversation.last_agent_id.as_deref() else {
            return Ok(None);
        };
        let eligible = self
            .storage
            .get_agent(&conversation.tenant_id, agent_id)
            .await?
            .is_some_and(|a| a.is_eligible());
        if !eligible {
            debug!(conversation_id = %conversation.id, agent_id, "previous agent not eligible");
            return Ok(None);
        }
        self.assign(conversation, agent_id, Some(reason), trigger_keyword)
            .await
    }

    /// An agent takes a waiting conversation from the queue.
    pub async fn claim(
        &self,
        conversation_id: &str,
        agent_id: &str,
    ) -> Result<Conversation, SwitchboardError> {
        let conversation = self.conversation(conversation_id).await?;
        if conversation.status != ConversationStatus::Waiting {
            return Err(SwitchboardError::Conflict(format!(
                "conversation {conversation_id} is {} and cannot be claimed",
                conversation.status
            )));
        }
        self.agent(&conversation.tenant_id, agent_id).await?;

        self.assign(&conversation, agent_id, None, None)
            .await?
            .ok_or_else(|| {
                SwitchboardError::Conflict(format!("agent {agent_id} has no free slot"))
            })
    }

    async fn finish(
        &self,
        conversation_id: &str,
        to: ConversationStatus,
    ) -> Result<Conversation, SwitchboardError> {
        let conversation = self.conversation(conversation_id).await?;
        let next = Conversation {
            status: to,
            assigned_agent_id: None,
            queue_entered_at: None,
            resolved_at: Some(self.now()),
            ..conversation.clone()
        };
        let next = self.apply_transition(&conversation, next).await?;
        self.release_held_slot(&conversation).await;
        Ok(next)
    }

    /// Mark the conversation resolved. Permitted from any non-terminal state.
    pub async fn resolve(&self, conversation_id: &str) -> Result<Conversation, SwitchboardError> {
        self.finish(conversation_id, ConversationStatus::Resolved)
            .await
    }

    /// Close the conversation. Permitted from any non-terminal state.
    pub async fn close(&self, conversation_id: &str) -> Result<Conversation, SwitchboardError> {
        self.finish(conversation_id, ConversationStatus::Closed).await
    }

    /// Hand a waiting or agent-held conversation back to automation.
    pub async fn return_to_ai(
        &self,
        conversation_id: &str,
    ) -> Result<Conversation, SwitchboardError> {
        let conversation = self.conversation(conversation_id).await?;
        let next = Conversation {
            status: ConversationStatus::AiActive,
            assigned_agent_id: None,
            queue_entered_at: None,
            ..conversation.clone()
        };
        let next = self.apply_transition(&conversation, next).await?;
        self.release_held_slot(&conversation).await;
        Ok(next)
    }

    /// Store an agent's message. The first one sent by the assigned agent
    /// while `agent_active` sets `first_response_at`.
    pub async fn record_agent_message(
        &self,
        conversation_id: &str,
        agent_id: &str,
        content: &str,
    ) -> Result<ChatMessage, SwitchboardError> {
        let conversation = self.conversation(conversation_id).await?;
        if conversation.status.is_terminal() {
            return Err(SwitchboardError::Conflict(format!(
                "conversation {conversation_id} is {}",
                conversation.status
            )));
        }

        let now = self.now();
        let message = ChatMessage::new(
            conversation_id,
            MessageSender::Agent,
            Some(agent_id),
            content,
            now,
        );
        self.storage.insert_message(&message).await?;
        self.storage
            .touch_agent(&conversation.tenant_id, agent_id, now)
            .await?;

        let first_response = conversation.status == ConversationStatus::AgentActive
            && conversation.first_response_at.is_none()
            && conversation.assigned_agent_id.as_deref() == Some(agent_id);
        if first_response {
            let next = Conversation {
                first_response_at: Some(now),
                updated_at: now,
                ..conversation.clone()
            };
            if self
                .storage
                .update_conversation_if(&next, ConversationStatus::AgentActive)
                .await?
            {
                info!(conversation_id, agent_id, "first agent response");
            } else {
                debug!(conversation_id, "conversation changed before first response was stamped");
            }
        }

        self.publish_message(&message);
        Ok(message)
    }

    /// Force-close an idle conversation with an explanatory system message.
    ///
    /// `Ok(false)` when the conversation is already terminal, changed status
    /// under the sweep, or the customer was seen after `conversation` was read.
    pub async fn abandon(&self, conversation: &Conversation) -> Result<bool, SwitchboardError> {
        if conversation.status.is_terminal() {
            return Ok(false);
        }
        let now = self.now();
        let next = Conversation {
            status: ConversationStatus::Closed,
            assigned_agent_id: None,
            queue_entered_at: None,
            resolved_at: Some(now),
            ..conversation.clone()
        };
        match self
            .apply_guarded_transition(conversation, next, Some(conversation.customer_last_seen_at))
            .await
        {
            Ok(_) => {}
            Err(SwitchboardError::Conflict(_)) => return Ok(false),
            Err(e) => return Err(e),
        }
        self.release_held_slot(conversation).await;

        let message = ChatMessage::system(&conversation.id, &self.config.abandonment_message, now);
        self.storage.insert_message(&message).await?;
        self.publish_message(&message);
        info!(
            conversation_id = %conversation.id,
            last_seen = %conversation.customer_last_seen_at,
            "conversation abandoned"
        );
        Ok(true)
    }

    fn publish_message(&self, message: &ChatMessage) {
        self.publish(
            ChannelKey::Conversation(message.conversation_id.clone()),
            EventType::MessageCreated,
            json!({
                "message_id": message.id,
                "conversation_id": message.conversation_id,
                "sender": message.sender,
                "sender_id": message.sender_id,
                "content": message.content,
                "created_at": message.created_at,
            }),
        );
    }
}
