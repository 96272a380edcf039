// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory storage adapter for deterministic testing.
//!
//! `MemoryStorage` mirrors the row-level semantics of the SQLite adapter:
//! conditional updates compare the stored status, slot claims are
//! increment-if-below-cap, releases clamp at zero. Individual operations can
//! be made to fail to exercise error paths.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use switchboard_core::types::{
    AdapterType, AgentAvailability, ChatMessage, Conversation, ConversationStatus,
    HandoffSettings, HealthStatus, Presence,
};
use switchboard_core::{AgentTransition, PluginAdapter, StorageAdapter, SwitchboardError};

#[derive(Default)]
struct State {
    conversations: HashMap<String, Conversation>,
    messages: Vec<ChatMessage>,
    agents: HashMap<(String, String), AgentAvailability>,
    settings: HashMap<String, HandoffSettings>,
    failing: HashSet<&'static str>,
}

impl State {
    fn write_routing(
        &mut self,
        conversation: &Conversation,
        expected: ConversationStatus,
        last_seen_guard: Option<DateTime<Utc>>,
    ) -> bool {
        let Some(stored) = self.conversations.get_mut(&conversation.id) else {
            return false;
        };
        if stored.status != expected {
            return false;
        }
        if last_seen_guard.is_some_and(|seen| seen != stored.customer_last_seen_at) {
            return false;
        }
        // Presence columns belong to update_customer_presence.
        let presence = stored.customer_presence;
        let last_seen = stored.customer_last_seen_at;
        *stored = conversation.clone();
        stored.customer_presence = presence;
        stored.customer_last_seen_at = last_seen;
        true
    }

    fn check(&self, op: &'static str) -> Result<(), SwitchboardError> {
        if self.failing.contains(op) {
            tracing::debug!(op, "injected storage failure");
            return Err(SwitchboardError::Storage {
                source: format!("injected failure in {op}").into(),
            });
        }
        Ok(())
    }
}

fn agent_key(tenant_id: &str, agent_id: &str) -> (String, String) {
    (tenant_id.to_string(), agent_id.to_string())
}

/// A [`StorageAdapter`] backed by hash maps.
#[derive(Default)]
pub struct MemoryStorage {
    state: Mutex<State>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the named trait method fail with a storage error until cleared.
    pub async fn fail_operation(&self, op: &'static str) {
        self.state.lock().await.failing.insert(op);
    }

    pub async fn clear_failures(&self) {
        self.state.lock().await.failing.clear();
    }

    /// Every conversation, in no particular order.
    pub async fn conversations(&self) -> Vec<Conversation> {
        self.state.lock().await.conversations.values().cloned().collect()
    }

    /// Every message, in insertion order.
    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.state.lock().await.messages.clone()
    }

    /// Overwrite an agent record, bypassing all conditions.
    pub async fn put_agent(&self, agent: AgentAvailability) {
        let key = agent_key(&agent.tenant_id, &agent.agent_id);
        self.state.lock().await.agents.insert(key, agent);
    }

    /// Overwrite a conversation, bypassing all conditions.
    pub async fn put_conversation(&self, conversation: Conversation) {
        self.state
            .lock()
            .await
            .conversations
            .insert(conversation.id.clone(), conversation);
    }
}

#[async_trait]
impl PluginAdapter for MemoryStorage {
    fn name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, SwitchboardError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SwitchboardError> {
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for MemoryStorage {
    async fn initialize(&self) -> Result<(), SwitchboardError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), SwitchboardError> {
        Ok(())
    }

    async fn insert_conversation(&self, conversation: &Conversation) -> Result<(), SwitchboardError> {
        let mut state = self.state.lock().await;
        state.check("insert_conversation")?;
        if state.conversations.contains_key(&conversation.id) {
            return Err(SwitchboardError::Storage {
                source: format!("duplicate conversation id {}", conversation.id).into(),
            });
        }
        state
            .conversations
            .insert(conversation.id.clone(), conversation.clone());
        Ok(())
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, SwitchboardError> {
        let state = self.state.lock().await;
        state.check("get_conversation")?;
        Ok(state.conversations.get(id).cloned())
    }

    async fn find_active_conversation(
        &self,
        tenant_id: &str,
        visitor_id: &str,
    ) -> Result<Option<Conversation>, SwitchboardError> {
        let state = self.state.lock().await;
        state.check("find_active_conversation")?;
        Ok(state
            .conversations
            .values()
            .filter(|c| {
                c.tenant_id == tenant_id && c.visitor_id == visitor_id && !c.status.is_terminal()
            })
            .max_by_key(|c| c.created_at)
            .cloned())
    }

    async fn update_conversation_if(
        &self,
        conversation: &Conversation,
        expected: ConversationStatus,
    ) -> Result<bool, SwitchboardError> {
        let mut state = self.state.lock().await;
        state.check("update_conversation_if")?;
        Ok(state.write_routing(conversation, expected, None))
    }

    async fn update_conversation_if_idle(
        &self,
        conversation: &Conversation,
        expected: ConversationStatus,
        observed_last_seen_at: DateTime<Utc>,
    ) -> Result<bool, SwitchboardError> {
        let mut state = self.state.lock().await;
        state.check("update_conversation_if_idle")?;
        Ok(state.write_routing(conversation, expected, Some(observed_last_seen_at)))
    }

    async fn update_customer_presence(
        &self,
        conversation_id: &str,
        presence: Presence,
        last_seen_at: Option<DateTime<Utc>>,
    ) -> Result<bool, SwitchboardError> {
        let mut state = self.state.lock().await;
        state.check("update_customer_presence")?;
        let Some(stored) = state.conversations.get_mut(conversation_id) else {
            return Ok(false);
        };
        stored.customer_presence = presence;
        if let Some(at) = last_seen_at {
            stored.customer_last_seen_at = at;
        }
        Ok(true)
    }

    async fn list_waiting(&self, tenant_id: &str) -> Result<Vec<Conversation>, SwitchboardError> {
        let state = self.state.lock().await;
        state.check("list_waiting")?;
        let mut waiting: Vec<Conversation> = state
            .conversations
            .values()
            .filter(|c| c.tenant_id == tenant_id && c.status == ConversationStatus::Waiting)
            .cloned()
            .collect();
        waiting.sort_by(|a, b| {
            a.queue_entered_at
                .cmp(&b.queue_entered_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(waiting)
    }

    async fn count_waiting(&self, tenant_id: &str) -> Result<u32, SwitchboardError> {
        let state = self.state.lock().await;
        state.check("count_waiting")?;
        let count = state
            .conversations
            .values()
            .filter(|c| c.tenant_id == tenant_id && c.status == ConversationStatus::Waiting)
            .count();
        Ok(count as u32)
    }

    async fn count_waiting_before(
        &self,
        tenant_id: &str,
        before: DateTime<Utc>,
    ) -> Result<u32, SwitchboardError> {
        let state = self.state.lock().await;
        state.check("count_waiting_before")?;
        let count = state
            .conversations
            .values()
            .filter(|c| {
                c.tenant_id == tenant_id
                    && c.status == ConversationStatus::Waiting
                    && c.queue_entered_at.is_some_and(|at| at < before)
            })
            .count();
        Ok(count as u32)
    }

    async fn list_stale_conversations(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Conversation>, SwitchboardError> {
        let state = self.state.lock().await;
        state.check("list_stale_conversations")?;
        let mut stale: Vec<Conversation> = state
            .conversations
            .values()
            .filter(|c| !c.status.is_terminal() && c.customer_last_seen_at < cutoff)
            .cloned()
            .collect();
        stale.sort_by_key(|c| c.customer_last_seen_at);
        Ok(stale)
    }

    async fn insert_message(&self, message: &ChatMessage) -> Result<(), SwitchboardError> {
        let mut state = self.state.lock().await;
        state.check("insert_message")?;
        state.messages.push(message.clone());
        Ok(())
    }

    async fn list_messages(
        &self,
        conversation_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<ChatMessage>, SwitchboardError> {
        let state = self.state.lock().await;
        state.check("list_messages")?;
        let mut messages: Vec<ChatMessage> = state
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.created_at);
        if let Some(limit) = limit {
            let keep = usize::try_from(limit.max(0)).unwrap_or(0);
            let skip = messages.len().saturating_sub(keep);
            messages.drain(..skip);
        }
        Ok(messages)
    }

    async fn get_agent(
        &self,
        tenant_id: &str,
        agent_id: &str,
    ) -> Result<Option<AgentAvailability>, SwitchboardError> {
        let state = self.state.lock().await;
        state.check("get_agent")?;
        Ok(state.agents.get(&agent_key(tenant_id, agent_id)).cloned())
    }

    async fn insert_agent(&self, agent: &AgentAvailability) -> Result<bool, SwitchboardError> {
        let mut state = self.state.lock().await;
        state.check("insert_agent")?;
        let key = agent_key(&agent.tenant_id, &agent.agent_id);
        if state.agents.contains_key(&key) {
            return Ok(false);
        }
        state.agents.insert(key, agent.clone());
        Ok(true)
    }

    async fn touch_agent(
        &self,
        tenant_id: &str,
        agent_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, SwitchboardError> {
        let mut state = self.state.lock().await;
        state.check("touch_agent")?;
        let Some(agent) = state.agents.get_mut(&agent_key(tenant_id, agent_id)) else {
            return Ok(false);
        };
        agent.last_seen_at = now;
        Ok(true)
    }

    async fn set_agent_status(
        &self,
        tenant_id: &str,
        agent_id: &str,
        status: Presence,
        now: DateTime<Utc>,
        reset_chat_count: bool,
    ) -> Result<bool, SwitchboardError> {
        let mut state = self.state.lock().await;
        state.check("set_agent_status")?;
        let Some(agent) = state.agents.get_mut(&agent_key(tenant_id, agent_id)) else {
            return Ok(false);
        };
        if agent.status != status {
            agent.status_changed_at = now;
        }
        agent.status = status;
        agent.last_seen_at = now;
        if reset_chat_count {
            agent.current_chat_count = 0;
        }
        Ok(true)
    }

    async fn transition_agent_if(
        &self,
        transition: &AgentTransition,
    ) -> Result<bool, SwitchboardError> {
        let mut state = self.state.lock().await;
        state.check("transition_agent_if")?;
        let key = agent_key(&transition.tenant_id, &transition.agent_id);
        let Some(agent) = state.agents.get_mut(&key) else {
            return Ok(false);
        };
        if agent.status != transition.from || agent.last_seen_at != transition.observed_last_seen_at
        {
            return Ok(false);
        }
        agent.status = transition.to;
        agent.status_changed_at = transition.at;
        if transition.reset_chat_count {
            agent.current_chat_count = 0;
        }
        Ok(true)
    }

    async fn list_online_agents(
        &self,
        tenant_id: &str,
    ) -> Result<Vec<AgentAvailability>, SwitchboardError> {
        let state = self.state.lock().await;
        state.check("list_online_agents")?;
        let mut agents: Vec<AgentAvailability> = state
            .agents
            .values()
            .filter(|a| a.tenant_id == tenant_id && a.status == Presence::Online)
            .cloned()
            .collect();
        agents.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        Ok(agents)
    }

    async fn list_present_agents(&self) -> Result<Vec<AgentAvailability>, SwitchboardError> {
        let state = self.state.lock().await;
        state.check("list_present_agents")?;
        let mut agents: Vec<AgentAvailability> = state
            .agents
            .values()
            .filter(|a| a.status != Presence::Offline)
            .cloned()
            .collect();
        agents.sort_by(|a, b| {
            (a.tenant_id.as_str(), a.agent_id.as_str()).cmp(&(b.tenant_id.as_str(), b.agent_id.as_str()))
        });
        Ok(agents)
    }

    async fn try_claim_slot(
        &self,
        tenant_id: &str,
        agent_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, SwitchboardError> {
        let mut state = self.state.lock().await;
        state.check("try_claim_slot")?;
        let Some(agent) = state.agents.get_mut(&agent_key(tenant_id, agent_id)) else {
            return Ok(false);
        };
        if !agent.is_eligible() {
            return Ok(false);
        }
        agent.current_chat_count += 1;
        agent.last_assigned_at = Some(now);
        Ok(true)
    }

    async fn release_slot(&self, tenant_id: &str, agent_id: &str) -> Result<(), SwitchboardError> {
        let mut state = self.state.lock().await;
        state.check("release_slot")?;
        if let Some(agent) = state.agents.get_mut(&agent_key(tenant_id, agent_id)) {
            agent.current_chat_count = agent.current_chat_count.saturating_sub(1);
        }
        Ok(())
    }

    async fn get_settings(
        &self,
        tenant_id: &str,
    ) -> Result<Option<HandoffSettings>, SwitchboardError> {
        let state = self.state.lock().await;
        state.check("get_settings")?;
        Ok(state.settings.get(tenant_id).cloned())
    }

    async fn put_settings(&self, settings: &HandoffSettings) -> Result<(), SwitchboardError> {
        let mut state = self.state.lock().await;
        state.check("put_settings")?;
        state
            .settings
            .insert(settings.tenant_id.clone(), settings.clone());
        Ok(())
    }
}
