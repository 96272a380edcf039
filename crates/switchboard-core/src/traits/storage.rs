// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for persistence backends (SQLite, in-memory).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::SwitchboardError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    AgentAvailability, ChatMessage, Conversation, ConversationStatus, HandoffSettings, Presence,
};

/// A conditional agent status change applied by presence sweeps.
///
/// The change only lands if the stored row still has `from` as its status and
/// `observed_last_seen_at` as its heartbeat, so a heartbeat that arrives between
/// the sweep's read and its write wins.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentTransition {
    pub tenant_id: String,
    pub agent_id: String,
    pub from: Presence,
    pub to: Presence,
    pub observed_last_seen_at: DateTime<Utc>,
    pub at: DateTime<Utc>,
    pub reset_chat_count: bool,
}

/// Adapter for the persistent store backing conversations, agents and settings.
///
/// Backends only need row-level atomicity: every multi-step flow in the core
/// is built from point reads, counts, inserts and single-row conditional
/// updates. No cross-row transactions are assumed.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connections, etc.).
    async fn initialize(&self) -> Result<(), SwitchboardError>;

    /// Closes the storage backend, flushing pending writes and releasing connections.
    async fn close(&self) -> Result<(), SwitchboardError>;

    // --- Conversations ---

    async fn insert_conversation(&self, conversation: &Conversation) -> Result<(), SwitchboardError>;

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, SwitchboardError>;

    /// The most recent non-terminal conversation for a visitor within a tenant.
    async fn find_active_conversation(
        &self,
        tenant_id: &str,
        visitor_id: &str,
    ) -> Result<Option<Conversation>, SwitchboardError>;

    /// Writes the routing columns of `conversation` only if the stored status
    /// still equals `expected`. Returns `false` when the row changed underneath.
    ///
    /// Customer presence columns are not written; they belong to
    /// [`update_customer_presence`](Self::update_customer_presence).
    async fn update_conversation_if(
        &self,
        conversation: &Conversation,
        expected: ConversationStatus,
    ) -> Result<bool, SwitchboardError>;

    /// Like [`update_conversation_if`](Self::update_conversation_if), but the
    /// stored `customer_last_seen_at` must also still equal
    /// `observed_last_seen_at`. Used to close idle conversations without
    /// clobbering a customer who came back after the row was read.
    async fn update_conversation_if_idle(
        &self,
        conversation: &Conversation,
        expected: ConversationStatus,
        observed_last_seen_at: DateTime<Utc>,
    ) -> Result<bool, SwitchboardError>;

    /// Sets customer presence, and the last-seen timestamp when given.
    /// Returns `false` if the conversation does not exist.
    async fn update_customer_presence(
        &self,
        conversation_id: &str,
        presence: Presence,
        last_seen_at: Option<DateTime<Utc>>,
    ) -> Result<bool, SwitchboardError>;

    /// Waiting conversations of a tenant, oldest `queue_entered_at` first.
    async fn list_waiting(&self, tenant_id: &str) -> Result<Vec<Conversation>, SwitchboardError>;

    async fn count_waiting(&self, tenant_id: &str) -> Result<u32, SwitchboardError>;

    /// Waiting conversations of a tenant with `queue_entered_at` strictly before `before`.
    async fn count_waiting_before(
        &self,
        tenant_id: &str,
        before: DateTime<Utc>,
    ) -> Result<u32, SwitchboardError>;

    /// Non-terminal conversations whose customer was last seen before `cutoff`.
    async fn list_stale_conversations(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Conversation>, SwitchboardError>;

    // --- Messages ---

    async fn insert_message(&self, message: &ChatMessage) -> Result<(), SwitchboardError>;

    /// Messages of a conversation in chronological order, optionally only the last `limit`.
    async fn list_messages(
        &self,
        conversation_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<ChatMessage>, SwitchboardError>;

    // --- Agents ---

    async fn get_agent(
        &self,
        tenant_id: &str,
        agent_id: &str,
    ) -> Result<Option<AgentAvailability>, SwitchboardError>;

    /// Inserts the record unless one already exists. Returns `true` if inserted.
    async fn insert_agent(&self, agent: &AgentAvailability) -> Result<bool, SwitchboardError>;

    /// Refreshes the heartbeat timestamp only. Returns `false` if the agent is unknown.
    async fn touch_agent(
        &self,
        tenant_id: &str,
        agent_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, SwitchboardError>;

    /// Unconditionally sets an agent's status, optionally zeroing its chat count.
    async fn set_agent_status(
        &self,
        tenant_id: &str,
        agent_id: &str,
        status: Presence,
        now: DateTime<Utc>,
        reset_chat_count: bool,
    ) -> Result<bool, SwitchboardError>;

    /// Applies `transition` if its preconditions still hold.
    async fn transition_agent_if(
        &self,
        transition: &AgentTransition,
    ) -> Result<bool, SwitchboardError>;

    async fn list_online_agents(
        &self,
        tenant_id: &str,
    ) -> Result<Vec<AgentAvailability>, SwitchboardError>;

    /// Every agent, across tenants, whose status is not `Offline`.
    async fn list_present_agents(&self) -> Result<Vec<AgentAvailability>, SwitchboardError>;

    /// Atomically increments the agent's chat count if it is online and below
    /// its cap. Returns whether a slot was claimed.
    async fn try_claim_slot(
        &self,
        tenant_id: &str,
        agent_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, SwitchboardError>;

    /// Decrements the agent's chat count, never below zero.
    async fn release_slot(&self, tenant_id: &str, agent_id: &str) -> Result<(), SwitchboardError>;

    // --- Settings ---

    async fn get_settings(
        &self,
        tenant_id: &str,
    ) -> Result<Option<HandoffSettings>, SwitchboardError>;

    async fn put_settings(&self, settings: &HandoffSettings) -> Result<(), SwitchboardError>;
}
