// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain and port types shared across the Switchboard crates.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of an adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Notification,
    Observability,
}

// --- Conversation lifecycle ---

/// Lifecycle states of a support conversation.
///
/// `Resolved` and `Closed` are terminal for routing but remain queryable.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    /// Handled by the automated agent. Initial state.
    AiActive,
    /// Queued for a human agent.
    Waiting,
    /// Assigned to a human agent.
    AgentActive,
    Resolved,
    Closed,
}

impl ConversationStatus {
    /// States swept by the abandonment sweep and eligible for routing.
    pub const NON_TERMINAL: [ConversationStatus; 3] = [
        ConversationStatus::AiActive,
        ConversationStatus::Waiting,
        ConversationStatus::AgentActive,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(self, ConversationStatus::Resolved | ConversationStatus::Closed)
    }

    /// Whether the state machine permits moving from `self` to `next`.
    pub fn can_transition_to(self, next: ConversationStatus) -> bool {
        use ConversationStatus::*;
        match (self, next) {
            (Resolved | Closed, _) => false,
            (from, to) if from == to => false,
            (_, Resolved | Closed) => true,
            (AiActive, Waiting | AgentActive) => true,
            (Waiting, AgentActive | AiActive) => true,
            (AgentActive, Waiting | AiActive) => true,
            _ => false,
        }
    }
}

/// Liveness classification for customers and agents.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    Online,
    Away,
    Offline,
}

/// Why a conversation was handed to a human.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum HandoffReason {
    Keyword,
    LowConfidence,
    ButtonClick,
}

/// Which trigger sources a tenant accepts.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TriggerMode {
    /// Keyword and low-confidence detection only.
    Automatic,
    /// Explicit "talk to a human" button only.
    Manual,
    Both,
}

impl TriggerMode {
    pub fn allows_automatic(self) -> bool {
        matches!(self, TriggerMode::Automatic | TriggerMode::Both)
    }

    pub fn allows_manual(self) -> bool {
        matches!(self, TriggerMode::Manual | TriggerMode::Both)
    }
}

/// A customer support conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub tenant_id: String,
    pub visitor_id: String,
    pub status: ConversationStatus,
    /// Set only while `status == AgentActive`.
    pub assigned_agent_id: Option<String>,
    /// Most recent agent ever assigned; survives unassignment.
    pub last_agent_id: Option<String>,
    /// Set only while `status == Waiting`.
    pub queue_entered_at: Option<DateTime<Utc>>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub first_response_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub customer_presence: Presence,
    pub customer_last_seen_at: DateTime<Utc>,
    pub handoff_reason: Option<HandoffReason>,
    pub trigger_keyword: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// A fresh conversation in `AiActive` with an online customer.
    pub fn new(tenant_id: &str, visitor_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            visitor_id: visitor_id.to_string(),
            status: ConversationStatus::AiActive,
            assigned_agent_id: None,
            last_agent_id: None,
            queue_entered_at: None,
            claimed_at: None,
            first_response_at: None,
            resolved_at: None,
            customer_presence: Presence::Online,
            customer_last_seen_at: now,
            handoff_reason: None,
            trigger_keyword: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Per-tenant availability record for a human agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentAvailability {
    pub tenant_id: String,
    pub agent_id: String,
    pub status: Presence,
    pub current_chat_count: u32,
    pub max_concurrent_chats: u32,
    /// Last heartbeat.
    pub last_seen_at: DateTime<Utc>,
    pub status_changed_at: DateTime<Utc>,
    pub last_assigned_at: Option<DateTime<Utc>>,
}

impl AgentAvailability {
    /// A record for an agent coming online for the first time.
    pub fn online(tenant_id: &str, agent_id: &str, max_concurrent_chats: u32, now: DateTime<Utc>) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            agent_id: agent_id.to_string(),
            status: Presence::Online,
            current_chat_count: 0,
            max_concurrent_chats,
            last_seen_at: now,
            status_changed_at: now,
            last_assigned_at: None,
        }
    }

    pub fn has_capacity(&self) -> bool {
        self.current_chat_count < self.max_concurrent_chats
    }

    /// Online with an open slot.
    pub fn is_eligible(&self) -> bool {
        self.status == Presence::Online && self.has_capacity()
    }
}

/// One weekday's business-hours window, times as `HH:MM` in the tenant timezone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayWindow {
    pub start: String,
    pub end: String,
    pub enabled: bool,
}

impl DayWindow {
    pub fn new(start: &str, end: &str) -> Self {
        Self {
            start: start.to_string(),
            end: end.to_string(),
            enabled: true,
        }
    }
}

/// Per-tenant handoff configuration. Read on every inbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffSettings {
    pub tenant_id: String,
    pub enabled: bool,
    pub trigger_mode: TriggerMode,
    /// Human-intent keywords. Empty means the service default set.
    pub keywords: Vec<String>,
    pub keyword_enabled: bool,
    pub low_confidence_threshold: f64,
    pub low_confidence_enabled: bool,
    pub business_hours_enabled: bool,
    /// IANA timezone name, e.g. `Europe/Berlin`.
    pub timezone: String,
    /// Keyed by lowercase English weekday name (`monday` .. `sunday`).
    pub schedule: BTreeMap<String, DayWindow>,
    /// Capacity given to agents first coming online in this tenant.
    pub max_concurrent_chats: u32,
}

impl HandoffSettings {
    /// Enabled settings with a Monday-Friday 09:00-17:00 UTC schedule (not enforced
    /// until `business_hours_enabled` is set).
    pub fn new(tenant_id: &str) -> Self {
        let schedule = ["monday", "tuesday", "wednesday", "thursday", "friday"]
            .into_iter()
            .map(|day| (day.to_string(), DayWindow::new("09:00", "17:00")))
            .collect();
        Self {
            tenant_id: tenant_id.to_string(),
            enabled: true,
            trigger_mode: TriggerMode::Both,
            keywords: Vec::new(),
            keyword_enabled: true,
            low_confidence_threshold: 0.35,
            low_confidence_enabled: true,
            business_hours_enabled: false,
            timezone: "UTC".to_string(),
            schedule,
            max_concurrent_chats: 3,
        }
    }
}

/// Who authored a chat message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageSender {
    Customer,
    Ai,
    Agent,
    System,
}

/// A message persisted against a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub conversation_id: String,
    pub sender: MessageSender,
    pub sender_id: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(
        conversation_id: &str,
        sender: MessageSender,
        sender_id: Option<&str>,
        content: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation_id.to_string(),
            sender,
            sender_id: sender_id.map(str::to_string),
            content: content.to_string(),
            created_at: now,
        }
    }

    pub fn system(conversation_id: &str, content: &str, now: DateTime<Utc>) -> Self {
        Self::new(conversation_id, MessageSender::System, None, content, now)
    }
}

// --- Notification port types ---

/// Pub/sub channel a notification is published on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChannelKey {
    /// `conversation:{id}`
    Conversation(String),
    /// `tenant:{id}:queue`
    TenantQueue(String),
    /// `tenant:{id}:agents`
    TenantAgents(String),
    /// `agent:{id}`
    Agent(String),
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelKey::Conversation(id) => write!(f, "conversation:{id}"),
            ChannelKey::TenantQueue(id) => write!(f, "tenant:{id}:queue"),
            ChannelKey::TenantAgents(id) => write!(f, "tenant:{id}:agents"),
            ChannelKey::Agent(id) => write!(f, "agent:{id}"),
        }
    }
}

/// Kinds of state-change events the core publishes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ConversationStatusChanged,
    ConversationAssigned,
    HandoffRequested,
    QueuePosition,
    QueueUpdated,
    AgentStatusChanged,
    CustomerPresence,
    MessageCreated,
}

/// A single event published to a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub event_type: EventType,
    pub payload: serde_json::Value,
    pub emitted_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(event_type: EventType, payload: serde_json::Value, emitted_at: DateTime<Utc>) -> Self {
        Self {
            event_type,
            payload,
            emitted_at,
        }
    }
}
