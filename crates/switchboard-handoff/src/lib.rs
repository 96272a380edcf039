// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Handoff and presence orchestration for Switchboard.
//!
//! The [`HandoffService`] decides, for each inbound conversation, whether a
//! human should take over and which one: keyword or confidence triggers,
//! then the business-hours gate, the agent-availability gate, and finally
//! same-agent reassignment or the FIFO queue. It also owns the conversation
//! state machine, customer and agent presence, and the timeout sweeps.
//!
//! Storage and notification delivery are ports
//! ([`StorageAdapter`](switchboard_core::StorageAdapter),
//! [`NotificationAdapter`](switchboard_core::NotificationAdapter)); the
//! service only decides what to write and what to publish.

pub mod availability;
pub mod business_hours;
pub mod pipeline;
pub mod presence;
pub mod queue;
pub mod service;
pub mod settings;
pub mod state;
pub mod sweeper;
pub mod templates;
pub mod trigger;

pub use availability::AgentAvailabilityCheck;
pub use business_hours::{is_within_business_hours, validate_schedule};
pub use pipeline::{Disposition, HandoffOutcome};
pub use presence::{
    AbandonmentReport, AgentSweepReport, CustomerActivity, PresenceThresholds, agent_demotion,
    customer_presence,
};
pub use queue::QueueEntry;
pub use service::{HandoffConfig, HandoffService};
pub use settings::{SettingsCache, TenantSettings};
pub use sweeper::Sweeper;
pub use templates::{MessageTemplates, estimated_wait};
pub use trigger::{HandoffTrigger, KeywordMatcher, RetrievedChunk};
