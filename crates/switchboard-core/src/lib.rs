// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Switchboard handoff service.
//!
//! This crate provides the error type, the domain model (conversations,
//! agent availability, per-tenant handoff settings), and the port traits for
//! the external collaborators the handoff core talks to: the persistent
//! store, the notification fan-out and the clock.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::SwitchboardError;
pub use types::{
    AdapterType, AgentAvailability, ChannelKey, ChatMessage, Conversation, ConversationStatus,
    DayWindow, EventType, HandoffReason, HandoffSettings, HealthStatus, MessageSender,
    Notification, Presence, TriggerMode,
};

pub use traits::storage::AgentTransition;
pub use traits::{Clock, NotificationAdapter, PluginAdapter, StorageAdapter, SystemClock};
