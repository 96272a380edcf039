// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prebuilt domain values for tests.

use chrono::{DateTime, TimeZone, Utc};
use switchboard_core::types::{AgentAvailability, Conversation, HandoffSettings};

/// 2026-03-02, a Monday, at the given UTC time.
pub fn monday_at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, h, m, s)
        .single()
        .unwrap_or_else(|| panic!("invalid fixture time {h}:{m}:{s}"))
}

/// 2026-03-07, a Saturday, at the given UTC time.
pub fn saturday_at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 7, h, m, s)
        .single()
        .unwrap_or_else(|| panic!("invalid fixture time {h}:{m}:{s}"))
}

/// Handoff enabled, both trigger modes, no business-hours gate.
pub fn enabled_settings(tenant_id: &str) -> HandoffSettings {
    HandoffSettings::new(tenant_id)
}

/// Handoff switched off for the tenant.
pub fn disabled_settings(tenant_id: &str) -> HandoffSettings {
    HandoffSettings {
        enabled: false,
        ..HandoffSettings::new(tenant_id)
    }
}

/// Mon-Fri 09:00-17:00 enforced in `timezone`.
pub fn business_hours_settings(tenant_id: &str, timezone: &str) -> HandoffSettings {
    HandoffSettings {
        business_hours_enabled: true,
        timezone: timezone.to_string(),
        ..HandoffSettings::new(tenant_id)
    }
}

/// An online agent with `chats` of `max` slots taken.
pub fn agent(
    tenant_id: &str,
    agent_id: &str,
    chats: u32,
    max: u32,
    now: DateTime<Utc>,
) -> AgentAvailability {
    AgentAvailability {
        current_chat_count: chats,
        ..AgentAvailability::online(tenant_id, agent_id, max, now)
    }
}

/// A fresh `ai_active` conversation with a fixed id.
pub fn conversation(id: &str, tenant_id: &str, visitor_id: &str, now: DateTime<Utc>) -> Conversation {
    Conversation {
        id: id.to_string(),
        ..Conversation::new(tenant_id, visitor_id, now)
    }
}
