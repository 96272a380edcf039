// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade so any recorder (Prometheus, statsd, etc.)
//! can collect these metrics. Without an installed recorder every call is a
//! no-op.

use metrics::{describe_counter, describe_gauge};

pub const HANDOFF_OUTCOMES: &str = "switchboard_handoff_outcomes_total";
pub const CONVERSATION_TRANSITIONS: &str = "switchboard_conversation_transitions_total";
pub const NOTIFICATIONS_FAILED: &str = "switchboard_notifications_failed_total";
pub const AGENT_DEMOTIONS: &str = "switchboard_agent_demotions_total";
pub const CONVERSATIONS_ABANDONED: &str = "switchboard_conversations_abandoned_total";
pub const QUEUE_DEPTH: &str = "switchboard_queue_depth";

/// Register all Switchboard metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        HANDOFF_OUTCOMES,
        "Handoff pipeline results by trigger reason and disposition"
    );
    describe_counter!(
        CONVERSATION_TRANSITIONS,
        "Persisted conversation status transitions by target status"
    );
    describe_counter!(
        NOTIFICATIONS_FAILED,
        "Notification publishes that failed and were dropped"
    );
    describe_counter!(
        AGENT_DEMOTIONS,
        "Agents demoted by the presence sweep, by target status"
    );
    describe_counter!(
        CONVERSATIONS_ABANDONED,
        "Conversations force-closed by the abandonment sweep"
    );
    describe_gauge!(QUEUE_DEPTH, "Waiting conversations per tenant");
}

/// Record one pipeline result.
pub fn record_handoff_outcome(reason: &str, disposition: &str) {
    metrics::counter!(
        HANDOFF_OUTCOMES,
        "reason" => reason.to_string(),
        "disposition" => disposition.to_string()
    )
    .increment(1);
}

/// Record a persisted conversation transition.
pub fn record_transition(to: &str) {
    metrics::counter!(CONVERSATION_TRANSITIONS, "to" => to.to_string()).increment(1);
}

/// Record a dropped notification.
pub fn record_notification_failure(event_type: &str) {
    metrics::counter!(NOTIFICATIONS_FAILED, "event" => event_type.to_string()).increment(1);
}

/// Record an agent demotion by the presence sweep.
pub fn record_agent_demotion(to: &str) {
    metrics::counter!(AGENT_DEMOTIONS, "to" => to.to_string()).increment(1);
}

/// Record conversations closed by the abandonment sweep.
pub fn record_abandoned(count: u64) {
    metrics::counter!(CONVERSATIONS_ABANDONED).increment(count);
}

/// Set the current queue depth of a tenant.
pub fn set_queue_depth(tenant_id: &str, depth: u32) {
    metrics::gauge!(QUEUE_DEPTH, "tenant" => tenant_id.to_string()).set(f64::from(depth));
}
