// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end behaviour of the handoff decision pipeline over in-memory storage.

mod common;

use std::sync::Arc;

use common::Harness;
use switchboard_core::{
    ChannelKey, ConversationStatus, EventType, HandoffReason, Presence, StorageAdapter, TriggerMode,
};
use switchboard_handoff::{Disposition, HandoffConfig, HandoffService, RetrievedChunk, templates};
use switchboard_test_utils::fixtures::{
    agent, business_hours_settings, disabled_settings, enabled_settings, monday_at, saturday_at,
};
use switchboard_test_utils::{FailingNotifier, ManualClock, MemoryStorage};

#[tokio::test]
async fn disabled_tenant_declines_keyword_without_mutation() {
    let h = Harness::new();
    h.storage.put_settings(&disabled_settings("t1")).await.unwrap();

    let outcome = h
        .service
        .check_handoff_trigger("t1", "I want to talk to a human", "v1", None)
        .await;

    assert!(outcome.triggered);
    assert_eq!(outcome.reason, Some(HandoffReason::Keyword));
    assert_eq!(outcome.disposition, Disposition::Declined);
    assert_eq!(outcome.message.as_deref(), Some(templates::DECLINE));
    assert_eq!(outcome.trigger_keyword.as_deref(), Some("human"));
    assert!(outcome.conversation_id.is_none());
    assert!(h.storage.conversations().await.is_empty());
}

#[tokio::test]
async fn disabled_tenant_gets_one_decline_for_every_explicit_request() {
    let h = Harness::new();
    h.storage.put_settings(&disabled_settings("t1")).await.unwrap();

    let button = h.service.request_human("t1", "v1", None).await;
    assert_eq!(button.disposition, Disposition::Declined);
    assert_eq!(button.message.as_deref(), Some(templates::DECLINE));

    // The confidence path has nothing to decline: it stays silent.
    let low = h.service.check_low_confidence_handoff("t1", "v1", &[], None).await;
    assert_eq!(low.disposition, Disposition::NotTriggered);
    assert!(low.message.is_none());
    assert!(h.storage.conversations().await.is_empty());
}

#[tokio::test]
async fn unconfigured_tenant_still_detects_default_keywords() {
    let h = Harness::new();

    let outcome = h
        .service
        .check_handoff_trigger("t1", "can I get a real person?", "v1", None)
        .await;
    assert!(outcome.triggered);
    assert_eq!(outcome.disposition, Disposition::Declined);
    assert_eq!(outcome.trigger_keyword.as_deref(), Some("real person"));

    let outcome = h
        .service
        .check_handoff_trigger("t1", "what are your opening hours?", "v1", None)
        .await;
    assert!(!outcome.triggered);
    assert_eq!(outcome.disposition, Disposition::NotTriggered);
    assert!(h.storage.conversations().await.is_empty());
}

#[tokio::test]
async fn keyword_detection_can_be_switched_off() {
    let h = Harness::new();
    let mut settings = enabled_settings("t1");
    settings.keyword_enabled = false;
    h.storage.put_settings(&settings).await.unwrap();

    let outcome = h
        .service
        .check_handoff_trigger("t1", "human please", "v1", None)
        .await;
    assert!(!outcome.triggered);
}

#[tokio::test]
async fn manual_mode_only_honours_the_button() {
    let h = Harness::new();
    let mut settings = enabled_settings("t1");
    settings.trigger_mode = TriggerMode::Manual;
    h.storage.put_settings(&settings).await.unwrap();
    h.storage.put_agent(agent("t1", "a1", 0, 3, monday_at(9, 59, 0))).await;

    let keyword = h
        .service
        .check_handoff_trigger("t1", "human please", "v1", None)
        .await;
    assert!(!keyword.triggered);

    let button = h.service.request_human("t1", "v1", None).await;
    assert!(button.triggered);
    assert_eq!(button.reason, Some(HandoffReason::ButtonClick));
    assert_eq!(button.disposition, Disposition::Queued);
}

#[tokio::test]
async fn tenant_keywords_replace_defaults() {
    let h = Harness::new();
    let mut settings = enabled_settings("t1");
    settings.keywords = vec!["escalate".to_string()];
    h.storage.put_settings(&settings).await.unwrap();
    h.storage.put_agent(agent("t1", "a1", 0, 3, monday_at(9, 59, 0))).await;

    let miss = h
        .service
        .check_handoff_trigger("t1", "human please", "v1", None)
        .await;
    assert!(!miss.triggered);

    let hit = h
        .service
        .check_handoff_trigger("t1", "please ESCALATE this", "v1", None)
        .await;
    assert_eq!(hit.disposition, Disposition::Queued);
    assert_eq!(hit.trigger_keyword.as_deref(), Some("escalate"));
}

#[tokio::test]
async fn outside_business_hours_replies_offline() {
    let h = Harness::starting_at(saturday_at(12, 0, 0));
    h.storage
        .put_settings(&business_hours_settings("t1", "UTC"))
        .await
        .unwrap();
    h.storage.put_agent(agent("t1", "a1", 0, 3, saturday_at(11, 59, 0))).await;

    let outcome = h
        .service
        .check_handoff_trigger("t1", "talk to a human", "v1", None)
        .await;
    assert_eq!(outcome.disposition, Disposition::Offline);
    assert_eq!(outcome.message.as_deref(), Some(templates::KEYWORD.offline));
    assert!(h.storage.conversations().await.is_empty());
}

#[tokio::test]
async fn no_agents_online_replies_unavailable() {
    let h = Harness::new();
    h.storage.put_settings(&enabled_settings("t1")).await.unwrap();

    let outcome = h.service.request_human("t1", "v1", None).await;
    assert_eq!(outcome.disposition, Disposition::Unavailable);
    assert_eq!(outcome.message.as_deref(), Some(templates::KEYWORD.unavailable));
    assert!(h.storage.conversations().await.is_empty());
}

#[tokio::test]
async fn queue_positions_follow_entry_order() {
    let h = Harness::new();
    h.storage.put_settings(&enabled_settings("t1")).await.unwrap();
    // Online but saturated: requests queue instead of being refused.
    h.storage.put_agent(agent("t1", "a1", 3, 3, monday_at(9, 59, 0))).await;

    let first = h.service.request_human("t1", "v1", None).await;
    h.advance_secs(30);
    let second = h.service.request_human("t1", "v2", None).await;

    assert_eq!(first.disposition, Disposition::Queued);
    assert_eq!(first.queue_position, Some(1));
    assert_eq!(first.estimated_wait.as_deref(), Some("less than a minute"));
    assert_eq!(second.queue_position, Some(2));
    assert_eq!(second.estimated_wait.as_deref(), Some("about 2 minutes"));
    assert!(second.message.unwrap().contains("number 2 in line"));

    let first_id = first.conversation_id.unwrap();
    let second_id = second.conversation_id.unwrap();
    let queued = h.conversation(&second_id).await;
    assert_eq!(h.service.queue_position(&queued).await.unwrap(), Some(2));

    h.service.return_to_ai(&first_id).await.unwrap();
    assert_eq!(h.service.queue_position(&queued).await.unwrap(), Some(1));

    let snapshot = h.service.queue_snapshot("t1").await.unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].conversation_id, second_id);
    assert_eq!(snapshot[0].position, 1);
}

#[tokio::test]
async fn leaving_the_queue_republishes_positions() {
    let h = Harness::new();
    h.storage.put_settings(&enabled_settings("t1")).await.unwrap();
    h.storage.put_agent(agent("t1", "a1", 3, 3, monday_at(9, 59, 0))).await;

    let first = h.service.request_human("t1", "v1", None).await;
    h.advance_secs(30);
    let second = h.service.request_human("t1", "v2", None).await;
    let second_channel = ChannelKey::Conversation(second.conversation_id.clone().unwrap());
    h.notifier.settle().await;
    h.notifier.clear().await;

    h.service
        .resolve(first.conversation_id.as_deref().unwrap())
        .await
        .unwrap();
    h.notifier.settle().await;

    let positions: Vec<_> = h
        .notifier
        .on_channel(&second_channel)
        .await
        .into_iter()
        .filter(|n| n.event_type == EventType::QueuePosition)
        .collect();
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].payload["position"], 1);

    let depth = h.notifier.of_type(EventType::QueueUpdated).await;
    assert_eq!(depth.last().unwrap().1.payload["depth"], 1);
}

#[tokio::test]
async fn returning_conversation_goes_straight_to_available_previous_agent() {
    let h = Harness::new();
    h.storage.put_settings(&enabled_settings("t1")).await.unwrap();
    h.storage.put_agent(agent("t1", "a1", 1, 3, monday_at(9, 59, 0))).await;
    h.returning_conversation("c1", "t1", "v1", "a1").await;

    let outcome = h
        .service
        .check_handoff_trigger("t1", "can I talk to a human again", "v1", Some("c1"))
        .await;

    assert_eq!(outcome.disposition, Disposition::Assigned);
    assert_eq!(outcome.assigned_agent_id.as_deref(), Some("a1"));
    assert_eq!(outcome.queue_position, Some(1));
    assert_eq!(outcome.estimated_wait.as_deref(), Some("less than a minute"));
    assert_eq!(outcome.message.as_deref(), Some(templates::KEYWORD.direct_assignment));

    let conversation = h.conversation("c1").await;
    assert_eq!(conversation.status, ConversationStatus::AgentActive);
    assert_eq!(conversation.assigned_agent_id.as_deref(), Some("a1"));
    assert!(conversation.queue_entered_at.is_none());
    assert!(conversation.claimed_at.is_some());

    let agent = h.storage.get_agent("t1", "a1").await.unwrap().unwrap();
    assert_eq!(agent.current_chat_count, 2);

    // The only status change went straight to agent_active.
    let changes: Vec<_> = h
        .notifier
        .settle()
        .await
        .into_iter()
        .filter(|(_, n)| n.event_type == EventType::ConversationStatusChanged)
        .collect();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].1.payload["from"], "ai_active");
    assert_eq!(changes[0].1.payload["to"], "agent_active");
    assert!(h.notifier.of_type(EventType::HandoffRequested).await.is_empty());
}

#[tokio::test]
async fn returning_conversation_queues_when_previous_agent_is_offline() {
    let h = Harness::new();
    h.storage.put_settings(&enabled_settings("t1")).await.unwrap();
    let mut previous = agent("t1", "a1", 0, 3, monday_at(9, 0, 0));
    previous.status = Presence::Offline;
    h.storage.put_agent(previous).await;
    h.storage.put_agent(agent("t1", "a2", 0, 3, monday_at(9, 59, 0))).await;
    h.returning_conversation("c1", "t1", "v1", "a1").await;

    let outcome = h.service.request_human("t1", "v1", Some("c1")).await;

    assert_eq!(outcome.disposition, Disposition::Queued);
    assert_eq!(outcome.queue_position, Some(1));
    assert!(outcome.assigned_agent_id.is_none());

    let conversation = h.conversation("c1").await;
    assert_eq!(conversation.status, ConversationStatus::Waiting);
    assert!(conversation.assigned_agent_id.is_none());
    assert!(conversation.queue_entered_at.is_some());
    assert_eq!(conversation.handoff_reason, Some(HandoffReason::ButtonClick));

    let requested = h.notifier.settle().await;
    assert!(
        requested
            .iter()
            .any(|(c, n)| n.event_type == EventType::HandoffRequested
                && *c == ChannelKey::TenantAgents("t1".into()))
    );
}

#[tokio::test]
async fn previous_agent_at_capacity_is_not_overbooked() {
    let h = Harness::new();
    h.storage.put_settings(&enabled_settings("t1")).await.unwrap();
    h.storage.put_agent(agent("t1", "a1", 2, 2, monday_at(9, 59, 0))).await;
    h.returning_conversation("c1", "t1", "v1", "a1").await;

    let outcome = h.service.request_human("t1", "v1", Some("c1")).await;
    assert_eq!(outcome.disposition, Disposition::Queued);
    let agent = h.storage.get_agent("t1", "a1").await.unwrap().unwrap();
    assert_eq!(agent.current_chat_count, 2);
}

#[tokio::test]
async fn retrigger_while_waiting_keeps_queue_entry_time() {
    let h = Harness::new();
    h.storage.put_settings(&enabled_settings("t1")).await.unwrap();
    h.storage.put_agent(agent("t1", "a1", 3, 3, monday_at(9, 59, 0))).await;

    let first = h.service.request_human("t1", "v1", None).await;
    let id = first.conversation_id.unwrap();
    let entered = h.conversation(&id).await.queue_entered_at;

    h.advance_secs(120);
    let again = h
        .service
        .check_handoff_trigger("t1", "HUMAN!!", "v1", Some(id.as_str()))
        .await;
    assert_eq!(again.disposition, Disposition::Queued);
    assert_eq!(again.conversation_id.as_deref(), Some(id.as_str()));
    assert_eq!(again.queue_position, Some(1));
    assert_eq!(h.conversation(&id).await.queue_entered_at, entered);
    assert_eq!(h.storage.conversations().await.len(), 1);
}

#[tokio::test]
async fn retrigger_while_connected_reports_already_connected() {
    let h = Harness::new();
    h.storage.put_settings(&enabled_settings("t1")).await.unwrap();
    h.storage.put_agent(agent("t1", "a1", 0, 3, monday_at(9, 59, 0))).await;

    let queued = h.service.request_human("t1", "v1", None).await;
    let id = queued.conversation_id.unwrap();
    h.service.claim(&id, "a1").await.unwrap();

    let again = h.service.request_human("t1", "v1", None).await;
    assert_eq!(again.disposition, Disposition::AlreadyConnected);
    assert_eq!(again.assigned_agent_id.as_deref(), Some("a1"));
    assert_eq!(h.storage.get_agent("t1", "a1").await.unwrap().unwrap().current_chat_count, 1);
}

#[tokio::test]
async fn connected_customer_skips_the_gates() {
    let h = Harness::new();
    h.storage
        .put_settings(&business_hours_settings("t1", "UTC"))
        .await
        .unwrap();
    h.storage.put_agent(agent("t1", "a1", 0, 3, monday_at(9, 59, 0))).await;

    let queued = h.service.request_human("t1", "v1", None).await;
    let id = queued.conversation_id.unwrap();
    h.service.claim(&id, "a1").await.unwrap();

    // After closing time the agent logs off, still mid-conversation.
    h.advance_secs(8 * 3600);
    h.service
        .set_agent_status("t1", "a1", Presence::Offline)
        .await
        .unwrap();

    let again = h
        .service
        .check_handoff_trigger("t1", "human please", "v1", Some(id.as_str()))
        .await;
    assert_eq!(again.disposition, Disposition::AlreadyConnected);
    assert_eq!(again.conversation_id.as_deref(), Some(id.as_str()));
    assert_eq!(again.message.as_deref(), Some(templates::KEYWORD.already_connected));
    assert_eq!(h.conversation(&id).await.status, ConversationStatus::AgentActive);

    // A different visitor still hits the closed gate.
    let other = h.service.request_human("t1", "v2", None).await;
    assert_eq!(other.disposition, Disposition::Offline);
    assert_eq!(h.storage.conversations().await.len(), 1);
}

#[tokio::test]
async fn terminal_conversation_id_starts_a_fresh_conversation() {
    let h = Harness::new();
    h.storage.put_settings(&enabled_settings("t1")).await.unwrap();
    h.storage.put_agent(agent("t1", "a1", 3, 3, monday_at(9, 59, 0))).await;
    h.returning_conversation("old", "t1", "v1", "a9").await;
    h.service.close("old").await.unwrap();

    let outcome = h.service.request_human("t1", "v1", Some("old")).await;
    assert_eq!(outcome.disposition, Disposition::Queued);
    assert_ne!(outcome.conversation_id.as_deref(), Some("old"));
    assert_eq!(h.conversation("old").await.status, ConversationStatus::Closed);
}

#[tokio::test]
async fn low_confidence_triggers_below_threshold() {
    let h = Harness::new();
    h.storage.put_settings(&enabled_settings("t1")).await.unwrap();
    h.storage.put_agent(agent("t1", "a1", 0, 3, monday_at(9, 59, 0))).await;

    let confident = [RetrievedChunk { combined_score: 0.8 }, RetrievedChunk { combined_score: 0.2 }];
    let outcome = h
        .service
        .check_low_confidence_handoff("t1", "v1", &confident, None)
        .await;
    assert!(!outcome.triggered);

    let boundary = [RetrievedChunk { combined_score: 0.35 }];
    let outcome = h
        .service
        .check_low_confidence_handoff("t1", "v1", &boundary, None)
        .await;
    assert!(!outcome.triggered);

    let weak = [RetrievedChunk { combined_score: 0.1 }];
    let outcome = h.service.check_low_confidence_handoff("t1", "v1", &weak, None).await;
    assert!(outcome.triggered);
    assert_eq!(outcome.reason, Some(HandoffReason::LowConfidence));
    assert_eq!(outcome.disposition, Disposition::Queued);
    assert!(outcome.message.unwrap().starts_with("I'm not confident"));
}

#[tokio::test]
async fn empty_retrieval_counts_as_zero_confidence() {
    let h = Harness::new();
    h.storage.put_settings(&enabled_settings("t1")).await.unwrap();

    let outcome = h.service.check_low_confidence_handoff("t1", "v1", &[], None).await;
    assert!(outcome.triggered);
    assert_eq!(outcome.disposition, Disposition::Unavailable);
    assert_eq!(outcome.message.as_deref(), Some(templates::LOW_CONFIDENCE.unavailable));
}

#[tokio::test]
async fn low_confidence_needs_configured_and_enabled_tenant() {
    let h = Harness::new();
    let outcome = h.service.check_low_confidence_handoff("t1", "v1", &[], None).await;
    assert!(!outcome.triggered);

    h.storage.put_settings(&disabled_settings("t1")).await.unwrap();
    h.service.settings_cache().invalidate("t1");
    let outcome = h.service.check_low_confidence_handoff("t1", "v1", &[], None).await;
    assert!(!outcome.triggered);

    let mut settings = enabled_settings("t1");
    settings.low_confidence_enabled = false;
    h.storage.put_settings(&settings).await.unwrap();
    h.service.settings_cache().invalidate("t1");
    let outcome = h.service.check_low_confidence_handoff("t1", "v1", &[], None).await;
    assert!(!outcome.triggered);
}

#[tokio::test]
async fn store_failure_becomes_technical_error() {
    let h = Harness::new();
    h.storage.put_settings(&enabled_settings("t1")).await.unwrap();
    h.storage.put_agent(agent("t1", "a1", 0, 3, monday_at(9, 59, 0))).await;
    h.storage.fail_operation("insert_conversation").await;

    let outcome = h
        .service
        .check_handoff_trigger("t1", "get me a human", "v1", None)
        .await;
    assert!(outcome.triggered);
    assert_eq!(outcome.disposition, Disposition::TechnicalError);
    assert_eq!(outcome.message.as_deref(), Some(templates::KEYWORD.technical_error));
}

#[tokio::test]
async fn settings_failure_on_button_becomes_technical_error() {
    let h = Harness::new();
    h.storage.fail_operation("get_settings").await;
    let outcome = h.service.request_human("t1", "v1", None).await;
    assert_eq!(outcome.disposition, Disposition::TechnicalError);
}

#[tokio::test]
async fn malformed_timezone_becomes_technical_error() {
    let h = Harness::new();
    let mut settings = business_hours_settings("t1", "Not/AZone");
    settings.enabled = true;
    h.storage.put_settings(&settings).await.unwrap();

    let outcome = h.service.request_human("t1", "v1", None).await;
    assert_eq!(outcome.disposition, Disposition::TechnicalError);
}

#[tokio::test]
async fn notification_failures_do_not_affect_the_outcome() {
    let storage = Arc::new(MemoryStorage::new());
    let notifier = FailingNotifier::new();
    let service = HandoffService::new(
        storage.clone(),
        Arc::new(notifier.clone()),
        Arc::new(ManualClock::new(monday_at(10, 0, 0))),
        HandoffConfig::default(),
    )
    .unwrap();
    storage.put_settings(&enabled_settings("t1")).await.unwrap();
    storage.put_agent(agent("t1", "a1", 0, 3, monday_at(9, 59, 0))).await;

    let outcome = service.request_human("t1", "v1", None).await;
    assert_eq!(outcome.disposition, Disposition::Queued);

    for _ in 0..100 {
        if notifier.attempts() > 0 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    assert!(notifier.attempts() > 0);
}
