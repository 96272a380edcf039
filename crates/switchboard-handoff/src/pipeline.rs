// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Handoff decision pipeline.
//!
//! Three entry points (keyword, low confidence, explicit button) decide
//! whether a handoff fires and then share one flow:
//!
//! 1. business-hours gate, closed means the offline reply;
//! 2. availability gate, nobody online means the unavailable reply;
//! 3. same-agent reassignment when the previous agent is still eligible,
//!    otherwise the FIFO queue.
//!
//! The pipeline never returns an error. Every failure below it becomes a
//! [`Disposition::TechnicalError`] outcome with an apologetic reply and an
//! `error!` log carrying the tenant, visitor and conversation.

use serde::Serialize;
use strum::Display;
use tracing::{debug, error, info, warn};

use switchboard_core::{
    Conversation, ConversationStatus, HandoffReason, HandoffSettings, SwitchboardError,
};

use crate::business_hours::is_within_business_hours;
use crate::service::HandoffService;
use crate::templates::{self, estimated_wait};
use crate::settings::TenantSettings;
use crate::trigger::{HandoffTrigger, RetrievedChunk, max_score};

/// How a handoff request was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// No trigger fired; the automated reply proceeds.
    NotTriggered,
    /// The customer asked, but handoff is off for the tenant.
    Declined,
    /// Outside business hours.
    Offline,
    /// No agents online.
    Unavailable,
    /// Routed straight to the previous agent.
    Assigned,
    /// Placed in (or already in) the queue.
    Queued,
    /// An agent already holds the conversation.
    AlreadyConnected,
    /// Something failed internally; the customer gets an apology.
    TechnicalError,
}

/// Result of every pipeline entry point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandoffOutcome {
    pub triggered: bool,
    pub reason: Option<HandoffReason>,
    pub disposition: Disposition,
    /// Reply to show the customer.
    pub message: Option<String>,
    pub conversation_id: Option<String>,
    pub queue_position: Option<u32>,
    pub estimated_wait: Option<String>,
    pub assigned_agent_id: Option<String>,
    pub trigger_keyword: Option<String>,
}

impl HandoffOutcome {
    pub fn not_triggered() -> Self {
        Self {
            triggered: false,
            reason: None,
            disposition: Disposition::NotTriggered,
            message: None,
            conversation_id: None,
            queue_position: None,
            estimated_wait: None,
            assigned_agent_id: None,
            trigger_keyword: None,
        }
    }

    fn for_trigger(trigger: &HandoffTrigger, disposition: Disposition, message: String) -> Self {
        Self {
            triggered: true,
            reason: Some(trigger.reason()),
            disposition,
            message: Some(message),
            trigger_keyword: trigger.keyword().map(str::to_string),
            ..Self::not_triggered()
        }
    }

    fn with_conversation(mut self, conversation: &Conversation) -> Self {
        self.conversation_id = Some(conversation.id.clone());
        self.assigned_agent_id = conversation.assigned_agent_id.clone();
        self
    }

    fn with_position(mut self, position: u32) -> Self {
        self.queue_position = Some(position);
        self.estimated_wait = Some(estimated_wait(position));
        self
    }
}

impl HandoffService {
    /// Keyword path: does the customer's message ask for a person?
    ///
    /// Keywords are evaluated even for tenants that never configured
    /// handoff, using the default list, so an explicit request always gets
    /// an acknowledgment. A match on a tenant with handoff disabled or
    /// unconfigured is declined without touching any conversation.
    pub async fn check_handoff_trigger(
        &self,
        tenant_id: &str,
        message: &str,
        visitor_id: &str,
        conversation_id: Option<&str>,
    ) -> HandoffOutcome {
        let tenant = match self.settings.get_tenant(self.storage.as_ref(), tenant_id).await {
            Ok(tenant) => tenant,
            Err(e) => {
                let Some(keyword) = self.default_keywords.find(message) else {
                    warn!(tenant_id, error = %e, "settings unavailable, no keyword in message");
                    return HandoffOutcome::not_triggered();
                };
                let trigger = HandoffTrigger::Keyword {
                    keyword: keyword.to_string(),
                };
                error!(
                    tenant_id,
                    visitor_id,
                    conversation_id,
                    error = %e,
                    "failed to load handoff settings"
                );
                return self.technical_error(&trigger, conversation_id);
            }
        };

        let TenantSettings { settings, keywords } = tenant;
        if let Some(settings) = &settings {
            if !settings.keyword_enabled || !settings.trigger_mode.allows_automatic() {
                return HandoffOutcome::not_triggered();
            }
        }

        let matcher = keywords.as_deref().unwrap_or(&self.default_keywords);

        let Some(keyword) = matcher.find(message) else {
            return HandoffOutcome::not_triggered();
        };
        let trigger = HandoffTrigger::Keyword {
            keyword: keyword.to_string(),
        };
        debug!(tenant_id, visitor_id, keyword, "handoff keyword matched");

        match settings {
            Some(settings) if settings.enabled => {
                self.execute_handoff_flow(&settings, trigger, visitor_id, conversation_id)
                    .await
            }
            _ => self.decline(&trigger),
        }
    }

    /// Confidence path: hand off when the best retrieved chunk scores below
    /// the tenant's threshold. Tenants without settings never trigger here.
    pub async fn check_low_confidence_handoff(
        &self,
        tenant_id: &str,
        visitor_id: &str,
        chunks: &[RetrievedChunk],
        conversation_id: Option<&str>,
    ) -> HandoffOutcome {
        let settings = match self.settings_for(tenant_id).await {
            Ok(Some(settings)) => settings,
            Ok(None) => return HandoffOutcome::not_triggered(),
            Err(e) => {
                error!(tenant_id, visitor_id, error = %e, "failed to load handoff settings");
                return HandoffOutcome::not_triggered();
            }
        };

        if !settings.enabled
            || !settings.low_confidence_enabled
            || !settings.trigger_mode.allows_automatic()
        {
            return HandoffOutcome::not_triggered();
        }

        let threshold = if (0.0..=1.0).contains(&settings.low_confidence_threshold) {
            settings.low_confidence_threshold
        } else {
            self.config.default_low_confidence_threshold
        };
        let max_score = max_score(chunks);
        if max_score >= threshold {
            return HandoffOutcome::not_triggered();
        }

        debug!(tenant_id, visitor_id, max_score, threshold, "low confidence handoff");
        self.execute_handoff_flow(
            &settings,
            HandoffTrigger::LowConfidence { max_score },
            visitor_id,
            conversation_id,
        )
        .await
    }

    /// The explicit "talk to a human" button.
    pub async fn request_human(
        &self,
        tenant_id: &str,
        visitor_id: &str,
        conversation_id: Option<&str>,
    ) -> HandoffOutcome {
        let trigger = HandoffTrigger::ButtonClick;
        match self.settings_for(tenant_id).await {
            Ok(Some(settings)) if settings.enabled && settings.trigger_mode.allows_manual() => {
                self.execute_handoff_flow(&settings, trigger, visitor_id, conversation_id)
                    .await
            }
            Ok(_) => self.decline(&trigger),
            Err(e) => {
                error!(
                    tenant_id,
                    visitor_id,
                    conversation_id,
                    error = %e,
                    "failed to load handoff settings"
                );
                self.technical_error(&trigger, conversation_id)
            }
        }
    }

    /// The flow shared by every trigger once it has fired.
    pub async fn execute_handoff_flow(
        &self,
        settings: &HandoffSettings,
        trigger: HandoffTrigger,
        visitor_id: &str,
        conversation_id: Option<&str>,
    ) -> HandoffOutcome {
        match self
            .run_handoff(settings, &trigger, visitor_id, conversation_id)
            .await
        {
            Ok(outcome) => {
                self.record_outcome(&outcome);
                outcome
            }
            Err(e) => {
                error!(
                    tenant_id = %settings.tenant_id,
                    visitor_id,
                    conversation_id,
                    reason = %trigger.reason(),
                    error = %e,
                    "handoff failed"
                );
                self.technical_error(&trigger, conversation_id)
            }
        }
    }

    async fn run_handoff(
        &self,
        settings: &HandoffSettings,
        trigger: &HandoffTrigger,
        visitor_id: &str,
        conversation_id: Option<&str>,
    ) -> Result<HandoffOutcome, SwitchboardError> {
        let templates = trigger.templates();
        let tenant_id = settings.tenant_id.as_str();

        // A customer already with an agent is told so, whatever the gates say.
        let existing = self
            .existing_conversation(tenant_id, visitor_id, conversation_id)
            .await?;
        if let Some(connected) = existing
            .as_ref()
            .filter(|c| c.status == ConversationStatus::AgentActive)
        {
            return Ok(HandoffOutcome::for_trigger(
                trigger,
                Disposition::AlreadyConnected,
                templates.already_connected.to_string(),
            )
            .with_conversation(connected));
        }

        if !is_within_business_hours(settings, self.now())? {
            debug!(tenant_id, "handoff outside business hours");
            return Ok(HandoffOutcome::for_trigger(
                trigger,
                Disposition::Offline,
                templates.offline.to_string(),
            ));
        }

        let availability = self.check_agent_availability(tenant_id).await?;
        if !availability.available {
            debug!(tenant_id, "handoff with no agents online");
            return Ok(HandoffOutcome::for_trigger(
                trigger,
                Disposition::Unavailable,
                templates.unavailable.to_string(),
            ));
        }

        let conversation = match existing {
            Some(conversation) => conversation,
            None => self.create_conversation(tenant_id, visitor_id).await?,
        };

        let reason = trigger.reason();
        if let Some(assigned) = self
            .reassign_to_previous_agent(&conversation, reason, trigger.keyword())
            .await?
        {
            info!(
                conversation_id = %assigned.id,
                agent_id = ?assigned.assigned_agent_id,
                "conversation reassigned to previous agent"
            );
            return Ok(HandoffOutcome::for_trigger(
                trigger,
                Disposition::Assigned,
                templates.direct_assignment.to_string(),
            )
            .with_conversation(&assigned)
            .with_position(1));
        }

        let queued = if conversation.status == ConversationStatus::Waiting {
            conversation
        } else {
            self.enqueue(&conversation, reason, trigger.keyword()).await?
        };
        let position = self.queue_position(&queued).await?.unwrap_or(1);
        info!(conversation_id = %queued.id, position, "conversation queued");

        let wait = estimated_wait(position);
        Ok(HandoffOutcome::for_trigger(
            trigger,
            Disposition::Queued,
            templates.render_queued(position, &wait),
        )
        .with_conversation(&queued)
        .with_position(position))
    }

    /// The conversation to hand off: the one named by the caller if it is
    /// live and belongs to this visitor, else the visitor's active one.
    /// `None` means a fresh conversation is needed.
    async fn existing_conversation(
        &self,
        tenant_id: &str,
        visitor_id: &str,
        conversation_id: Option<&str>,
    ) -> Result<Option<Conversation>, SwitchboardError> {
        if let Some(id) = conversation_id {
            match self.storage.get_conversation(id).await? {
                Some(c)
                    if c.tenant_id == tenant_id
                        && c.visitor_id == visitor_id
                        && !c.status.is_terminal() =>
                {
                    return Ok(Some(c));
                }
                Some(c) => debug!(conversation_id = id, status = %c.status, "ignoring conversation id"),
                None => debug!(conversation_id = id, "conversation id not found"),
            }
        }

        self.storage
            .find_active_conversation(tenant_id, visitor_id)
            .await
    }

    async fn create_conversation(
        &self,
        tenant_id: &str,
        visitor_id: &str,
    ) -> Result<Conversation, SwitchboardError> {
        let conversation = Conversation::new(tenant_id, visitor_id, self.now());
        self.storage.insert_conversation(&conversation).await?;
        info!(conversation_id = %conversation.id, tenant_id, visitor_id, "conversation created");
        Ok(conversation)
    }

    fn decline(&self, trigger: &HandoffTrigger) -> HandoffOutcome {
        let outcome = HandoffOutcome::for_trigger(
            trigger,
            Disposition::Declined,
            templates::DECLINE.to_string(),
        );
        self.record_outcome(&outcome);
        outcome
    }

    fn technical_error(
        &self,
        trigger: &HandoffTrigger,
        conversation_id: Option<&str>,
    ) -> HandoffOutcome {
        let mut outcome = HandoffOutcome::for_trigger(
            trigger,
            Disposition::TechnicalError,
            trigger.templates().technical_error.to_string(),
        );
        outcome.conversation_id = conversation_id.map(str::to_string);
        self.record_outcome(&outcome);
        outcome
    }

    fn record_outcome(&self, outcome: &HandoffOutcome) {
        debug!(
            reason = ?outcome.reason,
            disposition = %outcome.disposition,
            "handoff outcome"
        );
        #[cfg(feature = "prometheus")]
        {
            let reason = outcome
                .reason
                .map(|r| r.to_string())
                .unwrap_or_else(|| "none".to_string());
            switchboard_prometheus::record_handoff_outcome(
                &reason,
                &outcome.disposition.to_string(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use switchboard_core::StorageAdapter;
    use switchboard_test_utils::fixtures::{agent, enabled_settings, monday_at};
    use switchboard_test_utils::{ManualClock, MemoryStorage, RecordingNotifier};
    use tracing_test::traced_test;

    use crate::service::HandoffConfig;

    #[tokio::test]
    #[traced_test]
    async fn storage_failure_is_logged_and_masked() {
        let now = monday_at(10, 0, 0);
        let storage = Arc::new(MemoryStorage::new());
        storage.put_settings(&enabled_settings("t1")).await.unwrap();
        storage.put_agent(agent("t1", "a1", 0, 3, now)).await;
        storage.fail_operation("insert_conversation").await;
        let service = HandoffService::new(
            storage.clone(),
            Arc::new(RecordingNotifier::new()),
            Arc::new(ManualClock::new(now)),
            HandoffConfig::default(),
        )
        .unwrap();

        let outcome = service
            .check_handoff_trigger("t1", "can I talk to a human?", "v1", None)
            .await;

        assert!(outcome.triggered);
        assert_eq!(outcome.disposition, Disposition::TechnicalError);
        assert!(logs_contain("handoff failed"));
        assert!(storage.conversations().await.is_empty());
    }

    #[test]
    fn disposition_strings() {
        assert_eq!(Disposition::AlreadyConnected.to_string(), "already_connected");
        assert_eq!(Disposition::TechnicalError.to_string(), "technical_error");
        assert_eq!(
            serde_json::to_string(&Disposition::NotTriggered).unwrap(),
            "\"not_triggered\""
        );
    }

    #[test]
    fn not_triggered_is_empty() {
        let outcome = HandoffOutcome::not_triggered();
        assert!(!outcome.triggered);
        assert!(outcome.message.is_none());
        assert!(outcome.reason.is_none());
    }

    #[cfg(feature = "prometheus")]
    #[test]
    fn outcomes_reach_the_metrics_recorder() {
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let service = HandoffService::new(
            Arc::new(MemoryStorage::new()),
            Arc::new(RecordingNotifier::new()),
            Arc::new(ManualClock::new(monday_at(10, 0, 0))),
            HandoffConfig::default(),
        )
        .unwrap();
        let outcome = HandoffOutcome::for_trigger(
            &HandoffTrigger::ButtonClick,
            Disposition::Queued,
            "x".into(),
        );

        metrics::with_local_recorder(&recorder, || service.record_outcome(&outcome));

        let rendered = handle.render();
        assert!(rendered.contains("switchboard_handoff_outcomes_total"));
        assert!(rendered.contains("disposition=\"queued\""));
        assert!(rendered.contains("reason=\"button_click\""));
    }

    #[test]
    fn position_sets_wait() {
        let trigger = HandoffTrigger::ButtonClick;
        let outcome =
            HandoffOutcome::for_trigger(&trigger, Disposition::Queued, "x".into()).with_position(3);
        assert_eq!(outcome.queue_position, Some(3));
        assert_eq!(outcome.estimated_wait.as_deref(), Some("about 3 minutes"));
        assert_eq!(outcome.reason, Some(HandoffReason::ButtonClick));
    }
}
