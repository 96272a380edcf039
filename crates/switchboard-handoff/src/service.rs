// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The [`HandoffService`] facade and its configuration.
//!
//! Operations live in the sibling modules as `impl HandoffService` blocks:
//! the decision pipeline in [`pipeline`](crate::pipeline), transitions in
//! [`state`](crate::state), presence and sweeps in
//! [`presence`](crate::presence), queue views in [`queue`](crate::queue).

use std::sync::Arc;
use std::time::Duration;

use chrono::DateTime;
use chrono::Utc;
use tracing::info;

use switchboard_bus::Dispatcher;
use switchboard_config::model::SwitchboardConfig;
use switchboard_core::{
    ChannelKey, Clock, Conversation, EventType, HandoffSettings, Notification,
    NotificationAdapter, StorageAdapter, SwitchboardError,
};

use crate::business_hours::validate_schedule;
use crate::presence::PresenceThresholds;
use crate::settings::SettingsCache;
use crate::trigger::KeywordMatcher;

/// Runtime knobs for the handoff core, derived from [`SwitchboardConfig`].
#[derive(Debug, Clone)]
pub struct HandoffConfig {
    pub presence: PresenceThresholds,
    /// Idle time after which a non-terminal conversation is closed.
    pub abandonment_threshold: chrono::Duration,
    /// System message appended to abandoned conversations.
    pub abandonment_message: String,
    pub settings_ttl: Duration,
    /// Keywords used when a tenant has no settings or an empty list.
    pub default_keywords: Vec<String>,
    /// Capacity for agents first seen in a tenant without settings.
    pub default_max_concurrent_chats: u32,
    /// Fallback when a tenant's stored threshold is outside `[0, 1]`.
    pub default_low_confidence_threshold: f64,
}

impl HandoffConfig {
    pub fn from_config(config: &SwitchboardConfig) -> Self {
        Self {
            presence: PresenceThresholds::from_config(&config.presence),
            abandonment_threshold: seconds(config.abandonment.threshold_secs),
            abandonment_message: config.abandonment.system_message.clone(),
            settings_ttl: Duration::from_secs(config.settings_cache.ttl_secs),
            default_keywords: config.handoff.default_keywords.clone(),
            default_max_concurrent_chats: config.handoff.default_max_concurrent_chats,
            default_low_confidence_threshold: config.handoff.default_low_confidence_threshold,
        }
    }
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self::from_config(&SwitchboardConfig::default())
    }
}

/// Whole seconds as a signed duration, saturating on overflow.
pub(crate) fn seconds(secs: u64) -> chrono::Duration {
    i64::try_from(secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .unwrap_or(chrono::Duration::MAX)
}

/// Entry point for every handoff, presence and queue operation.
///
/// One instance per process. Several instances may share a store: every
/// write goes through a conditional update, so a lost race surfaces as
/// [`SwitchboardError::Conflict`] rather than a silent overwrite.
pub struct HandoffService {
    pub(crate) storage: Arc<dyn StorageAdapter>,
    pub(crate) dispatcher: Dispatcher,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) settings: SettingsCache,
    pub(crate) config: HandoffConfig,
    pub(crate) default_keywords: KeywordMatcher,
}

impl HandoffService {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        notifier: Arc<dyn NotificationAdapter>,
        clock: Arc<dyn Clock>,
        config: HandoffConfig,
    ) -> Result<Self, SwitchboardError> {
        let default_keywords = KeywordMatcher::new(&config.default_keywords)?;
        let settings = SettingsCache::new(config.settings_ttl, Arc::clone(&clock));
        info!(
            notifier = notifier.name(),
            storage = storage.name(),
            "handoff service initialized"
        );
        Ok(Self {
            storage,
            dispatcher: Dispatcher::new(notifier),
            clock,
            settings,
            config,
            default_keywords,
        })
    }

    pub fn config(&self) -> &HandoffConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn StorageAdapter> {
        &self.storage
    }

    pub fn settings_cache(&self) -> &SettingsCache {
        &self.settings
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Tenant settings through the TTL cache. `None` when never configured.
    pub async fn settings_for(
        &self,
        tenant_id: &str,
    ) -> Result<Option<HandoffSettings>, SwitchboardError> {
        self.settings.get(self.storage.as_ref(), tenant_id).await
    }

    /// Validate and persist a tenant's settings, then drop the cached copy.
    pub async fn update_settings(&self, settings: &HandoffSettings) -> Result<(), SwitchboardError> {
        validate_schedule(settings)?;
        if !(0.0..=1.0).contains(&settings.low_confidence_threshold) {
            return Err(SwitchboardError::Config(format!(
                "low_confidence_threshold must be within [0, 1], got {}",
                settings.low_confidence_threshold
            )));
        }
        if settings.max_concurrent_chats == 0 {
            return Err(SwitchboardError::Config(
                "max_concurrent_chats must be at least 1".to_string(),
            ));
        }
        self.storage.put_settings(settings).await?;
        self.settings.invalidate(&settings.tenant_id);
        info!(tenant_id = %settings.tenant_id, "handoff settings updated");
        Ok(())
    }

    /// Load a conversation or fail with `NotFound`.
    pub async fn conversation(&self, id: &str) -> Result<Conversation, SwitchboardError> {
        self.storage
            .get_conversation(id)
            .await?
            .ok_or_else(|| SwitchboardError::NotFound {
                entity: "conversation",
                id: id.to_string(),
            })
    }

    /// Best-effort publish; never awaited.
    pub(crate) fn publish(
        &self,
        channel: ChannelKey,
        event_type: EventType,
        payload: serde_json::Value,
    ) {
        let notification = Notification::new(event_type, payload, self.now());
        self.dispatcher.dispatch(channel, notification);
    }

    /// Wait until every notification dispatched so far has been attempted.
    pub async fn flush_notifications(&self) {
        self.dispatcher.flush().await;
    }

    pub(crate) fn publish_all(
        &self,
        channels: impl IntoIterator<Item = ChannelKey>,
        event_type: EventType,
        payload: serde_json::Value,
    ) {
        let notification = Notification::new(event_type, payload, self.now());
        self.dispatcher.dispatch_all(channels, notification);
    }
}
