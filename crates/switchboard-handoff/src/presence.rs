// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Customer and agent presence.
//!
//! Customer presence is derived from `customer_last_seen_at` at read time.
//! Agent presence is driven by heartbeats and decays through a periodic
//! sweep. Every sweep write is conditional on the row still looking the way
//! the sweep observed it, so a heartbeat landing mid-sweep always wins and
//! any number of instances can sweep at once.

use chrono::{DateTime, Utc};
use serde_json::json;
use strum::Display;
use tracing::{debug, info, warn};

use switchboard_config::model::PresenceConfig;
use switchboard_core::{
    AgentAvailability, AgentTransition, ChannelKey, EventType, Presence, SwitchboardError,
};

use crate::service::{HandoffService, seconds};

/// Age thresholds for presence decay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceThresholds {
    pub customer_away: chrono::Duration,
    pub customer_offline: chrono::Duration,
    pub agent_away: chrono::Duration,
    pub agent_offline: chrono::Duration,
}

impl PresenceThresholds {
    pub fn from_config(config: &PresenceConfig) -> Self {
        Self {
            customer_away: seconds(config.customer_away_secs),
            customer_offline: seconds(config.customer_offline_secs),
            agent_away: seconds(config.agent_away_secs),
            agent_offline: seconds(config.agent_offline_secs),
        }
    }
}

impl Default for PresenceThresholds {
    fn default() -> Self {
        Self::from_config(&PresenceConfig::default())
    }
}

/// Customer presence for a last-activity timestamp.
///
/// `online` below the away threshold, `away` below the offline threshold,
/// `offline` otherwise.
pub fn customer_presence(
    last_seen_at: DateTime<Utc>,
    now: DateTime<Utc>,
    thresholds: &PresenceThresholds,
) -> Presence {
    let age = now.signed_duration_since(last_seen_at);
    if age < thresholds.customer_away {
        Presence::Online
    } else if age < thresholds.customer_offline {
        Presence::Away
    } else {
        Presence::Offline
    }
}

/// The status a stale agent should drop to, if any.
///
/// Any non-offline agent past the offline threshold goes offline; an online
/// agent past the away threshold goes away. Ages are compared strictly.
pub fn agent_demotion(
    agent: &AgentAvailability,
    now: DateTime<Utc>,
    thresholds: &PresenceThresholds,
) -> Option<Presence> {
    let age = now.signed_duration_since(agent.last_seen_at);
    match agent.status {
        Presence::Offline => None,
        _ if age > thresholds.agent_offline => Some(Presence::Offline),
        Presence::Online if age > thresholds.agent_away => Some(Presence::Away),
        _ => None,
    }
}

/// What the customer did to prove they are still there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum CustomerActivity {
    Message,
    Typing,
    Ping,
}

/// Tally from one agent sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentSweepReport {
    pub examined: usize,
    pub demoted_away: usize,
    pub demoted_offline: usize,
    /// Demotions skipped because the row changed under the sweep.
    pub lost_races: usize,
    pub failed: usize,
}

/// Tally from one abandonment sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AbandonmentReport {
    pub examined: usize,
    pub closed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl HandoffService {
    /// Record customer activity: refresh `customer_last_seen_at` and mark online.
    ///
    /// Publishes `customer_presence` when the derived presence was not
    /// already online.
    pub async fn touch_customer(
        &self,
        conversation_id: &str,
        activity: CustomerActivity,
    ) -> Result<Presence, SwitchboardError> {
        let conversation = self.conversation(conversation_id).await?;
        let now = self.now();
        let previous =
            customer_presence(conversation.customer_last_seen_at, now, &self.config.presence);

        self.storage
            .update_customer_presence(conversation_id, Presence::Online, Some(now))
            .await?;

        if previous != Presence::Online {
            debug!(conversation_id, %previous, %activity, "customer back online");
            self.publish(
                ChannelKey::Conversation(conversation_id.to_string()),
                EventType::CustomerPresence,
                json!({
                    "conversation_id": conversation_id,
                    "presence": Presence::Online,
                    "previous": previous,
                    "activity": activity.to_string(),
                }),
            );
        }
        Ok(Presence::Online)
    }

    /// Recompute a customer's presence from their last activity and persist
    /// it when it differs from the stored value.
    pub async fn refresh_customer_presence(
        &self,
        conversation_id: &str,
    ) -> Result<Presence, SwitchboardError> {
        let conversation = self.conversation(conversation_id).await?;
        let derived =
            customer_presence(conversation.customer_last_seen_at, self.now(), &self.config.presence);

        if derived != conversation.customer_presence {
            self.storage
                .update_customer_presence(conversation_id, derived, None)
                .await?;
            self.publish(
                ChannelKey::Conversation(conversation_id.to_string()),
                EventType::CustomerPresence,
                json!({
                    "conversation_id": conversation_id,
                    "presence": derived,
                    "previous": conversation.customer_presence,
                }),
            );
        }
        Ok(derived)
    }

    /// Agent heartbeat.
    ///
    /// Creates the availability record on first contact, with the tenant's
    /// configured capacity. An away or offline agent is promoted to online.
    pub async fn agent_heartbeat(
        &self,
        tenant_id: &str,
        agent_id: &str,
    ) -> Result<AgentAvailability, SwitchboardError> {
        let now = self.now();

        let existing = match self.storage.get_agent(tenant_id, agent_id).await? {
            Some(agent) => Some(agent),
            None => {
                let capacity = self
                    .settings_for(tenant_id)
                    .await?
                    .map(|s| s.max_concurrent_chats)
                    .unwrap_or(self.config.default_max_concurrent_chats);
                let record = AgentAvailability::online(tenant_id, agent_id, capacity, now);
                if self.storage.insert_agent(&record).await? {
                    info!(tenant_id, agent_id, capacity, "agent first online");
                    self.publish_agent_status(tenant_id, agent_id, Presence::Offline, Presence::Online, "heartbeat");
                    return Ok(record);
                }
                // Another instance created it first.
                self.storage.get_agent(tenant_id, agent_id).await?
            }
        };

        match existing {
            Some(agent) if agent.status == Presence::Online => {
                self.storage.touch_agent(tenant_id, agent_id, now).await?;
            }
            Some(agent) => {
                self.storage
                    .set_agent_status(tenant_id, agent_id, Presence::Online, now, false)
                    .await?;
                info!(tenant_id, agent_id, from = %agent.status, "agent back online");
                self.publish_agent_status(tenant_id, agent_id, agent.status, Presence::Online, "heartbeat");
            }
            None => {}
        }

        self.agent(tenant_id, agent_id).await
    }

    /// Explicit status change by the agent. Going offline frees every slot.
    pub async fn set_agent_status(
        &self,
        tenant_id: &str,
        agent_id: &str,
        status: Presence,
    ) -> Result<AgentAvailability, SwitchboardError> {
        let current = self.agent(tenant_id, agent_id).await?;
        let reset = status == Presence::Offline;
        self.storage
            .set_agent_status(tenant_id, agent_id, status, self.now(), reset)
            .await?;

        if current.status != status {
            info!(tenant_id, agent_id, from = %current.status, to = %status, "agent status set");
            self.publish_agent_status(tenant_id, agent_id, current.status, status, "manual");
        }
        self.agent(tenant_id, agent_id).await
    }

    /// Demote agents whose heartbeat has gone stale.
    pub async fn sweep_agents(&self) -> Result<AgentSweepReport, SwitchboardError> {
        let now = self.now();
        let agents = self.storage.list_present_agents().await?;
        let mut report = AgentSweepReport {
            examined: agents.len(),
            ..Default::default()
        };

        for agent in agents {
            let Some(to) = agent_demotion(&agent, now, &self.config.presence) else {
                continue;
            };
            let transition = AgentTransition {
                tenant_id: agent.tenant_id.clone(),
                agent_id: agent.agent_id.clone(),
                from: agent.status,
                to,
                observed_last_seen_at: agent.last_seen_at,
                at: now,
                reset_chat_count: to == Presence::Offline,
            };

            match self.storage.transition_agent_if(&transition).await {
                Ok(true) => {
                    match to {
                        Presence::Offline => report.demoted_offline += 1,
                        _ => report.demoted_away += 1,
                    }
                    #[cfg(feature = "prometheus")]
                    switchboard_prometheus::record_agent_demotion(&to.to_string());
                    info!(
                        tenant_id = %agent.tenant_id,
                        agent_id = %agent.agent_id,
                        from = %agent.status,
                        to = %to,
                        "agent demoted after heartbeat timeout"
                    );
                    self.publish_agent_status(
                        &agent.tenant_id,
                        &agent.agent_id,
                        agent.status,
                        to,
                        "heartbeat_timeout",
                    );
                }
                Ok(false) => {
                    report.lost_races += 1;
                    debug!(agent_id = %agent.agent_id, "agent changed during sweep, skipped");
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(agent_id = %agent.agent_id, error = %e, "agent demotion failed");
                }
            }
        }

        Ok(report)
    }

    /// Close every non-terminal conversation whose customer has been idle
    /// past the abandonment threshold.
    pub async fn sweep_abandoned_conversations(
        &self,
    ) -> Result<AbandonmentReport, SwitchboardError> {
        let cutoff = self.now() - self.config.abandonment_threshold;
        let stale = self.storage.list_stale_conversations(cutoff).await?;
        let mut report = AbandonmentReport {
            examined: stale.len(),
            ..Default::default()
        };

        for conversation in stale {
            match self.abandon(&conversation).await {
                Ok(true) => report.closed += 1,
                Ok(false) => report.skipped += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(conversation_id = %conversation.id, error = %e, "abandonment failed");
                }
            }
        }

        if report.closed > 0 {
            #[cfg(feature = "prometheus")]
            switchboard_prometheus::record_abandoned(report.closed as u64);
            info!(closed = report.closed, "abandoned conversations closed");
        }
        Ok(report)
    }

    /// Load an agent record or fail with `NotFound`.
    pub async fn agent(
        &self,
        tenant_id: &str,
        agent_id: &str,
    ) -> Result<AgentAvailability, SwitchboardError> {
        self.storage
            .get_agent(tenant_id, agent_id)
            .await?
            .ok_or_else(|| SwitchboardError::NotFound {
                entity: "agent",
                id: format!("{tenant_id}/{agent_id}"),
            })
    }

    fn publish_agent_status(
        &self,
        tenant_id: &str,
        agent_id: &str,
        from: Presence,
        to: Presence,
        cause: &str,
    ) {
        self.publish_all(
            [
                ChannelKey::TenantAgents(tenant_id.to_string()),
                ChannelKey::Agent(agent_id.to_string()),
            ],
            EventType::AgentStatusChanged,
            json!({
                "tenant_id": tenant_id,
                "agent_id": agent_id,
                "from": from,
                "to": to,
                "cause": cause,
            }),
        );
    }
}
