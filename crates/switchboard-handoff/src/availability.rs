// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent availability gate.

use switchboard_core::SwitchboardError;

use crate::service::HandoffService;

/// Result of [`HandoffService::check_agent_availability`].
///
/// `available` means agents are online, not that one is free: when every
/// online agent is saturated it is still `true` and `queue_position` points
/// past the current queue. Use [`can_assign_now`](Self::can_assign_now) to
/// ask whether a slot is open right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentAvailabilityCheck {
    pub available: bool,
    pub queue_position: Option<u32>,
    pub online_agents: usize,
    pub eligible_agents: usize,
}

impl AgentAvailabilityCheck {
    pub fn can_assign_now(&self) -> bool {
        self.eligible_agents > 0
    }
}

impl HandoffService {
    pub async fn check_agent_availability(
        &self,
        tenant_id: &str,
    ) -> Result<AgentAvailabilityCheck, SwitchboardError> {
        let online = self.storage.list_online_agents(tenant_id).await?;
        let eligible = online.iter().filter(|a| a.has_capacity()).count();

        let queue_position = if online.is_empty() {
            None
        } else if eligible > 0 {
            Some(1)
        } else {
            Some(self.storage.count_waiting(tenant_id).await? + 1)
        };

        Ok(AgentAvailabilityCheck {
            available: !online.is_empty(),
            queue_position,
            online_agents: online.len(),
            eligible_agents: eligible,
        })
    }
}
