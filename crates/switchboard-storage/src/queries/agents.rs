// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent availability queries, including the atomic slot claim.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};
use switchboard_core::types::{AgentAvailability, Presence};
use switchboard_core::{AgentTransition, SwitchboardError};

use super::{get_enum, get_ts, get_ts_opt, ts, ts_opt};
use crate::database::{map_tr_err, Database};

const COLUMNS: &str = "tenant_id, agent_id, status, current_chat_count, max_concurrent_chats, \
     last_seen_at, status_changed_at, last_assigned_at";

fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AgentAvailability> {
    Ok(AgentAvailability {
        tenant_id: row.get(0)?,
        agent_id: row.get(1)?,
        status: get_enum(row, 2)?,
        current_chat_count: row.get(3)?,
        max_concurrent_chats: row.get(4)?,
        last_seen_at: get_ts(row, 5)?,
        status_changed_at: get_ts(row, 6)?,
        last_assigned_at: get_ts_opt(row, 7)?,
    })
}

pub async fn get_agent(
    db: &Database,
    tenant_id: &str,
    agent_id: &str,
) -> Result<Option<AgentAvailability>, SwitchboardError> {
    let tenant_id = tenant_id.to_string();
    let agent_id = agent_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {COLUMNS} FROM agent_availability
                     WHERE tenant_id = ?1 AND agent_id = ?2"
                ),
                params![tenant_id, agent_id],
                from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Insert an agent record unless one exists for the same (tenant, agent).
pub async fn insert_agent(
    db: &Database,
    agent: &AgentAvailability,
) -> Result<bool, SwitchboardError> {
    let a = agent.clone();
    db.connection()
        .call(move |conn| {
            let inserted = conn.execute(
                &format!(
                    "INSERT OR IGNORE INTO agent_availability ({COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
                ),
                params![
                    a.tenant_id,
                    a.agent_id,
                    a.status.to_string(),
                    a.current_chat_count,
                    a.max_concurrent_chats,
                    ts(a.last_seen_at),
                    ts(a.status_changed_at),
                    ts_opt(a.last_assigned_at),
                ],
            )?;
            Ok(inserted > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Refresh the heartbeat timestamp.
pub async fn touch_agent(
    db: &Database,
    tenant_id: &str,
    agent_id: &str,
    now: DateTime<Utc>,
) -> Result<bool, SwitchboardError> {
    let tenant_id = tenant_id.to_string();
    let agent_id = agent_id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE agent_availability SET last_seen_at = ?1
                 WHERE tenant_id = ?2 AND agent_id = ?3",
                params![ts(now), tenant_id, agent_id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Explicitly set an agent's status. Counts as activity for the heartbeat.
///
/// `status_changed_at` only moves when the status actually differs.
pub async fn set_agent_status(
    db: &Database,
    tenant_id: &str,
    agent_id: &str,
    status: Presence,
    now: DateTime<Utc>,
    reset_chat_count: bool,
) -> Result<bool, SwitchboardError> {
    let tenant_id = tenant_id.to_string();
    let agent_id = agent_id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE agent_availability SET
                     status_changed_at = CASE WHEN status = ?1 THEN status_changed_at ELSE ?2 END,
                     status = ?1,
                     last_seen_at = ?2,
                     current_chat_count = CASE WHEN ?3 THEN 0 ELSE current_chat_count END
                 WHERE tenant_id = ?4 AND agent_id = ?5",
                params![status.to_string(), ts(now), reset_chat_count, tenant_id, agent_id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Apply a sweep demotion only if status and heartbeat are unchanged.
pub async fn transition_agent_if(
    db: &Database,
    transition: &AgentTransition,
) -> Result<bool, SwitchboardError> {
    let t = transition.clone();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE agent_availability SET
                     status = ?1,
                     status_changed_at = ?2,
                     current_chat_count = CASE WHEN ?3 THEN 0 ELSE current_chat_count END
                 WHERE tenant_id = ?4 AND agent_id = ?5 AND status = ?6 AND last_seen_at = ?7",
                params![
                    t.to.to_string(),
                    ts(t.at),
                    t.reset_chat_count,
                    t.tenant_id,
                    t.agent_id,
                    t.from.to_string(),
                    ts(t.observed_last_seen_at),
                ],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Online agents of a tenant.
pub async fn list_online_agents(
    db: &Database,
    tenant_id: &str,
) -> Result<Vec<AgentAvailability>, SwitchboardError> {
    let tenant_id = tenant_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM agent_availability
                 WHERE tenant_id = ?1 AND status = 'online'
                 ORDER BY agent_id ASC"
            ))?;
            let rows = stmt.query_map(params![tenant_id], from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Every non-offline agent across all tenants.
pub async fn list_present_agents(
    db: &Database,
) -> Result<Vec<AgentAvailability>, SwitchboardError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM agent_availability
                 WHERE status != 'offline'
                 ORDER BY tenant_id ASC, agent_id ASC"
            ))?;
            let rows = stmt.query_map([], from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Increment the chat count if the agent is online and below its cap.
///
/// A single conditional UPDATE; two concurrent claims on the last slot cannot
/// both succeed.
pub async fn try_claim_slot(
    db: &Database,
    tenant_id: &str,
    agent_id: &str,
    now: DateTime<Utc>,
) -> Result<bool, SwitchboardError> {
    let tenant_id = tenant_id.to_string();
    let agent_id = agent_id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE agent_availability SET
                     current_chat_count = current_chat_count + 1,
                     last_assigned_at = ?1
                 WHERE tenant_id = ?2 AND agent_id = ?3
                   AND status = 'online'
                   AND current_chat_count < max_concurrent_chats",
                params![ts(now), tenant_id, agent_id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Decrement the chat count, clamped at zero.
pub async fn release_slot(
    db: &Database,
    tenant_id: &str,
    agent_id: &str,
) -> Result<(), SwitchboardError> {
    let tenant_id = tenant_id.to_string();
    let agent_id = agent_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE agent_availability
                 SET current_chat_count = MAX(0, current_chat_count - 1)
                 WHERE tenant_id = ?1 AND agent_id = ?2",
                params![tenant_id, agent_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
