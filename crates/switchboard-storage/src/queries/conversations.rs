// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation CRUD and queue queries.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};
use switchboard_core::types::{Conversation, ConversationStatus, Presence};
use switchboard_core::SwitchboardError;

use super::{get_enum, get_enum_opt, get_ts, get_ts_opt, ts, ts_opt};
use crate::database::{map_tr_err, Database};

const COLUMNS: &str = "id, tenant_id, visitor_id, status, assigned_agent_id, last_agent_id, \
     queue_entered_at, claimed_at, first_response_at, resolved_at, customer_presence, \
     customer_last_seen_at, handoff_reason, trigger_keyword, created_at, updated_at";

const NON_TERMINAL: &str = "('ai_active', 'waiting', 'agent_active')";

fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        visitor_id: row.get(2)?,
        status: get_enum(row, 3)?,
        assigned_agent_id: row.get(4)?,
        last_agent_id: row.get(5)?,
        queue_entered_at: get_ts_opt(row, 6)?,
        claimed_at: get_ts_opt(row, 7)?,
        first_response_at: get_ts_opt(row, 8)?,
        resolved_at: get_ts_opt(row, 9)?,
        customer_presence: get_enum(row, 10)?,
        customer_last_seen_at: get_ts(row, 11)?,
        handoff_reason: get_enum_opt(row, 12)?,
        trigger_keyword: row.get(13)?,
        created_at: get_ts(row, 14)?,
        updated_at: get_ts(row, 15)?,
    })
}

/// Insert a new conversation.
pub async fn insert_conversation(
    db: &Database,
    conversation: &Conversation,
) -> Result<(), SwitchboardError> {
    let c = conversation.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                &format!(
                    "INSERT INTO conversations ({COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)"
                ),
                params![
                    c.id,
                    c.tenant_id,
                    c.visitor_id,
                    c.status.to_string(),
                    c.assigned_agent_id,
                    c.last_agent_id,
                    ts_opt(c.queue_entered_at),
                    ts_opt(c.claimed_at),
                    ts_opt(c.first_response_at),
                    ts_opt(c.resolved_at),
                    c.customer_presence.to_string(),
                    ts(c.customer_last_seen_at),
                    c.handoff_reason.map(|r| r.to_string()),
                    c.trigger_keyword,
                    ts(c.created_at),
                    ts(c.updated_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a conversation by ID.
pub async fn get_conversation(
    db: &Database,
    id: &str,
) -> Result<Option<Conversation>, SwitchboardError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM conversations WHERE id = ?1"),
                params![id],
                from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// The newest non-terminal conversation of a visitor.
pub async fn find_active_conversation(
    db: &Database,
    tenant_id: &str,
    visitor_id: &str,
) -> Result<Option<Conversation>, SwitchboardError> {
    let tenant_id = tenant_id.to_string();
    let visitor_id = visitor_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {COLUMNS} FROM conversations
                     WHERE tenant_id = ?1 AND visitor_id = ?2 AND status IN {NON_TERMINAL}
                     ORDER BY created_at DESC LIMIT 1"
                ),
                params![tenant_id, visitor_id],
                from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Write routing columns if the stored status is still `expected`.
pub async fn update_conversation_if(
    db: &Database,
    conversation: &Conversation,
    expected: ConversationStatus,
) -> Result<bool, SwitchboardError> {
    write_routing(db, conversation, expected, None).await
}

/// Write routing columns if the status is still `expected` and the customer
/// has not been seen since `observed_last_seen_at`.
pub async fn update_conversation_if_idle(
    db: &Database,
    conversation: &Conversation,
    expected: ConversationStatus,
    observed_last_seen_at: DateTime<Utc>,
) -> Result<bool, SwitchboardError> {
    write_routing(db, conversation, expected, Some(observed_last_seen_at)).await
}

async fn write_routing(
    db: &Database,
    conversation: &Conversation,
    expected: ConversationStatus,
    last_seen_guard: Option<DateTime<Utc>>,
) -> Result<bool, SwitchboardError> {
    let c = conversation.clone();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE conversations SET
                     status = ?1, assigned_agent_id = ?2, last_agent_id = ?3,
                     queue_entered_at = ?4, claimed_at = ?5, first_response_at = ?6,
                     resolved_at = ?7, handoff_reason = ?8, trigger_keyword = ?9,
                     updated_at = ?10
                 WHERE id = ?11 AND status = ?12
                   AND (?13 IS NULL OR customer_last_seen_at = ?13)",
                params![
                    c.status.to_string(),
                    c.assigned_agent_id,
                    c.last_agent_id,
                    ts_opt(c.queue_entered_at),
                    ts_opt(c.claimed_at),
                    ts_opt(c.first_response_at),
                    ts_opt(c.resolved_at),
                    c.handoff_reason.map(|r| r.to_string()),
                    c.trigger_keyword,
                    ts(c.updated_at),
                    c.id,
                    expected.to_string(),
                    ts_opt(last_seen_guard),
                ],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Set customer presence and optionally the last-seen timestamp.
pub async fn update_customer_presence(
    db: &Database,
    conversation_id: &str,
    presence: Presence,
    last_seen_at: Option<DateTime<Utc>>,
) -> Result<bool, SwitchboardError> {
    let id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE conversations SET
                     customer_presence = ?1,
                     customer_last_seen_at = COALESCE(?2, customer_last_seen_at)
                 WHERE id = ?3",
                params![presence.to_string(), ts_opt(last_seen_at), id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Waiting conversations of a tenant in FIFO order.
pub async fn list_waiting(
    db: &Database,
    tenant_id: &str,
) -> Result<Vec<Conversation>, SwitchboardError> {
    let tenant_id = tenant_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM conversations
                 WHERE tenant_id = ?1 AND status = 'waiting'
                 ORDER BY queue_entered_at ASC, id ASC"
            ))?;
            let rows = stmt.query_map(params![tenant_id], from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Number of waiting conversations in a tenant.
pub async fn count_waiting(db: &Database, tenant_id: &str) -> Result<u32, SwitchboardError> {
    let tenant_id = tenant_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM conversations WHERE tenant_id = ?1 AND status = 'waiting'",
                params![tenant_id],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Number of waiting conversations that entered the queue strictly before `before`.
pub async fn count_waiting_before(
    db: &Database,
    tenant_id: &str,
    before: DateTime<Utc>,
) -> Result<u32, SwitchboardError> {
    let tenant_id = tenant_id.to_string();
    let before = ts(before);
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM conversations
                 WHERE tenant_id = ?1 AND status = 'waiting' AND queue_entered_at < ?2",
                params![tenant_id, before],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Non-terminal conversations whose customer was last seen before `cutoff`.
pub async fn list_stale_conversations(
    db: &Database,
    cutoff: DateTime<Utc>,
) -> Result<Vec<Conversation>, SwitchboardError> {
    let cutoff = ts(cutoff);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM conversations
                 WHERE status IN {NON_TERMINAL} AND customer_last_seen_at < ?1
                 ORDER BY customer_last_seen_at ASC"
            ))?;
            let rows = stmt.query_map(params![cutoff], from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
