// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-tenant handoff settings.

use rusqlite::{OptionalExtension, params};
use switchboard_core::types::HandoffSettings;
use switchboard_core::SwitchboardError;

use super::{get_enum, get_json};
use crate::database::{map_tr_err, Database};

pub async fn get_settings(
    db: &Database,
    tenant_id: &str,
) -> Result<Option<HandoffSettings>, SwitchboardError> {
    let tenant_id = tenant_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT tenant_id, enabled, trigger_mode, keywords, keyword_enabled,
                        low_confidence_threshold, low_confidence_enabled,
                        business_hours_enabled, timezone, schedule, max_concurrent_chats
                 FROM handoff_settings WHERE tenant_id = ?1",
                params![tenant_id],
                |row| {
                    Ok(HandoffSettings {
                        tenant_id: row.get(0)?,
                        enabled: row.get(1)?,
                        trigger_mode: get_enum(row, 2)?,
                        keywords: get_json(row, 3)?,
                        keyword_enabled: row.get(4)?,
                        low_confidence_threshold: row.get(5)?,
                        low_confidence_enabled: row.get(6)?,
                        business_hours_enabled: row.get(7)?,
                        timezone: row.get(8)?,
                        schedule: get_json(row, 9)?,
                        max_concurrent_chats: row.get(10)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Insert or replace a tenant's settings.
pub async fn put_settings(db: &Database, settings: &HandoffSettings) -> Result<(), SwitchboardError> {
    let keywords = serde_json::to_string(&settings.keywords).map_err(SwitchboardError::storage)?;
    let schedule = serde_json::to_string(&settings.schedule).map_err(SwitchboardError::storage)?;
    let s = settings.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO handoff_settings (
                     tenant_id, enabled, trigger_mode, keywords, keyword_enabled,
                     low_confidence_threshold, low_confidence_enabled,
                     business_hours_enabled, timezone, schedule, max_concurrent_chats, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11,
                         strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
                 ON CONFLICT(tenant_id) DO UPDATE SET
                     enabled = excluded.enabled,
                     trigger_mode = excluded.trigger_mode,
                     keywords = excluded.keywords,
                     keyword_enabled = excluded.keyword_enabled,
                     low_confidence_threshold = excluded.low_confidence_threshold,
                     low_confidence_enabled = excluded.low_confidence_enabled,
                     business_hours_enabled = excluded.business_hours_enabled,
                     timezone = excluded.timezone,
                     schedule = excluded.schedule,
                     max_concurrent_chats = excluded.max_concurrent_chats,
                     updated_at = excluded.updated_at",
                params![
                    s.tenant_id,
                    s.enabled,
                    s.trigger_mode.to_string(),
                    keywords,
                    s.keyword_enabled,
                    s.low_confidence_threshold,
                    s.low_confidence_enabled,
                    s.business_hours_enabled,
                    s.timezone,
                    schedule,
                    s.max_concurrent_chats,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
