// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `switchboard queue --tenant <id>`: print the waiting queue.

use chrono::{DateTime, Utc};
use switchboard_config::model::SwitchboardConfig;
use switchboard_core::SwitchboardError;
use switchboard_handoff::{QueueEntry, estimated_wait};

use crate::app::App;

pub async fn run_queue(
    config: SwitchboardConfig,
    tenant_id: &str,
    json: bool,
) -> Result<(), SwitchboardError> {
    let app = App::open(&config).await?;
    let entries = app.service.queue_snapshot(tenant_id).await;
    app.close().await;
    let entries = entries?;

    if json {
        let rendered = serde_json::to_string_pretty(&entries)
            .map_err(|e| SwitchboardError::Internal(format!("failed to render queue: {e}")))?;
        println!("{rendered}");
    } else {
        print!("{}", format_table(tenant_id, &entries, Utc::now()));
    }
    Ok(())
}

fn format_table(tenant_id: &str, entries: &[QueueEntry], now: DateTime<Utc>) -> String {
    if entries.is_empty() {
        return format!("tenant {tenant_id}: queue empty\n");
    }
    let mut out = format!("tenant {tenant_id}: {} waiting\n", entries.len());
    for entry in entries {
        let waited = now.signed_duration_since(entry.queue_entered_at).num_minutes().max(0);
        out.push_str(&format!(
            "{:>4}  {}  visitor={}  waited={}m  eta={}\n",
            entry.position,
            entry.conversation_id,
            entry.visitor_id,
            waited,
            estimated_wait(entry.position)
        ));
    }
    out
}
