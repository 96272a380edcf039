// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `switchboard sweep`: one pass of each sweep, for cron or manual use.

use switchboard_config::model::SwitchboardConfig;
use switchboard_core::SwitchboardError;
use switchboard_handoff::{AbandonmentReport, AgentSweepReport};

use crate::app::App;

pub async fn run_sweep(config: SwitchboardConfig) -> Result<(), SwitchboardError> {
    let app = App::open(&config).await?;
    let agents = app.service.sweep_agents().await;
    let abandoned = app.service.sweep_abandoned_conversations().await;
    app.close().await;

    println!("{}", format_agent_report(&agents?));
    println!("{}", format_abandonment_report(&abandoned?));
    Ok(())
}

fn format_agent_report(report: &AgentSweepReport) -> String {
    format!(
        "agents: examined={} away={} offline={} lost_races={} failed={}",
        report.examined,
        report.demoted_away,
        report.demoted_offline,
        report.lost_races,
        report.failed
    )
}

fn format_abandonment_report(report: &AbandonmentReport) -> String {
    format!(
        "conversations: examined={} closed={} skipped={} failed={}",
        report.examined, report.closed, report.skipped, report.failed
    )
}
