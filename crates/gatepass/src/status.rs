// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `gatepass status` command implementation.
//!
//! Reads the sync overview straight from the database and probes the
//! device. Works whether or not `gatepass serve` is running.

use std::io::IsTerminal;

use gatepass_config::model::GatepassConfig;
use gatepass_core::{ConnectionStatus, GatepassError};
use gatepass_sync::{StatusService, SyncOverview};

use crate::runtime::Runtime;

/// Run the `gatepass status` command.
///
/// If `--json` is passed, outputs the overview as JSON for scripting.
/// If `--plain` is passed or stdout is not a TTY, disables colors.
pub async fn run_status(config: GatepassConfig, json: bool, plain: bool) -> Result<(), GatepassError> {
    let runtime = Runtime::open(config).await?;
    let status = StatusService::new(runtime.store.clone(), runtime.client()?);
    let overview = status.overview(runtime.profile().is_some()).await;
    runtime.close().await;
    let overview = overview?;

    if json {
        let rendered = serde_json::to_string_pretty(&overview)
            .map_err(|e| GatepassError::Internal(format!("failed to render status: {e}")))?;
        println!("{rendered}");
    } else {
        let use_color = !plain && std::io::stdout().is_terminal();
        print!("{}", render_overview(&overview, use_color));
    }
    Ok(())
}

fn connection_label(connection: ConnectionStatus, use_color: bool) -> String {
    if !use_color {
        return match connection {
            ConnectionStatus::Connected => "[OK] connected".to_string(),
            ConnectionStatus::Disconnected => "[FAIL] disconnected".to_string(),
            ConnectionStatus::Unknown => "[--] unknown".to_string(),
        };
    }
    use colored::Colorize;
    match connection {
        ConnectionStatus::Connected => format!("{} {}", "✓".green(), "connected".green()),
        ConnectionStatus::Disconnected => format!("{} {}", "✗".red(), "disconnected".red()),
        ConnectionStatus::Unknown => format!("{} {}", "?".yellow(), "unknown".yellow()),
    }
}

fn render_overview(overview: &SyncOverview, use_color: bool) -> String {
    let mut out = String::new();
    out.push('\n');
    out.push_str("  gatepass status\n");
    out.push_str(&format!("  {}\n", "-".repeat(35)));

    match &overview.profile {
        Some(profile) => out.push_str(&format!(
            "    Profile:  {} ({}, {})\n",
            profile.name, profile.base_url, profile.auth_type
        )),
        None => out.push_str("    Profile:  none stored\n"),
    }
    out.push_str(&format!(
        "    Device:   {}\n",
        connection_label(overview.connection, use_color)
    ));
    out.push_str(&format!("    Attendees: {}\n", overview.total_attendees));
    for (status, count) in &overview.counts {
        out.push_str(&format!("      {status:<10} {count}\n"));
    }

    if !overview.recent_batches.is_empty() {
        out.push_str("    Recent batches:\n");
        for batch in &overview.recent_batches {
            out.push_str(&format!(
                "      {}  {:<9} {}/{} ok\n",
                batch.batch_number,
                batch.status.to_string(),
                batch.success_count, batch.total_count
            ));
        }
    }
    out.push('\n');
    out
}
