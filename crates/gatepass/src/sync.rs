// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `gatepass sync` and `gatepass sync-pending` command implementations.
//!
//! Both run one operation against the resolved device profile and print the
//! result as JSON.

use gatepass_config::model::GatepassConfig;
use gatepass_core::{BatchTrigger, GatepassError};
use serde::Serialize;

use crate::runtime::Runtime;

fn print_json(value: &impl Serialize) -> Result<(), GatepassError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| GatepassError::Internal(format!("failed to render result: {e}")))?;
    println!("{rendered}");
    Ok(())
}

/// Sync one attendee. Returns whether the external system accepted it.
pub async fn run_sync_one(config: GatepassConfig, attendee_id: &str) -> Result<bool, GatepassError> {
    let runtime = Runtime::open(config).await?;
    let outcome = match runtime.require_sync_service() {
        Ok(service) => service.sync_one(attendee_id).await,
        Err(e) => Err(e),
    };
    runtime.close().await;

    let result = outcome?;
    print_json(&result)?;
    Ok(result.success)
}

/// Sweep every pending or failed attendee. Returns whether none failed.
pub async fn run_sync_pending(config: GatepassConfig) -> Result<bool, GatepassError> {
    let runtime = Runtime::open(config).await?;
    let outcome = match runtime.require_sync_service() {
        Ok(service) => service.sync_pending(BatchTrigger::Pending).await,
        Err(e) => Err(e),
    };
    runtime.close().await;

    let result = outcome?;
    print_json(&result)?;
    Ok(result.failed_count == 0)
}
