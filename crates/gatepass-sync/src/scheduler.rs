// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic pending sweep.

use std::sync::Arc;
use std::time::Duration;

use gatepass_core::BatchTrigger;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::service::SyncService;

/// Run `sync_pending` every `every` until `cancel` fires.
///
/// The first sweep happens one full interval after start. A sweep in
/// progress is allowed to finish before the loop observes cancellation.
pub async fn run_auto_sync(service: Arc<SyncService>, every: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;
    info!(interval_secs = every.as_secs(), "auto-sync started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("auto-sync stopped");
                break;
            }
            _ = ticker.tick() => {
                match service.sync_pending(BatchTrigger::Auto).await {
                    Ok(result) if result.total_processed > 0 => info!(
                        batch_number = result.batch_number.as_deref(),
                        success = result.success_count,
                        failed = result.failed_count,
                        "auto-sync sweep finished"
                    ),
                    Ok(_) => debug!("auto-sync sweep found nothing pending"),
                    Err(e) => error!(error = %e, "auto-sync sweep failed"),
                }
            }
        }
    }
}

/// Spawn [`run_auto_sync`] on the current runtime.
pub fn spawn_auto_sync(
    service: Arc<SyncService>,
    every: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(run_auto_sync(service, every, cancel))
}
