// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `gatepass serve` command implementation.
//!
//! Opens storage, resolves the device profile, starts the HTTP gateway and,
//! when the profile enables it, the periodic pending sweep. SIGINT/SIGTERM
//! stop both.

use std::sync::Arc;
use std::time::Duration;

use gatepass_config::model::GatepassConfig;
use gatepass_core::GatepassError;
use gatepass_gateway::{AuthConfig, GatewayState, ServerConfig, start_server};
use gatepass_sync::shutdown::install_signal_handler;
use gatepass_sync::{StatusService, WebhookIngestor, spawn_auto_sync};
use tracing::{info, warn};

use crate::runtime::Runtime;

/// Runs the `gatepass serve` command.
pub async fn run_serve(config: GatepassConfig) -> Result<(), GatepassError> {
    info!("starting gatepass serve");

    let runtime = Runtime::open(config).await?;
    let cancel = install_signal_handler();

    let sync = runtime.sync_service()?.map(Arc::new);
    if let Some(sync) = &sync {
        // Startup continues when the device is down; syncs will retry later.
        if let Err(e) = sync.initialize().await {
            warn!(error = %e, "device not reachable at startup");
        }
    }

    let auto_sync = match (&sync, runtime.profile()) {
        (Some(sync), Some(profile)) if profile.auto_sync => Some(spawn_auto_sync(
            sync.clone(),
            Duration::from_secs(profile.sync_interval_secs.max(1)),
            cancel.child_token(),
        )),
        _ => None,
    };

    if runtime.config.server.api_token.is_none() {
        warn!("server.api_token is not set; administrative routes will reject every request");
    }

    // Probes share the sync client so they queue behind sync traffic.
    let status = StatusService::new(
        runtime.store.clone(),
        sync.as_ref().map(|s| s.client().clone()),
    );
    let state = GatewayState {
        sync,
        status: Arc::new(status),
        webhooks: Arc::new(WebhookIngestor::new(runtime.store.clone())),
        profiles: runtime.profiles.clone(),
        auth: AuthConfig {
            bearer_token: runtime.config.server.api_token.clone(),
        },
        started: std::time::Instant::now(),
    };

    let server_config = ServerConfig::from(&runtime.config.server);
    let served = start_server(&server_config, state, cancel.clone()).await;

    // The server can also exit on a bind error; stop the sweep either way.
    cancel.cancel();
    if let Some(handle) = auto_sync
        && let Err(e) = handle.await
    {
        warn!(error = %e, "auto-sync task ended abnormally");
    }
    runtime.close().await;

    info!("gatepass serve stopped");
    served
}

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` overrides the configured level when set.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("gatepass={log_level},warn")));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .try_init();
}
