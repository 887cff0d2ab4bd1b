// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `gatepass profile` command implementations.

use gatepass_config::model::GatepassConfig;
use gatepass_core::GatepassError;
use gatepass_sync::ProfileView;
use tracing::info;

use crate::runtime::Runtime;

/// Write the `[device]` section of the config into the encrypted store.
pub async fn run_profile_import(
    config: GatepassConfig,
    activate: bool,
) -> Result<ProfileView, GatepassError> {
    let device = config.device.clone();
    if device.base_url.trim().is_empty() {
        return Err(GatepassError::Validation(
            "the [device] section has no base_url to import".into(),
        ));
    }

    let runtime = Runtime::open(config).await?;
    let saved = match runtime.require_profiles() {
        Ok(profiles) => profiles.save(&device, activate).await,
        Err(e) => Err(e),
    };
    runtime.close().await;

    let view = saved?;
    info!(profile = %view.name, active = view.is_active, "profile imported");
    println!(
        "imported profile '{}' ({}){}",
        view.name,
        view.base_url,
        if view.is_active { " [active]" } else { "" }
    );
    Ok(view)
}

/// Print the redacted view of a stored profile.
pub async fn run_profile_show(config: GatepassConfig, name: &str) -> Result<(), GatepassError> {
    let runtime = Runtime::open(config).await?;
    let view = match runtime.require_profiles() {
        Ok(profiles) => profiles.view(name).await,
        Err(e) => Err(e),
    };
    runtime.close().await;

    let view = view?.ok_or_else(|| GatepassError::NotFound {
        entity: "profile",
        id: name.to_string(),
    })?;
    let rendered = serde_json::to_string_pretty(&view)
        .map_err(|e| GatepassError::Internal(format!("failed to render profile: {e}")))?;
    println!("{rendered}");
    Ok(())
}
