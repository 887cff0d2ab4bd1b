// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared wiring for every subcommand: storage, vault and the device profile.

use std::sync::Arc;

use gatepass_client::DeviceClient;
use gatepass_config::{DeviceProfileConfig, GatepassConfig};
use gatepass_core::{GatepassError, SyncStore};
use gatepass_storage::SqliteStorage;
use gatepass_sync::{ProfileStore, SyncOptions, SyncService};
use gatepass_vault::CredentialCipher;
use tracing::{debug, info, warn};

/// Where the device profile in use came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileSource {
    /// The active profile in the encrypted store.
    Stored,
    /// The `[device]` section of the config file.
    File,
}

/// Opened storage plus the resolved device profile.
pub struct Runtime {
    pub config: GatepassConfig,
    pub store: Arc<dyn SyncStore>,
    /// `None` when no vault master key is available.
    pub profiles: Option<Arc<ProfileStore>>,
    pub device: Option<(DeviceProfileConfig, ProfileSource)>,
}

impl Runtime {
    /// Open the database (running migrations) and resolve the device profile.
    ///
    /// A stored active profile wins over the config file. Without a vault
    /// key, stored profiles cannot be decrypted and only the file is used.
    pub async fn open(config: GatepassConfig) -> Result<Self, GatepassError> {
        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await?;
        let store: Arc<dyn SyncStore> = Arc::new(storage);

        let profiles = match CredentialCipher::from_config(&config.vault) {
            Ok(cipher) => Some(Arc::new(ProfileStore::new(store.clone(), cipher))),
            Err(e) => {
                debug!(error = %e, "credential vault unavailable");
                None
            }
        };

        let stored = match &profiles {
            Some(profiles) => profiles.load_active().await?,
            None => None,
        };
        let device = match stored {
            Some(profile) => Some((profile, ProfileSource::Stored)),
            None if !config.device.base_url.trim().is_empty() => {
                Some((config.device.clone(), ProfileSource::File))
            }
            None => None,
        };

        match &device {
            Some((profile, source)) => info!(
                profile = %profile.name,
                base_url = %profile.base_url,
                source = ?source,
                "device profile resolved"
            ),
            None => warn!("no device profile configured; sync operations are disabled"),
        }

        Ok(Self {
            config,
            store,
            profiles,
            device,
        })
    }

    pub fn profile(&self) -> Option<&DeviceProfileConfig> {
        self.device.as_ref().map(|(profile, _)| profile)
    }

    pub fn client(&self) -> Result<Option<DeviceClient>, GatepassError> {
        self.profile().map(DeviceClient::from_profile).transpose()
    }

    /// Orchestrator for the resolved profile, if there is one.
    pub fn sync_service(&self) -> Result<Option<SyncService>, GatepassError> {
        let Some(profile) = self.profile() else {
            return Ok(None);
        };
        Ok(Some(SyncService::new(
            self.store.clone(),
            DeviceClient::from_profile(profile)?,
            SyncOptions::from_profile(profile),
        )))
    }

    /// Like [`Runtime::sync_service`], but a missing profile is an error.
    pub fn require_sync_service(&self) -> Result<SyncService, GatepassError> {
        self.sync_service()?.ok_or_else(|| {
            GatepassError::Config(
                "no device profile configured. Set [device] base_url or import a profile".into(),
            )
        })
    }

    pub fn require_profiles(&self) -> Result<&Arc<ProfileStore>, GatepassError> {
        self.profiles.as_ref().ok_or_else(|| {
            GatepassError::Config(format!(
                "no vault master key. Set {} or vault.master_key",
                gatepass_vault::VAULT_KEY_ENV_VAR
            ))
        })
    }

    pub async fn close(&self) {
        if let Err(e) = self.store.close().await {
            warn!(error = %e, "failed to close storage cleanly");
        }
    }
}
