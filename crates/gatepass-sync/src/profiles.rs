// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Encrypted device profile storage.
//!
//! Credentials are sealed with the vault cipher before they reach the
//! store. Read paths return a [`ProfileView`] carrying only `has_*` flags;
//! decrypted profiles come from [`ProfileStore::load`] and are meant for
//! client construction only.

use std::sync::Arc;

use chrono::Utc;
use gatepass_config::{DeviceProfileConfig, profile_errors};
use gatepass_core::{AuthType, EndpointMap, GatepassError, StoredProfile, SyncStore};
use gatepass_vault::CredentialCipher;
use secrecy::SecretString;
use serde::Serialize;
use tracing::info;

use crate::mapper::timestamp;

/// A stored profile with every credential reduced to a presence flag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub name: String,
    pub base_url: String,
    pub api_version: String,
    pub auth_type: AuthType,
    pub username: Option<String>,
    pub has_password: bool,
    pub has_api_key: bool,
    pub has_api_secret: bool,
    pub request_timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub rate_limit: u32,
    pub batch_size: u32,
    pub library_id: String,
    pub library_type: String,
    pub validity_days: u32,
    pub auto_sync: bool,
    pub sync_interval_secs: u64,
    pub endpoints: EndpointMap,
    pub is_active: bool,
    pub updated_at: String,
}

impl From<&StoredProfile> for ProfileView {
    fn from(p: &StoredProfile) -> Self {
        Self {
            name: p.name.clone(),
            base_url: p.base_url.clone(),
            api_version: p.api_version.clone(),
            auth_type: p.auth_type,
            username: p.username.clone(),
            has_password: p.password_enc.is_some(),
            has_api_key: p.api_key_enc.is_some(),
            has_api_secret: p.api_secret_enc.is_some(),
            request_timeout_ms: p.request_timeout_ms,
            max_retries: p.max_retries,
            retry_delay_ms: p.retry_delay_ms,
            rate_limit: p.rate_limit,
            batch_size: p.batch_size,
            library_id: p.library_id.clone(),
            library_type: p.library_type.clone(),
            validity_days: p.validity_days,
            auto_sync: p.auto_sync,
            sync_interval_secs: p.sync_interval_secs,
            endpoints: p.endpoints.clone(),
            is_active: p.is_active,
            updated_at: p.updated_at.clone(),
        }
    }
}

/// Reads and writes device profiles through the store, encrypting secrets.
pub struct ProfileStore {
    store: Arc<dyn SyncStore>,
    cipher: CredentialCipher,
}

impl ProfileStore {
    pub fn new(store: Arc<dyn SyncStore>, cipher: CredentialCipher) -> Self {
        Self { store, cipher }
    }

    /// Validate and persist `profile`.
    ///
    /// A credential left empty keeps the value already stored under the same
    /// name, so callers can update settings without resending secrets.
    pub async fn save(
        &self,
        profile: &DeviceProfileConfig,
        activate: bool,
    ) -> Result<ProfileView, GatepassError> {
        let mut candidate = profile.clone();
        let existing = self.store.get_profile(&profile.name).await?;
        if let Some(existing) = &existing {
            if candidate.password.is_none() {
                candidate.password = self.reveal(existing.password_enc.as_deref())?;
            }
            if candidate.api_key.is_none() {
                candidate.api_key = self.reveal(existing.api_key_enc.as_deref())?;
            }
            if candidate.api_secret.is_none() {
                candidate.api_secret = self.reveal(existing.api_secret_enc.as_deref())?;
            }
        }

        let errors = profile_errors(&candidate);
        if !errors.is_empty() {
            return Err(GatepassError::Validation(errors.join("; ")));
        }

        let stored = StoredProfile {
            name: candidate.name.clone(),
            base_url: candidate.base_url.trim_end_matches('/').to_string(),
            api_version: candidate.api_version.clone(),
            auth_type: candidate.auth_type,
            username: candidate.username.clone(),
            password_enc: self.seal(candidate.password.as_ref())?,
            api_key_enc: self.seal(candidate.api_key.as_ref())?,
            api_secret_enc: self.seal(candidate.api_secret.as_ref())?,
            request_timeout_ms: candidate.request_timeout_ms,
            max_retries: candidate.max_retries,
            retry_delay_ms: candidate.retry_delay_ms,
            rate_limit: candidate.rate_limit,
            batch_size: candidate.batch_size,
            library_id: candidate.library_id.clone(),
            library_type: candidate.library_type.clone(),
            validity_days: candidate.validity_days,
            auto_sync: candidate.auto_sync,
            sync_interval_secs: candidate.sync_interval_secs,
            endpoints: candidate.endpoints.clone(),
            is_active: activate || existing.as_ref().is_some_and(|e| e.is_active),
            updated_at: timestamp(Utc::now()),
        };
        self.store.upsert_profile(&stored).await?;
        info!(
            profile = %stored.name,
            auth_type = %stored.auth_type,
            active = stored.is_active,
            "device profile saved"
        );
        Ok(ProfileView::from(&stored))
    }

    /// Redacted view of a named profile.
    pub async fn view(&self, name: &str) -> Result<Option<ProfileView>, GatepassError> {
        Ok(self.store.get_profile(name).await?.as_ref().map(ProfileView::from))
    }

    /// Redacted view of the active profile.
    pub async fn active_view(&self) -> Result<Option<ProfileView>, GatepassError> {
        Ok(self
            .store
            .get_active_profile()
            .await?
            .as_ref()
            .map(ProfileView::from))
    }

    /// Decrypted profile for building a client.
    pub async fn load(&self, name: &str) -> Result<DeviceProfileConfig, GatepassError> {
        let stored = self
            .store
            .get_profile(name)
            .await?
            .ok_or_else(|| GatepassError::NotFound {
                entity: "profile",
                id: name.to_string(),
            })?;
        self.decrypt(stored)
    }

    /// Decrypted active profile, if one is marked active.
    pub async fn load_active(&self) -> Result<Option<DeviceProfileConfig>, GatepassError> {
        match self.store.get_active_profile().await? {
            Some(stored) => self.decrypt(stored).map(Some),
            None => Ok(None),
        }
    }

    fn decrypt(&self, stored: StoredProfile) -> Result<DeviceProfileConfig, GatepassError> {
        Ok(DeviceProfileConfig {
            password: self.reveal(stored.password_enc.as_deref())?,
            api_key: self.reveal(stored.api_key_enc.as_deref())?,
            api_secret: self.reveal(stored.api_secret_enc.as_deref())?,
            name: stored.name,
            base_url: stored.base_url,
            api_version: stored.api_version,
            auth_type: stored.auth_type,
            username: stored.username,
            request_timeout_ms: stored.request_timeout_ms,
            max_retries: stored.max_retries,
            retry_delay_ms: stored.retry_delay_ms,
            rate_limit: stored.rate_limit,
            batch_size: stored.batch_size,
            library_id: stored.library_id,
            library_type: stored.library_type,
            validity_days: stored.validity_days,
            auto_sync: stored.auto_sync,
            sync_interval_secs: stored.sync_interval_secs,
            endpoints: stored.endpoints,
        })
    }

    fn seal(&self, secret: Option<&SecretString>) -> Result<Option<String>, GatepassError> {
        secret.map(|s| self.cipher.encrypt(s)).transpose()
    }

    fn reveal(&self, blob: Option<&str>) -> Result<Option<SecretString>, GatepassError> {
        blob.map(|b| self.cipher.decrypt(b)).transpose()
    }
}
