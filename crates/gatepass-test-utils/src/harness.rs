// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles a temp SQLite store, a [`MockDevice`], and a
//! device profile pointing at the mock with fast retry and rate settings.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use gatepass_client::DeviceClient;
use gatepass_config::DeviceProfileConfig;
use gatepass_config::model::StorageConfig;
use gatepass_core::{AuthType, GatepassError, NewAttendee, SyncStore};
use gatepass_storage::SqliteStorage;
use secrecy::SecretString;

use crate::device::{API_VERSION, MockDevice};

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    batch_size: u32,
    max_retries: u32,
    rate_limit: u32,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            batch_size: 100,
            max_retries: 0,
            rate_limit: 1000,
        }
    }

    /// Attendees per batch request.
    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Transport retries after the first attempt.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: u32) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// Build the harness, creating the database and starting the mock device.
    pub async fn build(self) -> Result<TestHarness, GatepassError> {
        let temp_dir = tempfile::TempDir::new().map_err(GatepassError::storage)?;
        let db_path = temp_dir.path().join("test.db");

        let storage = SqliteStorage::new(StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        });
        storage.initialize().await?;

        let device = MockDevice::start().await;
        let profile = DeviceProfileConfig {
            name: "test".into(),
            base_url: device.uri(),
            api_version: API_VERSION.into(),
            auth_type: AuthType::ApiKey,
            api_key: Some(SecretString::from("test-api-key")),
            api_secret: Some(SecretString::from("test-api-secret")),
            request_timeout_ms: 5_000,
            max_retries: self.max_retries,
            retry_delay_ms: 10,
            rate_limit: self.rate_limit,
            batch_size: self.batch_size,
            library_id: "1".into(),
            library_type: "blackFD".into(),
            ..DeviceProfileConfig::default()
        };

        Ok(TestHarness {
            store: Arc::new(storage),
            device,
            profile,
            db_path,
            _temp_dir: temp_dir,
        })
    }
}

/// A temp store plus a mock external system.
pub struct TestHarness {
    store: Arc<SqliteStorage>,
    pub device: MockDevice,
    profile: DeviceProfileConfig,
    db_path: PathBuf,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Harness with default settings.
    pub async fn start() -> Result<Self, GatepassError> {
        Self::builder().build().await
    }

    pub fn store(&self) -> Arc<dyn SyncStore> {
        self.store.clone()
    }

    /// Profile pointing at the mock device, with plaintext credentials.
    pub fn profile(&self) -> &DeviceProfileConfig {
        &self.profile
    }

    /// A fresh client for the harness profile.
    pub fn client(&self) -> Result<DeviceClient, GatepassError> {
        DeviceClient::from_profile(&self.profile)
    }

    pub fn database_path(&self) -> &Path {
        &self.db_path
    }

    /// Insert an attendee with a deterministic national id.
    pub async fn add_attendee(&self, id: &str, name: &str) -> Result<(), GatepassError> {
        self.store
            .insert_attendee(&NewAttendee {
                id: id.into(),
                name: name.into(),
                national_id: "123.456.789-09".into(),
                email: Some(format!("{id}@example.com")),
                event_code: Some("EXPO26".into()),
                ..NewAttendee::default()
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use gatepass_core::SyncStatus;

    use super::*;

    #[tokio::test]
    async fn harness_wires_store_and_device() {
        let harness = TestHarness::start().await.unwrap();
        assert!(harness.database_path().exists());

        harness.add_attendee("a-1", "Ana").await.unwrap();
        let attendee = harness.store().get_attendee("a-1").await.unwrap().unwrap();
        assert_eq!(attendee.sync_status, SyncStatus::Unset);

        harness.device.status_ok().await;
        let client = harness.client().unwrap();
        assert!(client.test_connection().await);
    }
}
