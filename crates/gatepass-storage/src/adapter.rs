// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`SyncStore`] trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use gatepass_config::model::StorageConfig;
use gatepass_core::{
    Attendee, BatchCompletion, GatepassError, LogStatus, NewAttendee, NewSyncLog, NewWebhookLog,
    StatusCount, StoredProfile, SyncBatch, SyncLog, SyncStatus, SyncStore, WebhookLog,
    WebhookStatus,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed store.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily initialized on the first
/// call to [`SyncStore::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`SyncStore::initialize`] is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Returns a reference to the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, GatepassError> {
        self.db.get().ok_or_else(|| GatepassError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl SyncStore for SqliteStorage {
    async fn initialize(&self) -> Result<(), GatepassError> {
        let path = self.config.database_path.clone();
        let db = Database::open(&path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| GatepassError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), GatepassError> {
        self.db()?.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    // --- Attendees ---

    async fn insert_attendee(&self, attendee: &NewAttendee) -> Result<(), GatepassError> {
        queries::attendees::insert_attendee(self.db()?, attendee).await
    }

    async fn get_attendee(&self, id: &str) -> Result<Option<Attendee>, GatepassError> {
        queries::attendees::get_attendee(self.db()?, id).await
    }

    async fn list_attendee_ids_by_status(
        &self,
        statuses: &[SyncStatus],
    ) -> Result<Vec<String>, GatepassError> {
        queries::attendees::list_ids_by_status(self.db()?, statuses).await
    }

    async fn list_attendees_by_status(
        &self,
        status: SyncStatus,
        limit: u32,
    ) -> Result<Vec<Attendee>, GatepassError> {
        queries::attendees::list_by_status(self.db()?, status, limit).await
    }

    async fn transition_status(
        &self,
        id: &str,
        from: SyncStatus,
        to: SyncStatus,
    ) -> Result<bool, GatepassError> {
        queries::attendees::transition_status(self.db()?, id, from, to).await
    }

    async fn mark_synced(
        &self,
        id: &str,
        external_person_id: &str,
        synced_at: &str,
    ) -> Result<(), GatepassError> {
        queries::attendees::mark_synced(self.db()?, id, external_person_id, synced_at).await
    }

    async fn mark_failed(&self, id: &str, error: &str) -> Result<(), GatepassError> {
        queries::attendees::mark_failed(self.db()?, id, error).await
    }

    async fn clear_external(&self, id: &str) -> Result<(), GatepassError> {
        queries::attendees::clear_external(self.db()?, id).await
    }

    async fn status_counts(&self) -> Result<Vec<StatusCount>, GatepassError> {
        queries::attendees::status_counts(self.db()?).await
    }

    // --- Sync logs ---

    async fn insert_sync_log(&self, log: &NewSyncLog) -> Result<i64, GatepassError> {
        queries::sync_logs::insert_sync_log(self.db()?, log).await
    }

    async fn latest_sync_log(&self, attendee_id: &str) -> Result<Option<SyncLog>, GatepassError> {
        queries::sync_logs::latest_for_attendee(self.db()?, attendee_id).await
    }

    async fn attendee_sync_logs(
        &self,
        attendee_id: &str,
        limit: u32,
    ) -> Result<Vec<SyncLog>, GatepassError> {
        queries::sync_logs::for_attendee(self.db()?, attendee_id, limit).await
    }

    async fn batch_sync_logs(&self, batch_id: &str) -> Result<Vec<SyncLog>, GatepassError> {
        queries::sync_logs::for_batch(self.db()?, batch_id).await
    }

    async fn recent_sync_logs(&self, limit: u32) -> Result<Vec<SyncLog>, GatepassError> {
        queries::sync_logs::recent(self.db()?, limit).await
    }

    async fn recent_sync_logs_with_status(
        &self,
        status: LogStatus,
        limit: u32,
    ) -> Result<Vec<SyncLog>, GatepassError> {
        queries::sync_logs::recent_with_status(self.db()?, status, limit).await
    }

    // --- Batches ---

    async fn create_batch(&self, batch: &SyncBatch) -> Result<(), GatepassError> {
        queries::batches::create_batch(self.db()?, batch).await
    }

    async fn complete_batch(
        &self,
        batch_id: &str,
        completion: &BatchCompletion,
    ) -> Result<(), GatepassError> {
        queries::batches::complete_batch(self.db()?, batch_id, completion).await
    }

    async fn get_batch(&self, batch_id: &str) -> Result<Option<SyncBatch>, GatepassError> {
        queries::batches::get_batch(self.db()?, batch_id).await
    }

    async fn recent_batches(&self, limit: u32) -> Result<Vec<SyncBatch>, GatepassError> {
        queries::batches::recent_batches(self.db()?, limit).await
    }

    async fn count_batches_on(&self, day: &str) -> Result<u32, GatepassError> {
        queries::batches::count_on_day(self.db()?, day).await
    }

    // --- Webhooks ---

    async fn insert_webhook_log(&self, log: &NewWebhookLog) -> Result<i64, GatepassError> {
        queries::webhooks::insert_webhook_log(self.db()?, log).await
    }

    async fn finish_webhook_log(
        &self,
        id: i64,
        status: WebhookStatus,
        error: Option<&str>,
        processed_at: &str,
    ) -> Result<(), GatepassError> {
        queries::webhooks::finish_webhook_log(self.db()?, id, status, error, processed_at).await
    }

    async fn get_webhook_log(&self, id: i64) -> Result<Option<WebhookLog>, GatepassError> {
        queries::webhooks::get_webhook_log(self.db()?, id).await
    }

    // --- Profiles ---

    async fn upsert_profile(&self, profile: &StoredProfile) -> Result<(), GatepassError> {
        queries::profiles::upsert_profile(self.db()?, profile).await
    }

    async fn get_profile(&self, name: &str) -> Result<Option<StoredProfile>, GatepassError> {
        queries::profiles::get_profile(self.db()?, name).await
    }

    async fn get_active_profile(&self) -> Result<Option<StoredProfile>, GatepassError> {
        queries::profiles::get_active_profile(self.db()?).await
    }
}
