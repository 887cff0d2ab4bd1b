// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence trait for attendee sync state, audit logs, batches, and profiles.

use async_trait::async_trait;

use crate::error::GatepassError;
use crate::types::{
    Attendee, BatchCompletion, LogStatus, NewAttendee, NewSyncLog, NewWebhookLog, StatusCount,
    StoredProfile, SyncBatch, SyncLog, SyncStatus, WebhookLog, WebhookStatus,
};

/// Storage backend used by the orchestrator, the webhook ingestor, and the
/// status surface.
///
/// Implementations serialize writes through a single connection; callers rely
/// on that rather than on row locks.
#[async_trait]
pub trait SyncStore: Send + Sync {
    /// Opens the backend and applies pending migrations.
    async fn initialize(&self) -> Result<(), GatepassError>;

    /// Flushes pending writes and releases the connection.
    async fn close(&self) -> Result<(), GatepassError>;

    // --- Attendees ---

    async fn insert_attendee(&self, attendee: &NewAttendee) -> Result<(), GatepassError>;

    async fn get_attendee(&self, id: &str) -> Result<Option<Attendee>, GatepassError>;

    /// Ids of attendees in any of `statuses`, oldest first.
    async fn list_attendee_ids_by_status(
        &self,
        statuses: &[SyncStatus],
    ) -> Result<Vec<String>, GatepassError>;

    /// Moves an attendee from `from` to `to` only if it is currently in `from`.
    ///
    /// Returns `false` when the attendee is missing or in another state.
    async fn transition_status(
        &self,
        id: &str,
        from: SyncStatus,
        to: SyncStatus,
    ) -> Result<bool, GatepassError>;

    /// Records a successful sync: status `synced`, external id, timestamp, error cleared.
    async fn mark_synced(
        &self,
        id: &str,
        external_person_id: &str,
        synced_at: &str,
    ) -> Result<(), GatepassError>;

    /// Records a failed sync: status `failed` with the error message.
    async fn mark_failed(&self, id: &str, error: &str) -> Result<(), GatepassError>;

    /// Resets an attendee after its external record was deleted: status `unset`,
    /// external id, timestamp and error cleared.
    async fn clear_external(&self, id: &str) -> Result<(), GatepassError>;

    /// Attendees in `status`, most recently updated first.
    async fn list_attendees_by_status(
        &self,
        status: SyncStatus,
        limit: u32,
    ) -> Result<Vec<Attendee>, GatepassError>;

    async fn status_counts(&self) -> Result<Vec<StatusCount>, GatepassError>;

    // --- Sync logs ---

    /// Appends a log row and returns its id.
    async fn insert_sync_log(&self, log: &NewSyncLog) -> Result<i64, GatepassError>;

    async fn latest_sync_log(&self, attendee_id: &str) -> Result<Option<SyncLog>, GatepassError>;

    /// Most recent logs for one attendee, newest first.
    async fn attendee_sync_logs(
        &self,
        attendee_id: &str,
        limit: u32,
    ) -> Result<Vec<SyncLog>, GatepassError>;

    /// Logs of one batch ordered by position.
    async fn batch_sync_logs(&self, batch_id: &str) -> Result<Vec<SyncLog>, GatepassError>;

    /// Most recent logs across all attendees, newest first.
    async fn recent_sync_logs(&self, limit: u32) -> Result<Vec<SyncLog>, GatepassError>;

    /// Like [`recent_sync_logs`](Self::recent_sync_logs), filtered by outcome.
    async fn recent_sync_logs_with_status(
        &self,
        status: LogStatus,
        limit: u32,
    ) -> Result<Vec<SyncLog>, GatepassError>;

    // --- Batches ---

    async fn create_batch(&self, batch: &SyncBatch) -> Result<(), GatepassError>;

    /// Writes the final aggregates. Fails if the batch is no longer `processing`.
    async fn complete_batch(
        &self,
        batch_id: &str,
        completion: &BatchCompletion,
    ) -> Result<(), GatepassError>;

    async fn get_batch(&self, batch_id: &str) -> Result<Option<SyncBatch>, GatepassError>;

    /// Most recent batches, newest first.
    async fn recent_batches(&self, limit: u32) -> Result<Vec<SyncBatch>, GatepassError>;

    /// Number of batches started on `day` (`YYYY-MM-DD`, UTC).
    async fn count_batches_on(&self, day: &str) -> Result<u32, GatepassError>;

    // --- Webhooks ---

    async fn insert_webhook_log(&self, log: &NewWebhookLog) -> Result<i64, GatepassError>;

    async fn finish_webhook_log(
        &self,
        id: i64,
        status: WebhookStatus,
        error: Option<&str>,
        processed_at: &str,
    ) -> Result<(), GatepassError>;

    async fn get_webhook_log(&self, id: i64) -> Result<Option<WebhookLog>, GatepassError>;

    // --- Profiles ---

    /// Inserts or replaces a profile. When `profile.is_active` is set, every
    /// other profile is deactivated in the same transaction.
    async fn upsert_profile(&self, profile: &StoredProfile) -> Result<(), GatepassError>;

    async fn get_profile(&self, name: &str) -> Result<Option<StoredProfile>, GatepassError>;

    async fn get_active_profile(&self) -> Result<Option<StoredProfile>, GatepassError>;
}
