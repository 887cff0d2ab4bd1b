// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-side aggregation of sync state.

use std::collections::BTreeMap;
use std::sync::Arc;

use gatepass_client::DeviceClient;
use gatepass_core::{
    Attendee, ConnectionStatus, GatepassError, LogStatus, SyncBatch, SyncLog, SyncStatus, SyncStore,
};
use serde::Serialize;

use crate::profiles::ProfileView;
use crate::service::AttendeeSyncStatus;

/// Batches included in an overview.
pub const RECENT_BATCHES: u32 = 10;
/// Log rows included in an overview.
pub const RECENT_LOGS: u32 = 20;

/// Dashboard snapshot of the sync subsystem.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOverview {
    /// Attendee count for every status, zero-filled.
    pub counts: BTreeMap<String, u64>,
    pub total_attendees: u64,
    pub recent_batches: Vec<SyncBatch>,
    pub recent_logs: Vec<SyncLog>,
    pub connection: ConnectionStatus,
    pub profile: Option<ProfileView>,
}

/// A batch with its log rows in submission order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDetail {
    pub batch: SyncBatch,
    pub logs: Vec<SyncLog>,
}

/// Failed log rows included in an error report.
pub const RECENT_ERRORS: u32 = 20;

/// An attendee whose last sync attempt failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedAttendee {
    pub id: String,
    pub name: String,
    pub event_code: Option<String>,
    pub last_error: Option<String>,
    pub last_synced_at: Option<String>,
    pub updated_at: String,
}

impl From<Attendee> for FailedAttendee {
    fn from(a: Attendee) -> Self {
        Self {
            id: a.id,
            name: a.name,
            event_code: a.event_code,
            last_error: a.last_error,
            last_synced_at: a.last_synced_at,
            updated_at: a.updated_at,
        }
    }
}

/// Failed attendees with their stored errors and the latest failed log rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncErrorReport {
    /// Every attendee currently in `failed`, including those beyond `attendees`.
    pub total_errors: u64,
    pub attendees: Vec<FailedAttendee>,
    pub recent_errors: Vec<SyncLog>,
}

/// Read-only queries over the store, plus an optional live probe.
pub struct StatusService {
    store: Arc<dyn SyncStore>,
    client: Option<DeviceClient>,
}

impl StatusService {
    pub fn new(store: Arc<dyn SyncStore>, client: Option<DeviceClient>) -> Self {
        Self { store, client }
    }

    /// Counts, recent activity and, when `probe` is set and a client is
    /// configured, the live connection state. Probe failures never error.
    pub async fn overview(&self, probe: bool) -> Result<SyncOverview, GatepassError> {
        let mut counts: BTreeMap<String, u64> = [
            SyncStatus::Unset,
            SyncStatus::Pending,
            SyncStatus::Syncing,
            SyncStatus::Synced,
            SyncStatus::Failed,
            SyncStatus::Removed,
        ]
        .into_iter()
        .map(|s| (s.to_string(), 0))
        .collect();
        for row in self.store.status_counts().await? {
            counts.insert(row.status.to_string(), row.count);
        }
        let total_attendees = counts.values().sum();

        let connection = match (&self.client, probe) {
            (Some(client), true) => {
                if client.test_connection().await {
                    ConnectionStatus::Connected
                } else {
                    ConnectionStatus::Disconnected
                }
            }
            _ => ConnectionStatus::Unknown,
        };

        Ok(SyncOverview {
            counts,
            total_attendees,
            recent_batches: self.store.recent_batches(RECENT_BATCHES).await?,
            recent_logs: self.store.recent_sync_logs(RECENT_LOGS).await?,
            connection,
            profile: self
                .store
                .get_active_profile()
                .await?
                .as_ref()
                .map(ProfileView::from),
        })
    }

    /// Up to `limit` failed attendees, most recently updated first.
    pub async fn sync_errors(&self, limit: u32) -> Result<SyncErrorReport, GatepassError> {
        let total_errors = self
            .store
            .status_counts()
            .await?
            .into_iter()
            .find(|row| row.status == SyncStatus::Failed)
            .map_or(0, |row| row.count);
        let attendees = self
            .store
            .list_attendees_by_status(SyncStatus::Failed, limit)
            .await?
            .into_iter()
            .map(FailedAttendee::from)
            .collect();
        let recent_errors = self
            .store
            .recent_sync_logs_with_status(LogStatus::Failed, RECENT_ERRORS)
            .await?;
        Ok(SyncErrorReport {
            total_errors,
            attendees,
            recent_errors,
        })
    }

    pub async fn batch_detail(&self, batch_id: &str) -> Result<BatchDetail, GatepassError> {
        let batch = self
            .store
            .get_batch(batch_id)
            .await?
            .ok_or_else(|| GatepassError::NotFound {
                entity: "batch",
                id: batch_id.to_string(),
            })?;
        let logs = self.store.batch_sync_logs(batch_id).await?;
        Ok(BatchDetail { batch, logs })
    }

    /// Sync fields and latest log row for one attendee.
    pub async fn attendee_status(
        &self,
        attendee_id: &str,
    ) -> Result<AttendeeSyncStatus, GatepassError> {
        AttendeeSyncStatus::read(self.store.as_ref(), attendee_id).await
    }

    /// Most recent log rows for one attendee, newest first.
    pub async fn attendee_history(
        &self,
        attendee_id: &str,
        limit: u32,
    ) -> Result<Vec<SyncLog>, GatepassError> {
        if self.store.get_attendee(attendee_id).await?.is_none() {
            return Err(GatepassError::NotFound {
                entity: "attendee",
                id: attendee_id.to_string(),
            });
        }
        self.store.attendee_sync_logs(attendee_id, limit).await
    }
}
