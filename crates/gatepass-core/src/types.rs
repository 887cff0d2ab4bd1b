// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the store, the orchestrator, and the HTTP boundary.
//!
//! Timestamps are RFC 3339 strings with millisecond precision in UTC, the
//! same representation SQLite stores and the external system receives.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Synchronization state of one attendee.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Unset,
    Pending,
    Syncing,
    Synced,
    Failed,
    Removed,
}

impl SyncStatus {
    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: SyncStatus) -> bool {
        use SyncStatus::*;
        matches!(
            (self, next),
            (Unset, Pending)
                | (Removed, Pending)
                | (Pending, Syncing)
                | (Failed, Syncing)
                | (Failed, Pending)
                | (Syncing, Synced)
                | (Syncing, Failed)
                | (Synced, Unset)
        )
    }

    /// States picked up by a pending sweep.
    pub fn is_pending_eligible(self) -> bool {
        matches!(self, SyncStatus::Unset | SyncStatus::Pending | SyncStatus::Failed)
    }

    /// All states selected by a pending sweep.
    pub const PENDING_ELIGIBLE: [SyncStatus; 3] =
        [SyncStatus::Unset, SyncStatus::Pending, SyncStatus::Failed];
}

/// Whether a sync log row belongs to an individual call or a batch.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SyncType {
    Individual,
    Batch,
}

/// Outcome recorded on a sync log row.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Success,
    Failed,
}

/// Lifecycle of a batch run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Processing,
    Completed,
    Partial,
    Failed,
}

impl BatchStatus {
    /// Final status for a batch given its aggregate counts.
    pub fn from_counts(success: u32, failed: u32) -> Self {
        if failed == 0 {
            BatchStatus::Completed
        } else if success == 0 {
            BatchStatus::Failed
        } else {
            BatchStatus::Partial
        }
    }
}

/// What started a batch run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BatchTrigger {
    Manual,
    Pending,
    Auto,
}

/// Processing state of an inbound webhook event.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WebhookStatus {
    Received,
    Processed,
    Failed,
}

/// Result of a live connectivity probe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    Unknown,
}

/// How requests to the external system authenticate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    /// HMAC-SHA256 request signing with an API key and secret.
    ApiKey,
    /// RFC 2617 challenge/response with username and password.
    Digest,
}

/// Paths of the external endpoints, relative to `{base_url}{api_version}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointMap {
    #[serde(default = "default_person_single")]
    pub person_single: String,
    #[serde(default = "default_person_batch")]
    pub person_batch: String,
    #[serde(default = "default_person_delete")]
    pub person_delete: String,
    #[serde(default = "default_system_status")]
    pub system_status: String,
}

impl Default for EndpointMap {
    fn default() -> Self {
        Self {
            person_single: default_person_single(),
            person_batch: default_person_batch(),
            person_delete: default_person_delete(),
            system_status: default_system_status(),
        }
    }
}

fn default_person_single() -> String {
    "/person/single".to_string()
}

fn default_person_batch() -> String {
    "/person/batch".to_string()
}

fn default_person_delete() -> String {
    "/person/delete".to_string()
}

fn default_system_status() -> String {
    "/system/status".to_string()
}

/// An attendee as the sync core sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    pub id: String,
    pub name: String,
    pub national_id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub face_image_url: Option<String>,
    pub event_code: Option<String>,
    pub consent_date: Option<String>,
    pub sync_status: SyncStatus,
    pub external_person_id: Option<String>,
    pub last_synced_at: Option<String>,
    pub last_error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Identity fields supplied by the registration system when an attendee is created.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAttendee {
    pub id: String,
    pub name: String,
    pub national_id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub face_image_url: Option<String>,
    pub event_code: Option<String>,
    pub consent_date: Option<String>,
}

/// One persisted sync attempt. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncLog {
    pub id: i64,
    pub attendee_id: String,
    pub sync_type: SyncType,
    pub status: LogStatus,
    pub external_person_id: Option<String>,
    pub request_payload: Option<serde_json::Value>,
    pub response_payload: Option<serde_json::Value>,
    pub http_status: Option<u16>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub batch_id: Option<String>,
    pub batch_position: Option<u32>,
    pub duration_ms: i64,
    pub created_at: String,
    pub completed_at: String,
}

/// A sync log row before insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSyncLog {
    pub attendee_id: String,
    pub sync_type: SyncType,
    pub status: LogStatus,
    pub external_person_id: Option<String>,
    pub request_payload: Option<serde_json::Value>,
    pub response_payload: Option<serde_json::Value>,
    pub http_status: Option<u16>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub batch_id: Option<String>,
    pub batch_position: Option<u32>,
    pub duration_ms: i64,
    pub created_at: String,
    pub completed_at: String,
}

/// One multi-attendee sync run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncBatch {
    pub id: String,
    pub batch_number: String,
    pub trigger: BatchTrigger,
    pub status: BatchStatus,
    pub total_count: u32,
    pub success_count: u32,
    pub failed_count: u32,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub duration_ms: Option<i64>,
}

/// Final aggregates written once when a batch finishes.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchCompletion {
    pub status: BatchStatus,
    pub success_count: u32,
    pub failed_count: u32,
    pub completed_at: String,
    pub duration_ms: i64,
}

/// An inbound webhook event as recorded for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookLog {
    pub id: i64,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub headers: BTreeMap<String, String>,
    pub source_ip: Option<String>,
    pub status: WebhookStatus,
    pub error: Option<String>,
    pub received_at: String,
    pub processed_at: Option<String>,
}

/// A webhook event before insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewWebhookLog {
    pub event_type: String,
    pub payload: serde_json::Value,
    pub headers: BTreeMap<String, String>,
    pub source_ip: Option<String>,
    pub received_at: String,
}

/// Number of attendees currently in one sync state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: SyncStatus,
    pub count: u64,
}

/// A device profile as persisted: credential columns hold
/// `nonce_hex:ciphertext_hex` blobs, never plaintext.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredProfile {
    pub name: String,
    pub base_url: String,
    pub api_version: String,
    pub auth_type: AuthType,
    pub username: Option<String>,
    pub password_enc: Option<String>,
    pub api_key_enc: Option<String>,
    pub api_secret_enc: Option<String>,
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
