// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sync orchestrator: drives attendees through the sync state machine.
//!
//! `unset -> pending -> syncing -> {synced | failed}`, with `failed -> syncing`
//! on retry, `failed -> pending` on reset and `synced -> unset` when the
//! external record is deleted. Every status change goes through a
//! compare-and-set on the store so two callers cannot sync the same attendee
//! at once.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use gatepass_client::{DeviceClient, DeviceResponse};
use gatepass_config::DeviceProfileConfig;
use gatepass_core::{
    Attendee, BatchCompletion, BatchStatus, BatchTrigger, GatepassError, LogStatus, NewSyncLog,
    SyncBatch, SyncLog, SyncStatus, SyncStore, SyncType,
};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::mapper::{self, MappingSettings, PersonRecord};

/// Code reported for every attendee of a chunk whose request failed outright.
pub const BATCH_ERROR: &str = "BATCH_ERROR";
/// Code reported for an attendee another caller is already syncing.
pub const SYNC_IN_PROGRESS: &str = "SYNC_IN_PROGRESS";
/// Code reported for a batch id that does not match any attendee.
pub const NOT_FOUND: &str = "NOT_FOUND";

const UNKNOWN_ERROR: &str = "Unknown error";

/// Profile values the orchestrator needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    pub batch_size: usize,
    pub library_id: String,
    pub library_type: String,
    pub validity_days: u32,
}

impl SyncOptions {
    pub fn from_profile(profile: &DeviceProfileConfig) -> Self {
        Self {
            batch_size: profile.batch_size.max(1) as usize,
            library_id: profile.library_id.clone(),
            library_type: profile.library_type.clone(),
            validity_days: profile.validity_days,
        }
    }

    fn mapping(&self) -> MappingSettings {
        MappingSettings {
            library_id: self.library_id.clone(),
            validity_days: self.validity_days,
        }
    }
}

/// Outcome for one attendee.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub success: bool,
    pub attendee_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl SyncResult {
    fn synced(attendee_id: &str, external_id: &str) -> Self {
        Self {
            success: true,
            attendee_id: attendee_id.to_string(),
            external_id: Some(external_id.to_string()),
            error_message: None,
            error_code: None,
        }
    }

    fn failed(attendee_id: &str, message: impl Into<String>, code: Option<&str>) -> Self {
        Self {
            success: false,
            attendee_id: attendee_id.to_string(),
            external_id: None,
            error_message: Some(message.into()),
            error_code: code.map(String::from),
        }
    }
}

/// Outcome of a batch run. `batch_id` is `None` when nothing was submitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSyncResult {
    pub batch_id: Option<String>,
    pub batch_number: Option<String>,
    pub status: Option<BatchStatus>,
    pub total_processed: u32,
    pub success_count: u32,
    pub failed_count: u32,
    pub results: Vec<SyncResult>,
    pub duration_ms: i64,
}

impl BatchSyncResult {
    fn empty() -> Self {
        Self {
            batch_id: None,
            batch_number: None,
            status: None,
            total_processed: 0,
            success_count: 0,
            failed_count: 0,
            results: Vec::new(),
            duration_ms: 0,
        }
    }
}

/// Sync fields of one attendee joined with its latest log row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendeeSyncStatus {
    pub attendee_id: String,
    pub sync_status: SyncStatus,
    pub external_person_id: Option<String>,
    pub last_synced_at: Option<String>,
    pub last_error: Option<String>,
    pub last_sync: Option<SyncLog>,
}

impl AttendeeSyncStatus {
    pub(crate) async fn read(
        store: &dyn SyncStore,
        attendee_id: &str,
    ) -> Result<Self, GatepassError> {
        let attendee =
            store
                .get_attendee(attendee_id)
                .await?
                .ok_or_else(|| GatepassError::NotFound {
                    entity: "attendee",
                    id: attendee_id.to_string(),
                })?;
        let last_sync = store.latest_sync_log(attendee_id).await?;
        Ok(Self {
            attendee_id: attendee.id,
            sync_status: attendee.sync_status,
            external_person_id: attendee.external_person_id,
            last_synced_at: attendee.last_synced_at,
            last_error: attendee.last_error,
            last_sync,
        })
    }
}

/// One attendee claimed for a batch request.
struct Claimed {
    position: u32,
    attendee: Attendee,
}

/// Drives single and batch synchronization against one external system.
pub struct SyncService {
    store: Arc<dyn SyncStore>,
    client: DeviceClient,
    options: SyncOptions,
}

impl SyncService {
    pub fn new(store: Arc<dyn SyncStore>, client: DeviceClient, options: SyncOptions) -> Self {
        Self {
            store,
            client,
            options,
        }
    }

    pub fn store(&self) -> &Arc<dyn SyncStore> {
        &self.store
    }

    pub fn client(&self) -> &DeviceClient {
        &self.client
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Probe the external system, failing when it cannot be reached.
    pub async fn initialize(&self) -> Result<(), GatepassError> {
        if self.client.test_connection().await {
            info!(base_url = self.client.base_url(), "connected to external system");
            Ok(())
        } else {
            Err(GatepassError::Transport {
                message: format!(
                    "failed to connect to external system at {}",
                    self.client.base_url()
                ),
                status: None,
                error_code: None,
                details: None,
            })
        }
    }

    /// Sync one attendee with an individual request.
    ///
    /// Already-synced attendees return their external id without a network
    /// call. Per-attendee failures are reported in the result; only storage
    /// errors and unknown attendees are returned as `Err`.
    pub async fn sync_one(&self, attendee_id: &str) -> Result<SyncResult, GatepassError> {
        let attendee = self.load(attendee_id).await?;

        if let Some(external_id) = synced_id(&attendee) {
            debug!(attendee_id, external_id, "attendee already synced");
            return Ok(SyncResult::synced(attendee_id, external_id));
        }

        if !self.claim(&attendee).await? {
            return Ok(SyncResult::failed(
                attendee_id,
                "attendee is already being synced",
                Some(SYNC_IN_PROGRESS),
            ));
        }

        let started = Instant::now();
        let person = mapper::to_person_record(&attendee, &self.options.mapping(), Utc::now());
        let request = json!({
            "faceLibType": self.options.library_type,
            "FDID": self.options.library_id,
            "person": person,
        });

        let outcome = self
            .client
            .post_exchange(&self.client.endpoints().person_single, request.clone())
            .await;
        let duration_ms = elapsed_ms(started);
        let completed_at = mapper::timestamp(Utc::now());

        match outcome {
            Ok(DeviceResponse {
                status: http_status,
                body: response,
            }) => {
                let external_id = response
                    .pointer("/data/personId")
                    .and_then(id_text)
                    .unwrap_or_else(|| person.employee_no.clone());

                self.store
                    .mark_synced(attendee_id, &external_id, &completed_at)
                    .await?;
                self.store
                    .insert_sync_log(&NewSyncLog {
                        attendee_id: attendee_id.to_string(),
                        sync_type: SyncType::Individual,
                        status: LogStatus::Success,
                        external_person_id: Some(external_id.clone()),
                        request_payload: Some(request),
                        response_payload: Some(response),
                        http_status: Some(http_status),
                        error_code: None,
                        error_message: None,
                        batch_id: None,
                        batch_position: None,
                        duration_ms,
                        created_at: completed_at.clone(),
                        completed_at,
                    })
                    .await?;

                info!(attendee_id, external_id = %external_id, duration_ms, "attendee synced");
                Ok(SyncResult::synced(attendee_id, &external_id))
            }
            Err(e) => {
                let message = failure_message(&e);
                self.store.mark_failed(attendee_id, &message).await?;
                self.store
                    .insert_sync_log(&NewSyncLog {
                        attendee_id: attendee_id.to_string(),
                        sync_type: SyncType::Individual,
                        status: LogStatus::Failed,
                        external_person_id: None,
                        request_payload: Some(request),
                        response_payload: e.details().cloned(),
                        http_status: e.http_status(),
                        error_code: e.error_code().map(String::from),
                        error_message: Some(message.clone()),
                        batch_id: None,
                        batch_position: None,
                        duration_ms,
                        created_at: completed_at.clone(),
                        completed_at,
                    })
                    .await?;

                warn!(attendee_id, error = %e, "attendee sync failed");
                Ok(SyncResult::failed(attendee_id, message, e.error_code()))
            }
        }
    }

    /// Sync many attendees in chunks of `batch_size`, one request per chunk.
    ///
    /// Repeated ids are processed once, at their first position. Results
    /// follow that order. The batch row is always completed unless a storage
    /// error interrupts the run.
    pub async fn sync_batch(
        &self,
        attendee_ids: &[String],
        trigger: BatchTrigger,
    ) -> Result<BatchSyncResult, GatepassError> {
        let attendee_ids = first_occurrences(attendee_ids);
        let attendee_ids = attendee_ids.as_slice();
        let started = Instant::now();
        let started_at = Utc::now();

        let batch = SyncBatch {
            id: uuid::Uuid::new_v4().to_string(),
            batch_number: self.next_batch_number(started_at).await?,
            trigger,
            status: BatchStatus::Processing,
            total_count: attendee_ids.len() as u32,
            success_count: 0,
            failed_count: 0,
            started_at: mapper::timestamp(started_at),
            completed_at: None,
            duration_ms: None,
        };
        self.store.create_batch(&batch).await?;
        info!(
            batch_id = %batch.id,
            batch_number = %batch.batch_number,
            total = attendee_ids.len(),
            %trigger,
            "batch sync started"
        );

        let mut slots: Vec<Option<SyncResult>> = vec![None; attendee_ids.len()];
        for (index, chunk) in attendee_ids.chunks(self.options.batch_size).enumerate() {
            let offset = index * self.options.batch_size;
            self.sync_chunk(&batch.id, offset, chunk, &mut slots).await?;
        }

        let results: Vec<SyncResult> = slots.into_iter().flatten().collect();
        let success_count = results.iter().filter(|r| r.success).count() as u32;
        let failed_count = results.len() as u32 - success_count;
        let status = BatchStatus::from_counts(success_count, failed_count);
        let duration_ms = elapsed_ms(started);

        self.store
            .complete_batch(
                &batch.id,
                &BatchCompletion {
                    status,
                    success_count,
                    failed_count,
                    completed_at: mapper::timestamp(Utc::now()),
                    duration_ms,
                },
            )
            .await?;
        info!(
            batch_id = %batch.id,
            %status,
            success_count,
            failed_count,
            duration_ms,
            "batch sync completed"
        );

        Ok(BatchSyncResult {
            batch_id: Some(batch.id),
            batch_number: Some(batch.batch_number),
            status: Some(status),
            total_processed: attendee_ids.len() as u32,
            success_count,
            failed_count,
            results,
            duration_ms,
        })
    }

    /// Batch-sync every attendee in `unset`, `pending` or `failed`.
    ///
    /// Creates no batch row when nothing is eligible.
    pub async fn sync_pending(
        &self,
        trigger: BatchTrigger,
    ) -> Result<BatchSyncResult, GatepassError> {
        let ids = self
            .store
            .list_attendee_ids_by_status(&SyncStatus::PENDING_ELIGIBLE)
            .await?;
        if ids.is_empty() {
            debug!("no attendees pending sync");
            return Ok(BatchSyncResult::empty());
        }
        self.sync_batch(&ids, trigger).await
    }

    /// Remove an attendee's record from the external system.
    ///
    /// Returns `false` when the attendee has no external id. Transport
    /// errors are propagated and leave the attendee untouched.
    pub async fn delete_one(&self, attendee_id: &str) -> Result<bool, GatepassError> {
        let attendee = self.load(attendee_id).await?;
        let Some(external_id) = attendee.external_person_id.as_deref() else {
            return Ok(false);
        };

        let path = format!("{}/{}", self.client.endpoints().person_delete, external_id);
        self.client.delete(&path).await?;
        self.store.clear_external(attendee_id).await?;

        info!(attendee_id, external_id, "external record deleted");
        Ok(true)
    }

    /// Move a `failed` attendee back to `pending`. Returns whether it moved.
    pub async fn reset(&self, attendee_id: &str) -> Result<bool, GatepassError> {
        self.load(attendee_id).await?;
        let moved = self
            .store
            .transition_status(attendee_id, SyncStatus::Failed, SyncStatus::Pending)
            .await?;
        if moved {
            info!(attendee_id, "attendee reset to pending");
        }
        Ok(moved)
    }

    /// Current sync fields plus the most recent log row.
    pub async fn sync_status(&self, attendee_id: &str) -> Result<AttendeeSyncStatus, GatepassError> {
        AttendeeSyncStatus::read(self.store.as_ref(), attendee_id).await
    }

    async fn load(&self, attendee_id: &str) -> Result<Attendee, GatepassError> {
        self.store
            .get_attendee(attendee_id)
            .await?
            .ok_or_else(|| GatepassError::NotFound {
                entity: "attendee",
                id: attendee_id.to_string(),
            })
    }

    /// Move an attendee into `syncing`. `false` means another caller holds
    /// it or its status changed underneath us.
    async fn claim(&self, attendee: &Attendee) -> Result<bool, GatepassError> {
        let id = attendee.id.as_str();
        match attendee.sync_status {
            SyncStatus::Pending | SyncStatus::Failed => {
                self.store
                    .transition_status(id, attendee.sync_status, SyncStatus::Syncing)
                    .await
            }
            SyncStatus::Unset | SyncStatus::Removed => {
                Ok(self
                    .store
                    .transition_status(id, attendee.sync_status, SyncStatus::Pending)
                    .await?
                    && self
                        .store
                        .transition_status(id, SyncStatus::Pending, SyncStatus::Syncing)
                        .await?)
            }
            SyncStatus::Syncing | SyncStatus::Synced => Ok(false),
        }
    }

    /// Process one chunk, writing each attendee's result into `slots`.
    async fn sync_chunk(
        &self,
        batch_id: &str,
        offset: usize,
        chunk: &[String],
        slots: &mut [Option<SyncResult>],
    ) -> Result<(), GatepassError> {
        let mut claimed = Vec::with_capacity(chunk.len());

        for (i, id) in chunk.iter().enumerate() {
            let position = offset + i;
            let Some(attendee) = self.store.get_attendee(id).await? else {
                slots[position] = Some(SyncResult::failed(id, "attendee not found", Some(NOT_FOUND)));
                continue;
            };
            if let Some(external_id) = synced_id(&attendee) {
                slots[position] = Some(SyncResult::synced(id, external_id));
                continue;
            }
            if self.claim(&attendee).await? {
                claimed.push(Claimed {
                    position: position as u32,
                    attendee,
                });
            } else {
                slots[position] = Some(SyncResult::failed(
                    id,
                    "attendee is already being synced",
                    Some(SYNC_IN_PROGRESS),
                ));
            }
        }

        if claimed.is_empty() {
            return Ok(());
        }

        let mapping = self.options.mapping();
        let now = Utc::now();
        let persons: Vec<PersonRecord> = claimed
            .iter()
            .map(|c| mapper::to_person_record(&c.attendee, &mapping, now))
            .collect();
        let request = json!({
            "faceLibType": self.options.library_type,
            "FDID": self.options.library_id,
            "employeeList": persons,
        });

        let started = Instant::now();
        let outcome = self
            .client
            .post_exchange(&self.client.endpoints().person_batch, request)
            .await;
        let duration_ms = elapsed_ms(started);

        match outcome {
            Ok(DeviceResponse {
                status: http_status,
                body: response,
            }) => {
                let items = response
                    .pointer("/data/results")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                // The external system answers positionally; there is no id
                // tying a result to its request item.
                for (index, (item, person)) in claimed.iter().zip(&persons).enumerate() {
                    let reply = ItemReply {
                        result: items.get(index),
                        http_status,
                        duration_ms,
                    };
                    self.apply_item(batch_id, item, person, reply, slots).await?;
                }
            }
            Err(e) => {
                let message = failure_message(&e);
                warn!(batch_id, size = claimed.len(), error = %e, "batch chunk failed");
                for (item, person) in claimed.iter().zip(&persons) {
                    let id = item.attendee.id.as_str();
                    self.store.mark_failed(id, &message).await?;
                    self.write_batch_log(BatchLog {
                        batch_id,
                        item,
                        person,
                        status: LogStatus::Failed,
                        external_id: None,
                        response: e.details().cloned(),
                        http_status: e.http_status(),
                        error_code: Some(BATCH_ERROR.to_string()),
                        error_message: Some(message.clone()),
                        duration_ms,
                    })
                    .await?;
                    slots[item.position as usize] =
                        Some(SyncResult::failed(id, message.clone(), Some(BATCH_ERROR)));
                }
            }
        }
        Ok(())
    }

    async fn apply_item(
        &self,
        batch_id: &str,
        item: &Claimed,
        person: &PersonRecord,
        reply: ItemReply<'_>,
        slots: &mut [Option<SyncResult>],
    ) -> Result<(), GatepassError> {
        let ItemReply {
            result,
            http_status,
            duration_ms,
        } = reply;
        let id = item.attendee.id.as_str();
        let succeeded = result
            .and_then(|r| r.get("success"))
            .and_then(Value::as_bool)
            .unwrap_or(false);

        if succeeded {
            let external_id = result
                .and_then(|r| r.get("personId"))
                .and_then(id_text)
                .unwrap_or_else(|| person.employee_no.clone());
            self.store
                .mark_synced(id, &external_id, &mapper::timestamp(Utc::now()))
                .await?;
            self.write_batch_log(BatchLog {
                batch_id,
                item,
                person,
                status: LogStatus::Success,
                external_id: Some(external_id.clone()),
                response: result.cloned(),
                http_status: Some(http_status),
                error_code: None,
                error_message: None,
                duration_ms,
            })
            .await?;
            slots[item.position as usize] = Some(SyncResult::synced(id, &external_id));
        } else {
            let message = result
                .and_then(|r| r.get("errorMessage"))
                .and_then(Value::as_str)
                .unwrap_or(UNKNOWN_ERROR)
                .to_string();
            let code = result.and_then(|r| r.get("errorCode")).and_then(id_text);
            self.store.mark_failed(id, &message).await?;
            self.write_batch_log(BatchLog {
                batch_id,
                item,
                person,
                status: LogStatus::Failed,
                external_id: None,
                response: result.cloned(),
                http_status: Some(http_status),
                error_code: code.clone(),
                error_message: Some(message.clone()),
                duration_ms,
            })
            .await?;
            slots[item.position as usize] = Some(SyncResult::failed(id, message, code.as_deref()));
        }
        Ok(())
    }

    async fn write_batch_log(&self, log: BatchLog<'_>) -> Result<(), GatepassError> {
        let completed_at = mapper::timestamp(Utc::now());
        let request = serde_json::to_value(log.person)
            .map_err(|e| GatepassError::Internal(format!("failed to encode person record: {e}")))?;
        self.store
            .insert_sync_log(&NewSyncLog {
                attendee_id: log.item.attendee.id.clone(),
                sync_type: SyncType::Batch,
                status: log.status,
                external_person_id: log.external_id,
                request_payload: Some(request),
                response_payload: log.response,
                http_status: log.http_status,
                error_code: log.error_code,
                error_message: log.error_message,
                batch_id: Some(log.batch_id.to_string()),
                batch_position: Some(log.item.position),
                duration_ms: log.duration_ms,
                created_at: completed_at.clone(),
                completed_at,
            })
            .await?;
        Ok(())
    }

    /// `BATCH-YYYYMMDD-NNNN`, numbered per UTC day.
    async fn next_batch_number(&self, at: DateTime<Utc>) -> Result<String, GatepassError> {
        let day = at.format("%Y-%m-%d").to_string();
        let sequence = self.store.count_batches_on(&day).await? + 1;
        Ok(format!("BATCH-{}-{sequence:04}", at.format("%Y%m%d")))
    }
}

/// One positional item of a batch response.
struct ItemReply<'a> {
    result: Option<&'a Value>,
    http_status: u16,
    duration_ms: i64,
}

struct BatchLog<'a> {
    batch_id: &'a str,
    item: &'a Claimed,
    person: &'a PersonRecord,
    status: LogStatus,
    external_id: Option<String>,
    response: Option<Value>,
    http_status: Option<u16>,
    error_code: Option<String>,
    error_message: Option<String>,
    duration_ms: i64,
}

fn first_occurrences(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

fn synced_id(attendee: &Attendee) -> Option<&str> {
    match attendee.sync_status {
        SyncStatus::Synced => attendee.external_person_id.as_deref(),
        _ => None,
    }
}

/// External ids and codes arrive as strings or numbers.
fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Message stored on the attendee: the external system's own message when
/// it sent one, otherwise the error's display text.
fn failure_message(error: &GatepassError) -> String {
    match error {
        GatepassError::Transport { message, .. } => message.clone(),
        other => other.to_string(),
    }
}

fn elapsed_ms(started: Instant) -> i64 {
    started.elapsed().as_millis() as i64
}
