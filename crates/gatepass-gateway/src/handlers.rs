// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::HeaderMap,
};
use gatepass_config::DeviceProfileConfig;
use gatepass_core::{BatchTrigger, SyncLog};
use gatepass_sync::{
    AttendeeSyncStatus, BatchDetail, BatchSyncResult, ProfileStore, ProfileView, SyncErrorReport,
    SyncOverview, SyncResult, SyncService, WebhookReceipt,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;
use crate::server::GatewayState;

/// History rows returned with an attendee's sync status unless overridden.
const DEFAULT_HISTORY: u32 = 20;

/// Failed attendees listed by the error report unless overridden.
const DEFAULT_ERRORS: u32 = 50;

/// Header values replaced before a webhook delivery is audited.
const CREDENTIAL_HEADERS: [&str; 5] = [
    "authorization",
    "cookie",
    "proxy-authorization",
    "x-api-key",
    "x-signature",
];

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Request body for POST /v1/webhooks/events.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    pub event_type: String,
    #[serde(default)]
    pub event_data: Value,
}

/// Request body for POST /v1/sync/batch.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    pub attendee_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileQuery {
    #[serde(default)]
    pub activate: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct OverviewQuery {
    #[serde(default)]
    pub probe: bool,
}

/// Response body for GET /v1/attendees/{id}/sync-status.
#[derive(Debug, Serialize)]
pub struct AttendeeStatusResponse {
    #[serde(flatten)]
    pub status: AttendeeSyncStatus,
    pub history: Vec<SyncLog>,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub reset: bool,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

fn sync_service(state: &GatewayState) -> Result<&Arc<SyncService>, ApiError> {
    state
        .sync
        .as_ref()
        .ok_or(ApiError::Unavailable("device profile"))
}

fn profile_store(state: &GatewayState) -> Result<&Arc<ProfileStore>, ApiError> {
    state
        .profiles
        .as_ref()
        .ok_or(ApiError::Unavailable("credential vault"))
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.started.elapsed().as_secs(),
    })
}

/// POST /v1/webhooks/events
///
/// Always acknowledges; processing failures are reported in the receipt.
pub async fn post_webhook_event(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Json(event): Json<WebhookEvent>,
) -> Json<WebhookReceipt> {
    Json(
        state
            .webhooks
            .handle(&event.event_type, event.event_data, audit_headers(&headers))
            .await,
    )
}

/// Lowercased header map for the audit log, with credential values redacted.
fn audit_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            let name = name.as_str().to_ascii_lowercase();
            if CREDENTIAL_HEADERS.contains(&name.as_str()) {
                return Some((name, "[REDACTED]".to_string()));
            }
            value.to_str().ok().map(|v| (name, v.to_string()))
        })
        .collect()
}

/// POST /v1/attendees/{id}/sync
pub async fn post_sync_attendee(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<SyncResult>, ApiError> {
    Ok(Json(sync_service(&state)?.sync_one(&id).await?))
}

/// POST /v1/attendees/{id}/reset
pub async fn post_reset_attendee(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<ResetResponse>, ApiError> {
    let reset = sync_service(&state)?.reset(&id).await?;
    Ok(Json(ResetResponse { reset }))
}

/// DELETE /v1/attendees/{id}/external
pub async fn delete_external_person(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let deleted = sync_service(&state)?.delete_one(&id).await?;
    Ok(Json(DeleteResponse { deleted }))
}

/// GET /v1/attendees/{id}/sync-status
///
/// Reads only the store, so it works without a device profile.
pub async fn get_attendee_sync_status(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<AttendeeStatusResponse>, ApiError> {
    let history = state
        .status
        .attendee_history(&id, query.limit.unwrap_or(DEFAULT_HISTORY))
        .await?;
    let status = state.status.attendee_status(&id).await?;
    Ok(Json(AttendeeStatusResponse { status, history }))
}

/// POST /v1/sync/batch
pub async fn post_sync_batch(
    State(state): State<GatewayState>,
    Json(body): Json<BatchRequest>,
) -> Result<Json<BatchSyncResult>, ApiError> {
    let service = sync_service(&state)?;
    Ok(Json(
        service
            .sync_batch(&body.attendee_ids, BatchTrigger::Manual)
            .await?,
    ))
}

/// POST /v1/sync/pending
pub async fn post_sync_pending(
    State(state): State<GatewayState>,
) -> Result<Json<BatchSyncResult>, ApiError> {
    let service = sync_service(&state)?;
    Ok(Json(service.sync_pending(BatchTrigger::Pending).await?))
}

/// GET /v1/sync/status
pub async fn get_sync_overview(
    State(state): State<GatewayState>,
    Query(query): Query<OverviewQuery>,
) -> Result<Json<SyncOverview>, ApiError> {
    Ok(Json(state.status.overview(query.probe).await?))
}

/// GET /v1/sync/errors
pub async fn get_sync_errors(
    State(state): State<GatewayState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<SyncErrorReport>, ApiError> {
    Ok(Json(
        state
            .status
            .sync_errors(query.limit.unwrap_or(DEFAULT_ERRORS))
            .await?,
    ))
}

/// GET /v1/sync/batches/{id}
pub async fn get_batch_detail(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<BatchDetail>, ApiError> {
    Ok(Json(state.status.batch_detail(&id).await?))
}

/// GET /v1/profiles/{name}
pub async fn get_profile(
    State(state): State<GatewayState>,
    Path(name): Path<String>,
) -> Result<Json<ProfileView>, ApiError> {
    let view = profile_store(&state)?.view(&name).await?;
    view.map(Json).ok_or_else(|| {
        ApiError::from(gatepass_core::GatepassError::NotFound {
            entity: "profile",
            id: name,
        })
    })
}

/// PUT /v1/profiles
///
/// Credentials omitted from the body keep their stored values.
pub async fn put_profile(
    State(state): State<GatewayState>,
    Query(query): Query<ProfileQuery>,
    Json(profile): Json<DeviceProfileConfig>,
) -> Result<Json<ProfileView>, ApiError> {
    Ok(Json(
        profile_store(&state)?.save(&profile, query.activate).await?,
    ))
}
