// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the assembled service.
//!
//! Each test creates an isolated TestHarness (temp SQLite plus a mock device)
//! and wires the same components `gatepass serve` does. Tests are independent
//! and order-insensitive.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use gatepass_core::{BatchTrigger, SyncStatus, SyncStore};
use gatepass_gateway::{AuthConfig, GatewayState, build_router, start_server};
use gatepass_sync::{
    StatusService, SyncOptions, SyncService, WebhookIngestor, spawn_auto_sync,
};
use gatepass_test_utils::TestHarness;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

fn service(harness: &TestHarness) -> Arc<SyncService> {
    Arc::new(SyncService::new(
        harness.store(),
        harness.client().unwrap(),
        SyncOptions::from_profile(harness.profile()),
    ))
}

fn gateway(harness: &TestHarness, sync: Arc<SyncService>) -> GatewayState {
    GatewayState {
        sync: Some(sync),
        status: Arc::new(StatusService::new(
            harness.store(),
            Some(harness.client().unwrap()),
        )),
        webhooks: Arc::new(WebhookIngestor::new(harness.store())),
        profiles: None,
        auth: AuthConfig::bearer("t"),
        started: std::time::Instant::now(),
    }
}

async fn status_of(harness: &TestHarness, id: &str) -> SyncStatus {
    harness
        .store()
        .get_attendee(id)
        .await
        .unwrap()
        .unwrap()
        .sync_status
}

// ---- Registration to access grant ----

#[tokio::test]
async fn attendees_flow_from_registration_to_synced() {
    let harness = TestHarness::start().await.unwrap();
    for (id, name) in [("a-1", "Ana"), ("b-2", "Bruno"), ("c-3", "Carla")] {
        harness.add_attendee(id, name).await.unwrap();
        harness
            .store()
            .transition_status(id, SyncStatus::Unset, SyncStatus::Pending)
            .await
            .unwrap();
    }
    harness
        .device
        .respond_batch(json!([
            {"success": true, "personId": "HC-1"},
            {"success": true, "personId": "HC-2"},
            {"success": true, "personId": "HC-3"}
        ]))
        .await;

    let sync = service(&harness);
    let result = sync.sync_pending(BatchTrigger::Pending).await.unwrap();
    assert_eq!(result.total_processed, 3);
    assert_eq!(result.success_count, 3);
    for id in ["a-1", "b-2", "c-3"] {
        assert_eq!(status_of(&harness, id).await, SyncStatus::Synced);
    }
    assert_eq!(harness.device.requests_to("/person/batch").await.len(), 1);
    let c3 = harness.store().get_attendee("c-3").await.unwrap().unwrap();
    assert_eq!(c3.external_person_id.as_deref(), Some("HC-3"));

    // Nothing left to do.
    let again = sync.sync_pending(BatchTrigger::Pending).await.unwrap();
    assert_eq!(again.total_processed, 0);
}

#[tokio::test]
async fn failed_attendee_recovers_after_reset() {
    let harness = TestHarness::start().await.unwrap();
    harness.add_attendee("a-1", "Ana").await.unwrap();
    harness
        .device
        .reject_single(400, "INVALID_FACE", "face not detected")
        .await;

    let sync = service(&harness);
    let first = sync.sync_one("a-1").await.unwrap();
    assert!(!first.success);
    assert_eq!(first.error_code.as_deref(), Some("INVALID_FACE"));
    assert_eq!(status_of(&harness, "a-1").await, SyncStatus::Failed);

    assert!(sync.reset("a-1").await.unwrap());
    assert_eq!(status_of(&harness, "a-1").await, SyncStatus::Pending);

    harness.device.server().reset().await;
    harness.device.accept_single("HC-9").await;
    let second = sync.sync_one("a-1").await.unwrap();
    assert!(second.success);

    let history = harness.store().attendee_sync_logs("a-1", 10).await.unwrap();
    assert_eq!(history.len(), 2);
}

// ---- Auto-sync loop ----

#[tokio::test]
async fn auto_sync_sweeps_pending_until_cancelled() {
    let harness = TestHarness::start().await.unwrap();
    harness.add_attendee("a-1", "Ana").await.unwrap();
    harness
        .store()
        .transition_status("a-1", SyncStatus::Unset, SyncStatus::Pending)
        .await
        .unwrap();
    harness
        .device
        .respond_batch(json!([{"success": true, "personId": "HC-1"}]))
        .await;

    let cancel = CancellationToken::new();
    let handle = spawn_auto_sync(service(&harness), Duration::from_millis(50), cancel.clone());

    let mut synced = false;
    for _ in 0..40 {
        tokio::time::sleep(Duration::from_millis(25)).await;
        if status_of(&harness, "a-1").await == SyncStatus::Synced {
            synced = true;
            break;
        }
    }
    cancel.cancel();
    handle.await.unwrap();
    assert!(synced, "auto-sync never picked up the pending attendee");

    let batches = harness.store().recent_batches(5).await.unwrap();
    assert_eq!(batches[0].trigger, BatchTrigger::Auto);
}

// ---- HTTP boundary ----

#[tokio::test]
async fn gateway_batch_then_status_over_http() {
    let harness = TestHarness::start().await.unwrap();
    harness.add_attendee("a-1", "Ana").await.unwrap();
    harness
        .device
        .respond_batch(json!([{"success": true, "personId": "HC-1"}]))
        .await;
    harness.device.status_ok().await;

    let app = build_router(gateway(&harness, service(&harness)));
    let response = app
        .clone()
        .oneshot(
            Request::post("/v1/sync/batch")
                .header("authorization", "Bearer t")
                .header("content-type", "application/json")
                .body(Body::from(json!({"attendeeIds": ["a-1"]}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::get("/v1/sync/status?probe=true")
                .header("authorization", "Bearer t")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["counts"]["synced"], 1);
    assert_eq!(body["connection"], "connected");
    assert_eq!(body["recentBatches"][0]["status"], "completed");
}

#[tokio::test]
async fn server_stops_on_cancellation() {
    let harness = TestHarness::start().await.unwrap();
    let state = gateway(&harness, service(&harness));
    let cancel = CancellationToken::new();
    let config = gatepass_gateway::ServerConfig {
        host: "127.0.0.1".into(),
        port: 0,
    };

    let server = tokio::spawn({
        let cancel = cancel.clone();
        async move { start_server(&config, state, cancel).await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();

    let outcome = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server did not stop")
        .unwrap();
    assert!(outcome.is_ok());
}

#[tokio::test]
async fn webhook_events_are_audited() {
    let harness = TestHarness::start().await.unwrap();
    let app = build_router(gateway(&harness, service(&harness)));

    for event in ["FaceRecognitionEvent", "DoorbellEvent"] {
        let response = app
            .clone()
            .oneshot(
                Request::post("/v1/webhooks/events")
                    .header("content-type", "application/json")
                    .header("x-real-ip", "192.168.1.64")
                    .body(Body::from(
                        json!({"eventType": event, "eventData": {"employeeNo": "a1"}})
                            .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let first = harness.store().get_webhook_log(1).await.unwrap().unwrap();
    assert_eq!(first.event_type, "FaceRecognitionEvent");
    assert_eq!(first.source_ip.as_deref(), Some("192.168.1.64"));
    let second = harness.store().get_webhook_log(2).await.unwrap().unwrap();
    assert_eq!(second.status, gatepass_core::WebhookStatus::Processed);
}
