// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound event ingestion from the external system.
//!
//! Every event is recorded before it is dispatched, and the ingestor never
//! fails: the sender always gets an acknowledgement.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use gatepass_core::{GatepassError, NewWebhookLog, SyncStore, WebhookStatus};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::mapper::timestamp;

pub const FACE_RECOGNITION_EVENT: &str = "FaceRecognitionEvent";
pub const ACCESS_CONTROLLER_EVENT: &str = "AccessControllerEvent";

/// Processes one event type.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event_data: &Value) -> Result<(), GatepassError>;
}

/// Logs face recognition matches.
pub struct FaceRecognitionHandler;

#[async_trait]
impl EventHandler for FaceRecognitionHandler {
    async fn handle(&self, event_data: &Value) -> Result<(), GatepassError> {
        let data = event_object(event_data, FACE_RECOGNITION_EVENT)?;
        let employee_no = field_text(data, "employeeNo");
        let device = field_text(data, "deviceId");
        let time = field_text(data, "time");
        info!(
            employee_no = employee_no.as_deref(),
            device = device.as_deref(),
            time = time.as_deref(),
            "face recognition event"
        );
        Ok(())
    }
}

/// Logs door and controller events.
pub struct AccessControllerHandler;

#[async_trait]
impl EventHandler for AccessControllerHandler {
    async fn handle(&self, event_data: &Value) -> Result<(), GatepassError> {
        let data = event_object(event_data, ACCESS_CONTROLLER_EVENT)?;
        let employee_no = field_text(data, "employeeNo");
        let door = field_text(data, "doorNo");
        let event = field_text(data, "eventType");
        info!(
            employee_no = employee_no.as_deref(),
            door = door.as_deref(),
            event = event.as_deref(),
            "access controller event"
        );
        Ok(())
    }
}

fn event_object<'a>(
    data: &'a Value,
    event_type: &str,
) -> Result<&'a serde_json::Map<String, Value>, GatepassError> {
    data.as_object().ok_or_else(|| {
        GatepassError::Validation(format!("{event_type} data must be a JSON object"))
    })
}

fn field_text(data: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    match data.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Client address as reported by the proxy headers.
///
/// `headers` keys are expected lowercase.
pub fn source_ip(headers: &BTreeMap<String, String>) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        })
        .map(String::from)
}

/// What happened to one inbound event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookReceipt {
    /// `None` when the event could not be recorded.
    pub log_id: Option<i64>,
    pub status: WebhookStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Records inbound events and dispatches them by type.
pub struct WebhookIngestor {
    store: Arc<dyn SyncStore>,
    handlers: HashMap<String, Arc<dyn EventHandler>>,
}

impl WebhookIngestor {
    /// Ingestor with the built-in handlers registered.
    pub fn new(store: Arc<dyn SyncStore>) -> Self {
        let mut ingestor = Self::without_handlers(store);
        ingestor.register(FACE_RECOGNITION_EVENT, Arc::new(FaceRecognitionHandler));
        ingestor.register(ACCESS_CONTROLLER_EVENT, Arc::new(AccessControllerHandler));
        ingestor
    }

    pub fn without_handlers(store: Arc<dyn SyncStore>) -> Self {
        Self {
            store,
            handlers: HashMap::new(),
        }
    }

    /// Register or replace the handler for `event_type`.
    pub fn register(&mut self, event_type: &str, handler: Arc<dyn EventHandler>) {
        self.handlers.insert(event_type.to_string(), handler);
    }

    /// Record, dispatch and finish one event. Never fails.
    pub async fn handle(
        &self,
        event_type: &str,
        payload: Value,
        headers: BTreeMap<String, String>,
    ) -> WebhookReceipt {
        let log = NewWebhookLog {
            event_type: event_type.to_string(),
            source_ip: source_ip(&headers),
            payload: payload.clone(),
            headers,
            received_at: timestamp(Utc::now()),
        };
        let log_id = match self.store.insert_webhook_log(&log).await {
            Ok(id) => Some(id),
            Err(e) => {
                error!(event_type, error = %e, "failed to record webhook event");
                None
            }
        };

        let outcome = match self.handlers.get(event_type) {
            Some(handler) => handler.handle(&payload).await,
            None => {
                warn!(event_type, "unhandled webhook event type");
                Ok(())
            }
        };

        let (status, error) = match outcome {
            Ok(()) => (WebhookStatus::Processed, None),
            Err(e) => {
                warn!(event_type, error = %e, "webhook event processing failed");
                (WebhookStatus::Failed, Some(e.to_string()))
            }
        };

        if let Some(id) = log_id {
            let finished = self
                .store
                .finish_webhook_log(id, status, error.as_deref(), &timestamp(Utc::now()))
                .await;
            if let Err(e) = finished {
                error!(log_id = id, error = %e, "failed to finish webhook log");
            }
        }

        WebhookReceipt {
            log_id,
            status,
            error,
        }
    }
}
