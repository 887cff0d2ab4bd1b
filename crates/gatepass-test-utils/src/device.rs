// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted stand-in for the external access-control system.

use serde_json::{Value, json};
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// API version prefix used by harness profiles.
pub const API_VERSION: &str = "/api/acs/v1";

/// A wiremock server speaking the external person API.
pub struct MockDevice {
    server: MockServer,
}

impl MockDevice {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL without the API version prefix.
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn server(&self) -> &MockServer {
        &self.server
    }

    fn endpoint(suffix: &str) -> String {
        format!("{API_VERSION}{suffix}")
    }

    /// Answer single-person upserts with `data.personId = person_id`.
    pub async fn accept_single(&self, person_id: &str) {
        Mock::given(method("POST"))
            .and(path(Self::endpoint("/person/single")))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": {"personId": person_id}})),
            )
            .mount(&self.server)
            .await;
    }

    /// Reject single-person upserts with an error body.
    pub async fn reject_single(&self, status: u16, error_code: &str, message: &str) {
        Mock::given(method("POST"))
            .and(path(Self::endpoint("/person/single")))
            .respond_with(
                ResponseTemplate::new(status)
                    .set_body_json(json!({"errorCode": error_code, "errorMsg": message})),
            )
            .mount(&self.server)
            .await;
    }

    /// Answer batch upserts with `data.results = results`.
    pub async fn respond_batch(&self, results: Value) {
        Mock::given(method("POST"))
            .and(path(Self::endpoint("/person/batch")))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": {"results": results}})),
            )
            .mount(&self.server)
            .await;
    }

    /// Fail every batch upsert with `status`.
    pub async fn fail_batch(&self, status: u16) {
        Mock::given(method("POST"))
            .and(path(Self::endpoint("/person/batch")))
            .respond_with(
                ResponseTemplate::new(status).set_body_json(json!({"errorMsg": "batch rejected"})),
            )
            .mount(&self.server)
            .await;
    }

    /// Accept deletes of any external id.
    pub async fn accept_delete(&self) {
        Mock::given(method("DELETE"))
            .and(path_regex(format!("^{API_VERSION}/person/delete/.+$")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&self.server)
            .await;
    }

    /// Report the system as healthy on the status endpoint.
    pub async fn status_ok(&self) {
        Mock::given(method("GET"))
            .and(path(Self::endpoint("/system/status")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
            .mount(&self.server)
            .await;
    }

    /// Requests received on `suffix` (relative to the API version prefix).
    pub async fn requests_to(&self, suffix: &str) -> Vec<Request> {
        let wanted = Self::endpoint(suffix);
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path().starts_with(&wanted))
            .collect()
    }
}
