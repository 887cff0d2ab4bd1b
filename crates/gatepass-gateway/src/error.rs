// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping from service errors to HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use gatepass_core::GatepassError;
use serde::Serialize;

/// Error response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

#[derive(Debug)]
pub enum ApiError {
    /// The route needs a component this process was started without.
    Unavailable(&'static str),
    Service(GatepassError),
}

impl From<GatepassError> for ApiError {
    fn from(e: GatepassError) -> Self {
        Self::Service(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Service(GatepassError::NotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Service(GatepassError::Validation(_)) => StatusCode::BAD_REQUEST,
            Self::Service(GatepassError::Transport { .. }) => StatusCode::BAD_GATEWAY,
            Self::Service(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Unavailable(what) => ErrorResponse {
                error: format!("{what} is not configured"),
                error_code: None,
            },
            Self::Service(e) => {
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!(error = %e, "request failed");
                }
                ErrorResponse {
                    error: e.to_string(),
                    error_code: e.error_code().map(String::from),
                }
            }
        };
        (status, Json(body)).into_response()
    }
}
