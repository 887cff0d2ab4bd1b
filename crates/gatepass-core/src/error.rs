// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Gatepass sync service.

use thiserror::Error;

/// The primary error type used across all Gatepass crates.
#[derive(Debug, Error)]
pub enum GatepassError {
    /// Configuration errors (invalid TOML, missing credentials, bad profile).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, constraint).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Errors talking to the external access-control system.
    ///
    /// `status` is `None` for network-level failures (connection refused,
    /// DNS, reset) where no HTTP response was received.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        status: Option<u16>,
        error_code: Option<String>,
        details: Option<serde_json::Value>,
    },

    /// Authentication negotiation failed before a usable response was obtained
    /// (malformed or missing Digest challenge, invalid credential header).
    #[error("authentication error: {0}")]
    Auth(String),

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Credential encryption or decryption failed.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Caller supplied invalid input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatepassError {
    /// Wrap any error as a storage error.
    pub fn storage(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Storage {
            source: source.into(),
        }
    }

    /// Whether the transport layer may retry after this error.
    ///
    /// Network failures (no response), timeouts, 5xx and 429 are retryable.
    /// Every other 4xx, and every non-transport error, is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { status: None, .. } => true,
            Self::Transport {
                status: Some(code), ..
            } => *code >= 500 || *code == 429,
            Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// HTTP status returned by the external system, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            _ => None,
        }
    }

    /// Error code reported by the external system, if any.
    pub fn error_code(&self) -> Option<&str> {
        match self {
            Self::Transport { error_code, .. } => error_code.as_deref(),
            _ => None,
        }
    }

    /// Response body returned alongside a transport failure, if any.
    pub fn details(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Transport { details, .. } => details.as_ref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(status: Option<u16>) -> GatepassError {
        GatepassError::Transport {
            message: "boom".into(),
            status,
            error_code: None,
            details: None,
        }
    }

    #[test]
    fn network_failures_are_retryable() {
        assert!(transport(None).is_retryable());
        assert!(
            GatepassError::Timeout {
                duration: std::time::Duration::from_secs(30)
            }
            .is_retryable()
        );
    }

    #[test]
    fn server_errors_and_rate_limits_are_retryable() {
        assert!(transport(Some(500)).is_retryable());
        assert!(transport(Some(503)).is_retryable());
        assert!(transport(Some(429)).is_retryable());
    }

    #[test]
    fn client_errors_are_not_retryable() {
        for code in [400, 401, 403, 404, 409] {
            assert!(!transport(Some(code)).is_retryable(), "{code}");
        }
        assert!(!GatepassError::Auth("no challenge".into()).is_retryable());
        assert!(!GatepassError::Internal("x".into()).is_retryable());
    }

    #[test]
    fn transport_accessors_expose_external_details() {
        let err = GatepassError::Transport {
            message: "conflict".into(),
            status: Some(409),
            error_code: Some("EMPLOYEE_EXISTS".into()),
            details: Some(serde_json::json!({"errorCode": "EMPLOYEE_EXISTS"})),
        };
        assert_eq!(err.http_status(), Some(409));
        assert_eq!(err.error_code(), Some("EMPLOYEE_EXISTS"));
        assert!(err.details().is_some());
        assert_eq!(GatepassError::Config("x".into()).http_status(), None);
    }
}
