// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Gatepass sync service.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.
//!
//! Secret fields are `SecretString` and are never serialized back out.

use gatepass_core::{AuthType, EndpointMap};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Top-level Gatepass configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatepassConfig {
    /// Inbound HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Credential encryption settings.
    #[serde(default)]
    pub vault: VaultConfig,

    /// Connection profile for the external access-control system.
    #[serde(default)]
    pub device: DeviceProfileConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Inbound HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Static bearer token required on `/v1/*` routes other than webhooks.
    /// When unset, the administrative routes are rejected.
    #[serde(default, skip_serializing)]
    pub api_token: Option<SecretString>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            api_token: None,
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("gatepass").join("gatepass.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("gatepass.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Credential encryption configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VaultConfig {
    /// AES-256-GCM master key as 64 hex characters.
    #[serde(default, skip_serializing)]
    pub master_key: Option<SecretString>,
}

/// Connection parameters for one external access-control system.
///
/// The same shape describes the cloud platform (HMAC signing) and an
/// on-premises terminal (Digest auth); only `auth_type`, credentials and
/// `endpoints` differ.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceProfileConfig {
    /// Profile name used as the storage key.
    #[serde(default = "default_profile_name")]
    pub name: String,

    /// Base URL of the external system, e.g. `https://hcp.example.com`.
    #[serde(default)]
    pub base_url: String,

    /// Path prefix inserted between the base URL and every endpoint.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Authentication scheme.
    #[serde(default = "default_auth_type")]
    pub auth_type: AuthType,

    /// Digest username.
    #[serde(default)]
    pub username: Option<String>,

    /// Digest password.
    #[serde(default, skip_serializing)]
    pub password: Option<SecretString>,

    /// HMAC API key, sent as `X-API-Key`.
    #[serde(default, skip_serializing)]
    pub api_key: Option<SecretString>,

    /// HMAC signing secret.
    #[serde(default, skip_serializing)]
    pub api_secret: Option<SecretString>,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Retries after the first attempt for transient failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base backoff delay in milliseconds, doubled on each retry.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Requests per second allowed on the wire.
    #[serde(default = "default_rate_limit")]
    pub rate_limit: u32,

    /// Attendees per batch request.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Face library identifier (`FDID`).
    #[serde(default = "default_library_id")]
    pub library_id: String,

    /// Face library type (`faceLibType`).
    #[serde(default = "default_library_type")]
    pub library_type: String,

    /// Days an access grant stays valid after each sync.
    #[serde(default = "default_validity_days")]
    pub validity_days: u32,

    /// Run `sync_pending` periodically while serving.
    #[serde(default)]
    pub auto_sync: bool,

    /// Seconds between automatic pending sweeps.
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,

    /// Endpoint paths relative to `{base_url}{api_version}`.
    #[serde(default)]
    pub endpoints: EndpointMap,
}

impl Default for DeviceProfileConfig {
    fn default() -> Self {
        Self {
            name: default_profile_name(),
            base_url: String::new(),
            api_version: default_api_version(),
            auth_type: default_auth_type(),
            username: None,
            password: None,
            api_key: None,
            api_secret: None,
            request_timeout_ms: default_request_timeout_ms(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            rate_limit: default_rate_limit(),
            batch_size: default_batch_size(),
            library_id: default_library_id(),
            library_type: default_library_type(),
            validity_days: default_validity_days(),
            auto_sync: false,
            sync_interval_secs: default_sync_interval_secs(),
            endpoints: EndpointMap::default(),
        }
    }
}

fn default_profile_name() -> String {
    "default".to_string()
}

fn default_api_version() -> String {
    "/api/acs/v1".to_string()
}

fn default_auth_type() -> AuthType {
    AuthType::ApiKey
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    5_000
}

fn default_rate_limit() -> u32 {
    10
}

fn default_batch_size() -> u32 {
    100
}

fn default_library_id() -> String {
    "1".to_string()
}

fn default_library_type() -> String {
    "blackFD".to_string()
}

fn default_validity_days() -> u32 {
    90
}

fn default_sync_interval_secs() -> u64 {
    300
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn device_defaults_match_platform_defaults() {
        let d = DeviceProfileConfig::default();
        assert_eq!(d.api_version, "/api/acs/v1");
        assert_eq!(d.batch_size, 100);
        assert_eq!(d.max_retries, 3);
        assert_eq!(d.retry_delay_ms, 5_000);
        assert_eq!(d.request_timeout_ms, 30_000);
        assert_eq!(d.rate_limit, 10);
        assert_eq!(d.library_id, "1");
        assert_eq!(d.library_type, "blackFD");
        assert_eq!(d.validity_days, 90);
        assert_eq!(d.sync_interval_secs, 300);
        assert!(!d.auto_sync);
    }

    #[test]
    fn secrets_deserialize_but_never_serialize() {
        let config: GatepassConfig = toml::from_str(
            r#"
[device]
base_url = "https://hcp.example.com"
api_key = "key-123"
api_secret = "secret-456"
"#,
        )
        .unwrap();
        assert_eq!(
            config.device.api_secret.as_ref().unwrap().expose_secret(),
            "secret-456"
        );

        let rendered = toml::to_string(&config).unwrap();
        assert!(!rendered.contains("secret-456"));
        assert!(!rendered.contains("key-123"));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let mut config = GatepassConfig::default();
        config.device.password = Some(SecretString::from("pa55word"));
        let debug = format!("{config:?}");
        assert!(!debug.contains("pa55word"));
    }

    #[test]
    fn auth_type_parses_lowercase() {
        let d: DeviceProfileConfig = toml::from_str("auth_type = \"digest\"").unwrap();
        assert_eq!(d.auth_type, AuthType::Digest);
    }
}
