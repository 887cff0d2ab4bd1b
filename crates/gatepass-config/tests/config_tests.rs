// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Gatepass configuration system.

use gatepass_config::diagnostic::ConfigError;
use gatepass_config::{load_and_validate_str, load_config_from_str};
use gatepass_core::AuthType;
use secrecy::ExposeSecret;

#[test]
fn full_toml_deserializes_into_gatepass_config() {
    let toml = r#"
[server]
bind_address = "0.0.0.0"
port = 9000
api_token = "admin-token"

[storage]
database_path = "/tmp/gatepass-test.db"
wal_mode = false

[vault]
master_key = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f"

[device]
name = "terminal"
base_url = "http://10.0.0.20"
api_version = "/ISAPI"
auth_type = "digest"
username = "admin"
password = "pw"
rate_limit = 5
batch_size = 50
auto_sync = true
sync_interval_secs = 60

[device.endpoints]
person_single = "/AccessControl/UserInfo/Record"
system_status = "/System/status"

[logging]
level = "debug"
"#;

    let config = load_and_validate_str(toml).expect("valid config");
    assert_eq!(config.server.port, 9000);
    assert_eq!(
        config.server.api_token.as_ref().unwrap().expose_secret(),
        "admin-token"
    );
    assert!(!config.storage.wal_mode);
    assert_eq!(config.device.auth_type, AuthType::Digest);
    assert_eq!(config.device.api_version, "/ISAPI");
    assert_eq!(config.device.batch_size, 50);
    assert_eq!(
        config.device.endpoints.person_single,
        "/AccessControl/UserInfo/Record"
    );
    // Unlisted endpoints keep their defaults.
    assert_eq!(config.device.endpoints.person_batch, "/person/batch");
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn unknown_key_in_device_gets_suggestion() {
    let toml = r#"
[device]
base_ulr = "https://hcp.example.com"
"#;

    let errors = load_and_validate_str(toml).expect_err("unknown key must be rejected");
    let suggestion = errors.iter().find_map(|e| match e {
        ConfigError::UnknownKey {
            key, suggestion, ..
        } if key == "base_ulr" => suggestion.clone(),
        _ => None,
    });
    assert_eq!(suggestion.as_deref(), Some("base_url"));
}

#[test]
fn wrong_type_is_reported() {
    let err = load_config_from_str("[server]\nport = \"eighty\"\n").expect_err("wrong type");
    assert!(err.to_string().contains("port") || err.to_string().contains("invalid type"));
}

#[test]
fn unknown_auth_type_is_rejected() {
    let toml = r#"
[device]
base_url = "https://hcp.example.com"
auth_type = "oauth"
"#;
    assert!(load_and_validate_str(toml).is_err());
}

#[test]
fn empty_config_uses_defaults() {
    let config = load_and_validate_str("").expect("defaults are valid");
    assert_eq!(config.server.bind_address, "127.0.0.1");
    assert_eq!(config.server.port, 8080);
    assert!(config.device.base_url.is_empty());
    assert!(config.storage.database_path.ends_with("gatepass.db"));
}

#[test]
fn validation_collects_every_error() {
    let toml = r#"
[server]
bind_address = "not an address!"

[device]
base_url = "ftp://hcp"
rate_limit = 0
"#;
    let errors = load_and_validate_str(toml).expect_err("invalid");
    assert!(errors.len() >= 3, "got {errors:?}");
}
