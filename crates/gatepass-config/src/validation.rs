// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Collects every problem instead of failing on the first one.

use gatepass_core::AuthType;

use crate::diagnostic::ConfigError;
use crate::model::{DeviceProfileConfig, GatepassConfig};

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &GatepassConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let addr = config.server.bind_address.trim();
    if addr.is_empty() {
        errors.push(ConfigError::validation("server.bind_address must not be empty"));
    } else if addr.parse::<std::net::IpAddr>().is_err()
        && !addr
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        errors.push(ConfigError::validation(format!(
            "server.bind_address `{addr}` is not a valid IP address or hostname"
        )));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation("storage.database_path must not be empty"));
    }

    if !matches!(
        config.logging.level.as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        errors.push(ConfigError::validation(format!(
            "logging.level `{}` must be one of trace, debug, info, warn, error",
            config.logging.level
        )));
    }

    // An unconfigured device section is allowed; the service then only
    // records webhooks and serves status.
    if !config.device.base_url.trim().is_empty() {
        errors.extend(
            profile_errors(&config.device)
                .into_iter()
                .map(|m| ConfigError::validation(format!("device.{m}"))),
        );
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// Semantic problems with a device profile, as `field: message` strings.
///
/// Shared by config validation and the profile store write path.
pub fn profile_errors(profile: &DeviceProfileConfig) -> Vec<String> {
    let mut errors = Vec::new();
    let base = profile.base_url.trim();

    if base.is_empty() {
        errors.push("base_url is required".to_string());
    } else if !(base.starts_with("http://") || base.starts_with("https://")) {
        errors.push(format!("base_url `{base}` must start with http:// or https://"));
    }
    if profile.name.trim().is_empty() {
        errors.push("name must not be empty".to_string());
    }

    match profile.auth_type {
        AuthType::ApiKey => {
            if profile.api_key.is_none() || profile.api_secret.is_none() {
                errors.push("api_key and api_secret are required for apikey auth".to_string());
            }
        }
        AuthType::Digest => {
            if profile.username.as_deref().is_none_or(str::is_empty) || profile.password.is_none() {
                errors.push("username and password are required for digest auth".to_string());
            }
        }
    }

    if profile.rate_limit == 0 {
        errors.push("rate_limit must be at least 1".to_string());
    }
    if profile.batch_size == 0 || profile.batch_size > 1000 {
        errors.push(format!(
            "batch_size must be between 1 and 1000, got {}",
            profile.batch_size
        ));
    }
    if profile.request_timeout_ms == 0 {
        errors.push("request_timeout_ms must be positive".to_string());
    }
    if profile.validity_days == 0 {
        errors.push("validity_days must be at least 1".to_string());
    }
    if profile.auto_sync && profile.sync_interval_secs < 10 {
        errors.push(format!(
            "sync_interval_secs must be at least 10 when auto_sync is on, got {}",
            profile.sync_interval_secs
        ));
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn has(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    fn apikey_profile() -> DeviceProfileConfig {
        DeviceProfileConfig {
            base_url: "https://hcp.example.com".into(),
            api_key: Some(SecretString::from("k")),
            api_secret: Some(SecretString::from("s")),
            ..Default::default()
        }
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&GatepassConfig::default()).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = GatepassConfig::default();
        config.storage.database_path = "".to_string();
        assert!(has(&validate_config(&config).unwrap_err(), "database_path"));
    }

    #[test]
    fn configured_device_is_checked() {
        let mut config = GatepassConfig::default();
        config.device.base_url = "hcp.example.com".into();
        config.device.batch_size = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has(&errors, "device.base_url"));
        assert!(has(&errors, "device.batch_size"));
        assert!(has(&errors, "api_key and api_secret"));
    }

    #[test]
    fn apikey_profile_passes() {
        assert!(profile_errors(&apikey_profile()).is_empty());
    }

    #[test]
    fn digest_profile_needs_username_and_password() {
        let profile = DeviceProfileConfig {
            auth_type: AuthType::Digest,
            username: Some("admin".into()),
            ..apikey_profile()
        };
        let errors = profile_errors(&profile);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("digest"));
    }

    #[test]
    fn bad_log_level_fails_validation() {
        let mut config = GatepassConfig::default();
        config.logging.level = "loud".into();
        assert!(has(&validate_config(&config).unwrap_err(), "logging.level"));
    }
}
