// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./gatepass.toml` > `~/.config/gatepass/gatepass.toml`
//! > `/etc/gatepass/gatepass.toml` with environment variable overrides via the
//! `GATEPASS_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::GatepassConfig;

/// Config file name looked up in every layer.
pub const CONFIG_FILE_NAME: &str = "gatepass.toml";

/// Top-level sections, used to map `GATEPASS_<SECTION>_<KEY>` to `section.key`.
const SECTIONS: &[&str] = &["server", "storage", "vault", "device", "logging"];

/// Candidate config file paths in merge order (later overrides earlier).
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/gatepass").join(CONFIG_FILE_NAME)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("gatepass").join(CONFIG_FILE_NAME));
    }
    paths.push(PathBuf::from(CONFIG_FILE_NAME));
    paths
}

/// Build the Figment used for config loading (exposed for diagnostic use).
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/gatepass/gatepass.toml` (system-wide)
/// 3. `~/.config/gatepass/gatepass.toml` (user XDG config)
/// 4. `./gatepass.toml` (local directory)
/// 5. `GATEPASS_*` environment variables
pub fn build_figment() -> Figment {
    let figment = config_paths()
        .into_iter()
        .fold(Figment::new().merge(Serialized::defaults(GatepassConfig::default())), |f, path| {
            f.merge(Toml::file(path))
        });
    figment.merge(env_provider())
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
pub fn load_config() -> Result<GatepassConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<GatepassConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(GatepassConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<GatepassConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(GatepassConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Environment provider mapping `GATEPASS_DEVICE_BASE_URL` to `device.base_url`.
///
/// Uses `Env::map()` rather than `Env::split("_")` because keys themselves
/// contain underscores (`base_url`, `api_secret`).
fn env_provider() -> Env {
    Env::prefixed("GATEPASS_").map(|key| {
        let key_str = key.as_str();
        for section in SECTIONS {
            if let Some(rest) = key_str.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
                return format!("{section}.{rest}").into();
            }
        }
        key_str.to_string().into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn env_overrides_map_into_sections() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE_NAME,
                r#"
[device]
base_url = "https://from-file.example.com"
"#,
            )?;
            jail.set_env("GATEPASS_DEVICE_BASE_URL", "https://from-env.example.com");
            jail.set_env("GATEPASS_DEVICE_API_SECRET", "s3cr3t");
            jail.set_env("GATEPASS_SERVER_PORT", "9090");
            jail.set_env("GATEPASS_VAULT_MASTER_KEY", "00".repeat(32));

            let config = load_config_from_path(Path::new(CONFIG_FILE_NAME))?;
            assert_eq!(config.device.base_url, "https://from-env.example.com");
            assert_eq!(
                config.device.api_secret.as_ref().map(|s| s.expose_secret().to_string()),
                Some("s3cr3t".to_string())
            );
            assert_eq!(config.server.port, 9090);
            assert!(config.vault.master_key.is_some());
            Ok(())
        });
    }

    #[test]
    fn local_file_is_merged_last() {
        let paths = config_paths();
        assert_eq!(paths.last().unwrap(), &PathBuf::from(CONFIG_FILE_NAME));
        assert!(paths[0].starts_with("/etc/gatepass"));
    }
}
