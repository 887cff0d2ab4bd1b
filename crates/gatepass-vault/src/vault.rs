// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential cipher: encrypts device-profile secrets before they reach the
//! store and decrypts them only for client construction.
//!
//! The master key is a 32-byte AES-256-GCM key supplied as 64 hex characters,
//! either through `GATEPASS_VAULT_MASTER_KEY` or `vault.master_key` in the config.
//! It lives in memory only, inside a [`Zeroizing`] buffer.

use gatepass_config::model::VaultConfig;
use gatepass_core::GatepassError;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use zeroize::Zeroizing;

use crate::crypto;

/// The environment variable name for providing the master key.
pub const VAULT_KEY_ENV_VAR: &str = "GATEPASS_VAULT_MASTER_KEY";

/// Encrypts and decrypts individual credential fields.
///
/// Debug output intentionally omits the master key.
pub struct CredentialCipher {
    master_key: Zeroizing<[u8; 32]>,
}

impl std::fmt::Debug for CredentialCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCipher")
            .field("master_key", &"[REDACTED]")
            .finish()
    }
}

impl CredentialCipher {
    /// Build a cipher from raw key bytes.
    pub fn new(master_key: [u8; 32]) -> Self {
        Self {
            master_key: Zeroizing::new(master_key),
        }
    }

    /// Build a cipher from a 64-character hex key.
    pub fn from_hex(hex_key: &SecretString) -> Result<Self, GatepassError> {
        let bytes = Zeroizing::new(
            hex::decode(hex_key.expose_secret().trim())
                .map_err(|_| GatepassError::Config("vault master key must be hex".to_string()))?,
        );
        let key: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            GatepassError::Config("vault master key must be 32 bytes (64 hex chars)".to_string())
        })?;
        Ok(Self::new(key))
    }

    /// Resolve the master key.
    ///
    /// Priority:
    /// 1. `GATEPASS_VAULT_MASTER_KEY` environment variable
    /// 2. `vault.master_key` from configuration
    pub fn from_config(config: &VaultConfig) -> Result<Self, GatepassError> {
        if let Ok(key) = std::env::var(VAULT_KEY_ENV_VAR)
            && !key.is_empty()
        {
            debug!("vault master key taken from environment");
            return Self::from_hex(&SecretString::from(key));
        }

        match &config.master_key {
            Some(key) => Self::from_hex(key),
            None => Err(GatepassError::Config(format!(
                "no vault master key. Set {VAULT_KEY_ENV_VAR} or vault.master_key"
            ))),
        }
    }

    /// Encrypt a credential into a `nonce_hex:ciphertext_hex` blob.
    pub fn encrypt(&self, plaintext: &SecretString) -> Result<String, GatepassError> {
        crypto::seal_to_blob(&self.master_key, plaintext.expose_secret().as_bytes())
    }

    /// Decrypt a blob produced by [`encrypt`](Self::encrypt).
    pub fn decrypt(&self, blob: &str) -> Result<SecretString, GatepassError> {
        let plaintext = Zeroizing::new(crypto::open_blob(&self.master_key, blob)?);
        let text = String::from_utf8(plaintext.to_vec())
            .map_err(|_| GatepassError::Crypto("decrypted credential is not UTF-8".to_string()))?;
        Ok(SecretString::from(text))
    }
}

/// Generate a fresh master key as 64 hex characters.
pub fn generate_master_key() -> Result<SecretString, GatepassError> {
    let key = Zeroizing::new(crypto::generate_random_key()?);
    Ok(SecretString::from(hex::encode(key.as_slice())))
}
