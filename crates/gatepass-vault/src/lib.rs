// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AES-256-GCM credential encryption for Gatepass device profiles.
//!
//! Credential fields are sealed individually with a random nonce per write
//! and stored as `nonce_hex:ciphertext_hex`. Plaintext only exists in memory
//! as `SecretString` while a device client is being built.

pub mod crypto;
pub mod vault;

pub use vault::{CredentialCipher, VAULT_KEY_ENV_VAR, generate_master_key};
