// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Low-level AES-256-GCM seal/open operations and the stored blob format.
//!
//! Every call to [`seal`] generates a fresh random 96-bit nonce via the system
//! CSPRNG. Nonce reuse would be catastrophic for GCM security.
//!
//! Stored blobs are `nonce_hex:ciphertext_hex`, where the ciphertext carries
//! the 16-byte authentication tag.

use gatepass_core::GatepassError;
use ring::aead::{AES_256_GCM, Aad, LessSafeKey, Nonce, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};

const NONCE_LEN: usize = 12;

/// Encrypt plaintext with AES-256-GCM using a random 96-bit nonce.
///
/// Returns `(ciphertext_with_tag, nonce_bytes)`.
pub fn seal(key: &[u8; 32], plaintext: &[u8]) -> Result<(Vec<u8>, [u8; NONCE_LEN]), GatepassError> {
    let less_safe = aead_key(key)?;

    let rng = SystemRandom::new();
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rng.fill(&mut nonce_bytes)
        .map_err(|_| GatepassError::Crypto("failed to generate random nonce".to_string()))?;

    let nonce = Nonce::assume_unique_for_key(nonce_bytes);

    let mut in_out = plaintext.to_vec();
    less_safe
        .seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| GatepassError::Crypto("AES-256-GCM encryption failed".to_string()))?;

    Ok((in_out, nonce_bytes))
}

/// Decrypt ciphertext with AES-256-GCM.
///
/// Fails if the key is wrong or the data was tampered with.
pub fn open(
    key: &[u8; 32],
    nonce_bytes: &[u8; NONCE_LEN],
    ciphertext: &[u8],
) -> Result<Vec<u8>, GatepassError> {
    let less_safe = aead_key(key)?;
    let nonce = Nonce::assume_unique_for_key(*nonce_bytes);

    let mut in_out = ciphertext.to_vec();
    let plaintext = less_safe
        .open_in_place(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| {
            GatepassError::Crypto(
                "AES-256-GCM decryption failed -- wrong key or corrupted data".to_string(),
            )
        })?;

    Ok(plaintext.to_vec())
}

/// Seal `plaintext` and encode it as `nonce_hex:ciphertext_hex`.
pub fn seal_to_blob(key: &[u8; 32], plaintext: &[u8]) -> Result<String, GatepassError> {
    let (ciphertext, nonce) = seal(key, plaintext)?;
    Ok(format!("{}:{}", hex::encode(nonce), hex::encode(ciphertext)))
}

/// Decode a `nonce_hex:ciphertext_hex` blob and open it.
pub fn open_blob(key: &[u8; 32], blob: &str) -> Result<Vec<u8>, GatepassError> {
    let (nonce_hex, ct_hex) = blob
        .split_once(':')
        .ok_or_else(|| GatepassError::Crypto("malformed credential blob".to_string()))?;

    let nonce_vec = hex::decode(nonce_hex)
        .map_err(|e| GatepassError::Crypto(format!("invalid nonce encoding: {e}")))?;
    let nonce: [u8; NONCE_LEN] = nonce_vec
        .try_into()
        .map_err(|_| GatepassError::Crypto("nonce must be 12 bytes".to_string()))?;
    let ciphertext = hex::decode(ct_hex)
        .map_err(|e| GatepassError::Crypto(format!("invalid ciphertext encoding: {e}")))?;

    open(key, &nonce, &ciphertext)
}

/// Generate a random 32-byte key suitable for AES-256-GCM.
pub fn generate_random_key() -> Result<[u8; 32], GatepassError> {
    let rng = SystemRandom::new();
    let mut key = [0u8; 32];
    rng.fill(&mut key)
        .map_err(|_| GatepassError::Crypto("failed to generate random key".to_string()))?;
    Ok(key)
}

fn aead_key(key: &[u8; 32]) -> Result<LessSafeKey, GatepassError> {
    let unbound = UnboundKey::new(&AES_256_GCM, key)
        .map_err(|_| GatepassError::Crypto("failed to create AES-256-GCM key".to_string()))?;
    Ok(LessSafeKey::new(unbound))
}
