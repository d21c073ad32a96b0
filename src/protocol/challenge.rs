//! Challenge generation and encrypted-proof verification.
//!
//! The key for a peer's proof is derived from its claimed identifier:
//! SHA-256 of the identifier string, rendered as lowercase hex. The deployed
//! peers treat that 64-character string as raw key material even though the
//! cipher wants a 32-byte key, so we take its leading 32 bytes. Any failure
//! along the proof path (hex decode, key setup, decryption, UTF-8) counts as
//! a verification mismatch; nothing in here distinguishes "wrong answer"
//! from "garbage answer".
//!
//! The challenge value itself is not secret (it crosses the wire in the
//! clear), so a general-purpose RNG is sufficient. What is checked is the
//! peer's ability to encrypt it under the identifier-derived key.

use crate::config::CHALLENGE_SPACE;
use crate::error::{ProtocolError, Result};
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::Rng;
use sha2::{Digest, Sha256};

/// Cipher key length in bytes; the leading slice of the derived key material.
const KEY_LEN: usize = 32;

/// Generate a challenge value, uniform over `[0, 1_000_000)`.
pub fn generate() -> u32 {
    rand::rng().random_range(0..CHALLENGE_SPACE)
}

/// Derive the key material for an identifier: lowercase hex of SHA-256(id).
pub fn derive_key(identifier: &str) -> String {
    hex::encode(Sha256::digest(identifier.as_bytes()))
}

/// The proof cipher: fixed key from the identifier, fixed zero nonce. There
/// is no per-message IV on the wire.
fn cipher_for(identifier: &str) -> ChaCha20Poly1305 {
    let material = derive_key(identifier);
    let key = Key::from_slice(&material.as_bytes()[..KEY_LEN]);
    ChaCha20Poly1305::new(key)
}

/// Encrypt the decimal form of `challenge` under the identifier-derived key
/// and hex-encode it for transport. This is what a dialing peer sends as its
/// proof of possession.
pub fn prove(identifier: &str, challenge: u32) -> Result<String> {
    let ciphertext = cipher_for(identifier)
        .encrypt(&Nonce::default(), challenge.to_string().as_bytes())
        .map_err(|_| ProtocolError::EncryptionFailure)?;
    Ok(hex::encode(ciphertext))
}

/// Check a peer's proof against the outstanding challenge. Fails closed:
/// every error is a mismatch.
pub fn verify(ciphertext: &str, identifier: &str, expected: u32) -> bool {
    let Ok(raw) = hex::decode(ciphertext) else {
        return false;
    };
    match cipher_for(identifier).decrypt(&Nonce::default(), raw.as_slice()) {
        Ok(plaintext) => plaintext == expected.to_string().as_bytes(),
        Err(_) => false,
    }
}
