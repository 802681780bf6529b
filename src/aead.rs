//! AES-128-GCM wrapper with explicit nonces.
//!
//! Scheme #2 derives its nonce deterministically from a group element
//! (safe because the group element is unique per set element); scheme
//! #3 draws fresh random nonces. Callers choose which pattern applies;
//! this module only wraps the primitive.

use aes_gcm::aead::{Aead as _, Payload};
use aes_gcm::{Aes128Gcm, KeyInit, Nonce};

use crate::error::{Error, Result};

/// 16-byte AES-128-GCM key.
pub type AeadKey = [u8; 16];
/// 12-byte AES-GCM nonce.
pub type AeadNonce = [u8; 12];

/// Encrypts `pt` under `(key, nonce)`, optionally binding `aad`.
pub fn encrypt(key: &AeadKey, nonce: &AeadNonce, pt: &[u8], aad: Option<&[u8]>) -> Vec<u8> {
    let cipher = Aes128Gcm::new(key.into());
    let payload = Payload {
        msg: pt,
        aad: aad.unwrap_or(&[]),
    };
    cipher
        .encrypt(Nonce::from_slice(nonce), payload)
        .expect("AES-GCM encryption with valid key/nonce lengths cannot fail")
}

/// Decrypts `ct`, verifying the authentication tag. Returns
/// [`Error::AuthFail`] on a tampered ciphertext or wrong key/nonce/aad.
pub fn decrypt(key: &AeadKey, nonce: &AeadNonce, ct: &[u8], aad: Option<&[u8]>) -> Result<Vec<u8>> {
    let cipher = Aes128Gcm::new(key.into());
    let payload = Payload {
        msg: ct,
        aad: aad.unwrap_or(&[]),
    };
    cipher
        .decrypt(Nonce::from_slice(nonce), payload)
        .map_err(|_| Error::AuthFail)
}
