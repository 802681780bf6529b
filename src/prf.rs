//! Deterministic AES-CBC-based PRF.
//!
//! `prf(key, iv, pt)` zero-pads `pt` to the next 16-byte multiple and
//! encrypts it under AES-128-CBC with `(key, iv)`. Because `(key, iv)`
//! are fixed for the lifetime of one `encrypt` call and only `pt` varies
//! across set elements, the resulting map `pt ↦ ciphertext` behaves as a
//! PRF: deterministic, and indistinguishable from random for an attacker
//! who does not know `key`.
//!
//! This is *not* a general-purpose IND-CPA cipher: reusing `(key, iv)`
//! to both PRF-map elements and encrypt unrelated data would leak the
//! usual CBC relations. The two usages are disjoint by construction in
//! every scheme that uses this module.

use aes::Aes128;
use cbc::cipher::{block_padding::NoPadding, BlockEncryptMut, KeyIvInit};

type Aes128CbcEnc = cbc::Encryptor<Aes128>;

/// 16-byte AES-128 key.
pub type PrfKey = [u8; 16];
/// 16-byte IV, reused across a scheme as the group identifier (gid).
pub type Gid = [u8; 16];

/// Computes `Prf(key, iv, pt)`, zero-padding `pt` to the next 16-byte
/// boundary before encrypting. Output length equals the padded input
/// length (a multiple of 16).
pub fn prf(key: &PrfKey, iv: &Gid, pt: &[u8]) -> Vec<u8> {
    let pad_len = 16 - (pt.len() % 16);
    let mut padded = Vec::with_capacity(pt.len() + pad_len);
    padded.extend_from_slice(pt);
    padded.resize(pt.len() + pad_len, 0u8);

    Aes128CbcEnc::new(key.into(), iv.into())
        .encrypt_padded_vec_mut::<NoPadding>(&padded)
}
