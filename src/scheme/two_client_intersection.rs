//! Scheme #2: TwoClient-Intersection.
//!
//! Each element is mapped to a pseudo-random group element `k`, deterministic
//! in `(msk, x)`. Client `i` publishes `k^σ_i` alongside a deterministic-AEAD
//! encryption of `x` keyed by `H(k)`. On overlap, multiplying the two
//! `k^σ_i` values reconstitutes `k = k^(σ + 1 - σ)`, which recovers the AEAD
//! key and decrypts the plaintext.

use std::collections::{HashMap, HashSet};

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::aead::{self, AeadKey, AeadNonce};
use crate::error::{Error, Result};
use crate::group::{GroupOps, Point, Scalar, ScalarBytes};
use crate::prf::{self, Gid};
use crate::scheme::random_key;

/// Per-client user secret key: the shared PRF master key and this
/// client's share `σ_i` of the splitting scalar (`σ_0 + σ_1 = 1`),
/// stored as its canonical byte encoding so dropping the key zeroizes
/// the share in place.
#[derive(Clone, zeroize::Zeroize, zeroize::ZeroizeOnDrop)]
pub struct Usk {
    msk: [u8; 16],
    sigma_share: ScalarBytes,
}

/// One element's ciphertext: `(ct1 = serialize(k^σ), (nonce, AEAD ct))`.
#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ElementCiphertext {
    /// Serialized `k^σ_i`, this client's share of the PRF output point.
    pub ct1: [u8; 33],
    /// AEAD nonce derived from `k`.
    pub nonce: AeadNonce,
    /// AEAD ciphertext of the plaintext element, keyed by `H(k)`.
    pub ct2: Vec<u8>,
}

/// Dictionary of ciphertexts keyed by the (public) AEAD key.
pub type CtSet = HashMap<AeadKey, ElementCiphertext>;

/// TwoClient-Intersection scheme instance.
#[derive(Clone, Copy)]
pub struct TwoClientIntersection {
    g: GroupOps,
}

impl Default for TwoClientIntersection {
    fn default() -> Self {
        TwoClientIntersection { g: GroupOps }
    }
}

impl TwoClientIntersection {
    fn phi(&self, msk: &[u8; 16], gid: &Gid, pt: &[u8]) -> Point {
        let prf_out = prf::prf(msk, gid, pt);
        let exponent = self.g.reduce_mod_q(&prf_out);
        self.g.generator() * exponent
    }

    fn ae_key(&self, k: &Point) -> AeadKey {
        let bytes = self.g.serialize_point(k);
        let mut hasher = Sha256::new();
        hasher.update([0x00]);
        hasher.update(bytes);
        let digest = hasher.finalize();
        let mut out = [0u8; 16];
        out.copy_from_slice(&digest[..16]);
        out
    }

    fn ae_nonce(&self, k: &Point) -> AeadNonce {
        let bytes = self.g.serialize_point(k);
        let mut hasher = Sha256::new();
        hasher.update([0x01]);
        hasher.update(bytes);
        let digest = hasher.finalize();
        let mut out = [0u8; 12];
        out.copy_from_slice(&digest[..12]);
        out
    }

    /// Generates the shared PRF key and a random split `σ`, `1-σ`.
    pub fn setup(&self, secpar: u32) -> Result<(Usk, Usk)> {
        let key_vec = random_key(secpar)?;
        let mut msk = [0u8; 16];
        msk.copy_from_slice(&key_vec);

        let sigma = self.g.random_scalar(&mut rand_core::OsRng);
        let one = self.g.scalar_from_u64(1);
        debug!(secpar, "two_client_intersection::setup");

        Ok((
            Usk { msk, sigma_share: self.g.serialize_scalar(&sigma) },
            Usk { msk, sigma_share: self.g.serialize_scalar(&(one - sigma)) },
        ))
    }

    fn sigma_scalar(&self, usk: &Usk) -> Scalar {
        self.g
            .deserialize_scalar(&usk.sigma_share)
            .expect("usk sigma share is serialized internally and always canonical")
    }

    /// Encrypts `pt_set` under `gid`.
    pub fn encrypt(&self, usk: &Usk, gid: &Gid, pt_set: &HashSet<Vec<u8>>) -> CtSet {
        debug!(set_size = pt_set.len(), "two_client_intersection::encrypt");
        let mut out = HashMap::with_capacity(pt_set.len());
        for pt in pt_set {
            let k = self.phi(&usk.msk, gid, pt);
            let ct1 = self.g.serialize_point(&(k * self.sigma_scalar(usk)));

            let ae_key = self.ae_key(&k);
            let ae_nonce = self.ae_nonce(&k);
            let ct2 = aead::encrypt(&ae_key, &ae_nonce, pt, None);

            out.insert(ae_key, ElementCiphertext { ct1, nonce: ae_nonce, ct2 });
        }
        out
    }

    /// Recovers the plaintext intersection from two ciphertext dictionaries.
    pub fn eval(&self, ct_sets: &[CtSet; 2]) -> Result<HashSet<Vec<u8>>> {
        let mut result = HashSet::new();
        for (ae_key, d0_entry) in &ct_sets[0] {
            let Some(d1_entry) = ct_sets[1].get(ae_key) else {
                continue;
            };

            let g0 = self
                .g
                .deserialize_point(&d0_entry.ct1)
                .map_err(|_| Error::MalformedCiphertext("ct1 from client 0".into()))?;
            let g1 = self
                .g
                .deserialize_point(&d1_entry.ct1)
                .map_err(|_| Error::MalformedCiphertext("ct1 from client 1".into()))?;
            let key = g0 + g1;

            let ae_key = self.ae_key(&key);
            let pt = aead::decrypt(&ae_key, &d0_entry.nonce, &d0_entry.ct2, None)?;
            result.insert(pt);
        }
        debug!(count = result.len(), "two_client_intersection::eval");
        Ok(result)
    }
}
