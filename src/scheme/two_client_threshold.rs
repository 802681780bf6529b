//! Scheme #3: TwoClient-Threshold.
//!
//! Reveals the plaintext intersection only when `|intersection| ≥ t`;
//! otherwise only the cardinality is revealed. The gating is algebraic: a
//! degree-`(t-1)` Shamir polynomial's constant term `c_0` unlocks an AEAD
//! key wrapping the rest of the recovery chain, and `c_0` is only
//! Lagrange-recoverable from `t` or more shared elements.

use std::collections::{HashMap, HashSet};

use num_bigint::BigUint;
use p256::elliptic_curve::Field;
use rand_core::RngCore;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::aead::{self, AeadNonce};
use crate::error::{Error, Result};
use crate::group::{GroupOps, Point, Scalar, ScalarBytes};
use crate::prf::{self, Gid};
use crate::scheme::random_key;

/// Per-client user secret key. `sigma_share` and `rho` are stored as
/// their canonical 32-byte encodings so dropping the key zeroizes both
/// in place, rather than leaving a live `Scalar`/`BigUint` behind.
#[derive(Clone, zeroize::Zeroize, zeroize::ZeroizeOnDrop)]
pub struct Usk {
    sk1: [u8; 16],
    sk2: [u8; 16],
    sk3: [u8; 16],
    sigma_share: ScalarBytes,
    rho: [u8; 32],
}

/// One element's ciphertext tuple.
#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ElementCiphertext {
    ct2: [u8; 32],
    ct3_nonce: AeadNonce,
    ct3: Vec<u8>,
    ct4_nonce: AeadNonce,
    ct4: Vec<u8>,
}

/// Dictionary keyed by `serialize(k2)`.
pub type CtSet = HashMap<[u8; 32], ElementCiphertext>;

/// TwoClient-Threshold scheme instance.
#[derive(Clone, Copy)]
pub struct TwoClientThreshold {
    g: GroupOps,
}

impl Default for TwoClientThreshold {
    fn default() -> Self {
        TwoClientThreshold { g: GroupOps }
    }
}

impl TwoClientThreshold {
    fn h_key_from_scalar(&self, s: &Scalar) -> [u8; 16] {
        let bytes = self.g.serialize_scalar(s);
        hash_prefixed(&bytes)
    }

    fn h_key_from_point(&self, p: &Point) -> [u8; 16] {
        let bytes = self.g.serialize_point(p);
        hash_prefixed(&bytes)
    }

    fn sigma_scalar(&self, usk: &Usk) -> Scalar {
        self.g
            .deserialize_scalar(&usk.sigma_share)
            .expect("usk sigma share is serialized internally and always canonical")
    }

    fn rho_biguint(&self, usk: &Usk) -> BigUint {
        BigUint::from_bytes_be(&usk.rho)
    }

    fn scalar_pow_u32(&self, base: Scalar, mut exp: u32) -> Scalar {
        let mut acc = self.g.scalar_from_u64(1);
        let mut b = base;
        while exp > 0 {
            if exp & 1 == 1 {
                acc *= b;
            }
            b *= b;
            exp >>= 1;
        }
        acc
    }

    fn coefficients(&self, sk3: &[u8; 16], gid: &Gid, t: u32) -> Vec<Scalar> {
        (0..t)
            .map(|j| {
                let j_bytes = (j as u128).to_be_bytes();
                let prf_out = prf::prf(sk3, gid, &j_bytes[j_bytes.len() - 16..]);
                self.g.reduce_mod_q(&prf_out)
            })
            .collect()
    }

    fn evaluate_poly(&self, coeffs: &[Scalar], x: Scalar) -> Scalar {
        coeffs
            .iter()
            .enumerate()
            .fold(Scalar::ZERO, |acc, (i, c)| {
                acc + *c * self.scalar_pow_u32(x, i as u32)
            })
    }

    /// Generates both clients' secret keys for threshold `t`.
    pub fn setup(&self, secpar: u32, t: u32) -> Result<(Usk, Usk)> {
        if t == 0 {
            return Err(Error::InvalidArgument("threshold must be > 0".into()));
        }
        let sk1 = to_array16(random_key(secpar)?);
        let sk2 = to_array16(random_key(secpar)?);
        let sk3 = to_array16(random_key(secpar)?);

        let sigma = self.g.random_scalar(&mut rand_core::OsRng);
        let one = self.g.scalar_from_u64(1);

        let mut rho_bytes = [0u8; 32];
        rand_core::OsRng.fill_bytes(&mut rho_bytes);
        let rho1 = self.g.reduce_mod_q_minus_one(&rho_bytes);
        let order_minus_one = self.g.order_minus_one();
        let rho2 = self
            .g
            .reduce_mod_q_minus_one(&(order_minus_one + 1u32 - &rho1).to_bytes_be());

        debug!(secpar, t, "two_client_threshold::setup");

        Ok((
            Usk {
                sk1,
                sk2,
                sk3,
                sigma_share: self.g.serialize_scalar(&sigma),
                rho: biguint_to_bytes32(&rho1),
            },
            Usk {
                sk1,
                sk2,
                sk3,
                sigma_share: self.g.serialize_scalar(&(one - sigma)),
                rho: biguint_to_bytes32(&rho2),
            },
        ))
    }

    /// Encrypts `pt_set` under `gid` for threshold `t` (must match the
    /// `t` used in `setup`; the polynomial is re-derived deterministically
    /// from `gid`, not stored in `usk`).
    pub fn encrypt(&self, usk: &Usk, gid: &Gid, t: u32, pt_set: &HashSet<Vec<u8>>) -> CtSet {
        debug!(set_size = pt_set.len(), t, "two_client_threshold::encrypt");
        let coeffs = self.coefficients(&usk.sk3, gid, t);
        let c0 = coeffs[0];
        let ae1_key = self.h_key_from_scalar(&c0);

        let mut ct3_nonce = [0u8; 12];
        rand_core::OsRng.fill_bytes(&mut ct3_nonce);

        let mut out = HashMap::with_capacity(pt_set.len());
        for pt in pt_set {
            let k1_exp = self.g.reduce_mod_q(&prf::prf(&usk.sk1, gid, pt));
            let k1 = self.g.generator() * k1_exp;
            let k2 = self.g.reduce_mod_q(&prf::prf(&usk.sk2, gid, pt));

            let ct1_key = self.g.serialize_scalar(&k2);

            let fk2 = self.evaluate_poly(&coeffs, k2);
            let ct2 = self.g.serialize_scalar(&self.g.pow_mod_q(&fk2, &self.rho_biguint(usk)));

            let k1_sigma_bytes = self.g.serialize_point(&(k1 * self.sigma_scalar(usk)));
            let ct3 = aead::encrypt(&ae1_key, &ct3_nonce, &k1_sigma_bytes, None);

            let ae2_key = self.h_key_from_point(&k1);
            let mut ct4_nonce = [0u8; 12];
            rand_core::OsRng.fill_bytes(&mut ct4_nonce);
            let ct4 = aead::encrypt(&ae2_key, &ct4_nonce, pt, None);

            out.insert(
                ct1_key,
                ElementCiphertext { ct2, ct3_nonce, ct3, ct4_nonce, ct4 },
            );
        }
        out
    }

    /// Returns `(cardinality, intersection)`; `intersection` is empty
    /// unless `cardinality >= t`.
    pub fn eval(&self, ct_sets: &[CtSet; 2], t: u32) -> Result<(usize, HashSet<Vec<u8>>)> {
        let common: Vec<[u8; 32]> = ct_sets[0]
            .keys()
            .filter(|k| ct_sets[1].contains_key(*k))
            .copied()
            .collect();
        let cardinality = common.len();
        debug!(cardinality, t, "two_client_threshold::eval");

        if cardinality < t as usize {
            return Ok((cardinality, HashSet::new()));
        }

        let mut xs = Vec::with_capacity(t as usize);
        let mut ys = Vec::with_capacity(t as usize);
        for key in common.iter().take(t as usize) {
            let x = self.g.deserialize_scalar(key)?;
            let e0 = &ct_sets[0][key];
            let e1 = &ct_sets[1][key];
            let y0 = self.g.deserialize_scalar(&e0.ct2)?;
            let y1 = self.g.deserialize_scalar(&e1.ct2)?;
            xs.push(x);
            ys.push(y0 * y1);
        }

        let c0 = lagrange_interpolate_at_zero(&xs, &ys)?;
        let ae1_key = self.h_key_from_scalar(&c0);

        let mut intersection = HashSet::with_capacity(common.len());
        for key in &common {
            let e0 = &ct_sets[0][key];
            let e1 = &ct_sets[1][key];

            let pt0 = aead::decrypt(&ae1_key, &e0.ct3_nonce, &e0.ct3, None)?;
            let pt1 = aead::decrypt(&ae1_key, &e1.ct3_nonce, &e1.ct3, None)?;
            let p0 = self.g.deserialize_point(&pt0)?;
            let p1 = self.g.deserialize_point(&pt1)?;
            let k1 = p0 + p1;

            let ae2_key = self.h_key_from_point(&k1);
            let pt = aead::decrypt(&ae2_key, &e0.ct4_nonce, &e0.ct4, None)?;
            intersection.insert(pt);
        }

        Ok((cardinality, intersection))
    }
}

fn hash_prefixed(bytes: &[u8]) -> [u8; 16] {
    let mut hasher = Sha256::new();
    hasher.update([0x00]);
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = [0u8; 16];
    out.copy_from_slice(&digest[..16]);
    out
}

fn biguint_to_bytes32(n: &BigUint) -> [u8; 32] {
    let be = n.to_bytes_be();
    let mut out = [0u8; 32];
    out[32 - be.len()..].copy_from_slice(&be);
    out
}

fn to_array16(v: Vec<u8>) -> [u8; 16] {
    let mut out = [0u8; 16];
    out.copy_from_slice(&v);
    out
}

/// Lagrange-interpolates `f(0)` given `t` points `(xs[j], ys[j])` over the
/// P-256 scalar field.
fn lagrange_interpolate_at_zero(xs: &[Scalar], ys: &[Scalar]) -> Result<Scalar> {
    let g = GroupOps;
    let mut acc = Scalar::ZERO;
    for j in 0..xs.len() {
        let mut num = g.scalar_from_u64(1);
        let mut den = g.scalar_from_u64(1);
        for m in 0..xs.len() {
            if m == j {
                continue;
            }
            num *= xs[m];
            den *= xs[m] - xs[j];
        }
        let inv = Option::<Scalar>::from(den.invert())
            .ok_or_else(|| Error::MalformedCiphertext("duplicate Lagrange x-coordinate".into()))?;
        acc += ys[j] * num * inv;
    }
    Ok(acc)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> HashSet<Vec<u8>> {
        items.iter().map(|s| s.as_bytes().to_vec()).collect()
    }

    #[test]
    fn scenario_three_from_spec() {
        let scheme = TwoClientThreshold::default();
        let t = 2;
        let (usk0, usk1) = scheme.setup(128, t).unwrap();
        let gid = [9u8; 16];

        let shared = set(&["x", "y", "z"]);

        let c0 = scheme.encrypt(&usk0, &gid, t, &shared);
        let c1 = scheme.encrypt(&usk1, &gid, t, &shared);

        let (cardinality, intersection) = scheme.eval(&[c0, c1], t).unwrap();
        assert_eq!(cardinality, 3);
        assert_eq!(intersection, shared);
    }

    #[test]
    fn scenario_four_from_spec_below_threshold() {
        let scheme = TwoClientThreshold::default();
        let t = 5;
        let (usk0, usk1) = scheme.setup(128, t).unwrap();
        let gid = [9u8; 16];

        let shared = set(&["x", "y", "z"]);
        let only0 = set(&["a0", "a1"]);
        let only1 = set(&["b0", "b1"]);

        let mut s0 = shared.clone();
        s0.extend(only0);
        let mut s1 = shared.clone();
        s1.extend(only1);

        let c0 = scheme.encrypt(&usk0, &gid, t, &s0);
        let c1 = scheme.encrypt(&usk1, &gid, t, &s1);

        let (cardinality, intersection) = scheme.eval(&[c0, c1], t).unwrap();
        assert_eq!(cardinality, 3);
        assert!(intersection.is_empty());
    }
}
