//! Prime-order elliptic-curve group abstraction (`GroupOps`).
//!
//! The reference curve is NIST P-256, matching the reproducibility
//! constants callers may rely on for cross-implementation ciphertext
//! interop. `Scalar` is `p256::Scalar` (an element of GF(q)); `Point` is
//! `p256::ProjectivePoint` (an element of the prime-order subgroup).

use num_bigint::BigUint;
use once_cell::sync::Lazy;
use p256::elliptic_curve::{
    generic_array::GenericArray,
    group::ff::PrimeField,
    group::{Group as _, GroupEncoding},
    hash2curve::{ExpandMsgXmd, GroupDigest},
    sec1::{FromEncodedPoint, ToEncodedPoint},
    Field,
};
use p256::{AffinePoint, EncodedPoint, NistP256, ProjectivePoint};
use sha2::Sha256;

use crate::error::{Error, Result};

/// An element of the P-256 scalar field GF(q).
pub type Scalar = p256::Scalar;
/// An element of the P-256 prime-order subgroup.
pub type Point = ProjectivePoint;

/// Domain separation tag for the hash-to-curve map, scoped to this crate
/// so it never collides with another protocol's use of the same curve.
const HASH_TO_CURVE_DST: &[u8] = b"NIPSI-P256_XMD:SHA-256_SSWU_RO_";

/// The order q of the P-256 scalar field, as a big-endian hex string
/// from FIPS 186-4.
const ORDER_HEX: &str = "ffffffff00000000ffffffffffffffffbce6faada7179e84f3b9cac2fc632551";

static ORDER: Lazy<BigUint> = Lazy::new(|| BigUint::parse_bytes(ORDER_HEX.as_bytes(), 16).unwrap());
static ORDER_MINUS_ONE: Lazy<BigUint> = Lazy::new(|| &*ORDER - 1u32);

/// Canonical compressed SEC1 encoding of a [`Point`]: 33 bytes.
pub type PointBytes = [u8; 33];
/// Canonical big-endian encoding of a [`Scalar`]: 32 bytes.
pub type ScalarBytes = [u8; 32];

/// Stateless handle to the fixed P-256 group and its generator.
///
/// `GroupOps` carries no mutable state: it is `Copy` and safely shared
/// across every `encrypt`/`eval` call of a scheme instance.
#[derive(Copy, Clone, Debug, Default)]
pub struct GroupOps;

impl GroupOps {
    /// The group's fixed generator.
    pub fn generator(&self) -> Point {
        ProjectivePoint::GENERATOR
    }

    /// The additive identity of the group (`g^0`).
    pub fn identity(&self) -> Point {
        ProjectivePoint::IDENTITY
    }

    /// The order q of the scalar field.
    pub fn order(&self) -> &'static BigUint {
        &ORDER
    }

    /// `q - 1`, the modulus for exponent-of-exponent arithmetic (scheme #3's rho).
    pub fn order_minus_one(&self) -> &'static BigUint {
        &ORDER_MINUS_ONE
    }

    /// A uniformly random scalar in `[0, q)`.
    pub fn random_scalar<R: rand_core::CryptoRng + rand_core::RngCore>(&self, rng: &mut R) -> Scalar {
        Scalar::random(rng)
    }

    /// A uniformly random point in the group.
    pub fn random_point<R: rand_core::CryptoRng + rand_core::RngCore>(&self, rng: &mut R) -> Point {
        self.generator() * self.random_scalar(rng)
    }

    /// Deterministic hash-to-point over arbitrary bytes (IETF hash-to-curve,
    /// `XMD:SHA-256_SSWU_RO_` suite).
    pub fn hash_to_point(&self, bytes: &[u8]) -> Point {
        NistP256::hash_from_bytes::<ExpandMsgXmd<Sha256>>(&[bytes], &[HASH_TO_CURVE_DST])
            .expect("hash-to-curve only fails on empty DST, which is fixed and non-empty")
    }

    /// Canonical compressed serialization of a point.
    pub fn serialize_point(&self, point: &Point) -> PointBytes {
        let encoded = point.to_affine().to_encoded_point(true);
        let mut out = [0u8; 33];
        out.copy_from_slice(encoded.as_bytes());
        out
    }

    /// Deserializes a compressed point, rejecting points not on the curve
    /// or not in the prime-order subgroup's canonical encoding.
    pub fn deserialize_point(&self, bytes: &[u8]) -> Result<Point> {
        let encoded = EncodedPoint::from_bytes(bytes)
            .map_err(|e| Error::MalformedCiphertext(format!("bad point encoding: {e}")))?;
        let affine = Option::<AffinePoint>::from(AffinePoint::from_encoded_point(&encoded))
            .ok_or_else(|| Error::MalformedCiphertext("point not on curve".into()))?;
        Ok(ProjectivePoint::from(affine))
    }

    /// Canonical big-endian serialization of a scalar.
    pub fn serialize_scalar(&self, scalar: &Scalar) -> ScalarBytes {
        let repr = scalar.to_repr();
        let mut out = [0u8; 32];
        out.copy_from_slice(repr.as_ref());
        out
    }

    /// Deserializes a big-endian scalar encoding.
    pub fn deserialize_scalar(&self, bytes: &[u8]) -> Result<Scalar> {
        if bytes.len() != 32 {
            return Err(Error::MalformedCiphertext(format!(
                "scalar must be 32 bytes, got {}",
                bytes.len()
            )));
        }
        let repr = GenericArray::clone_from_slice(bytes);
        Option::<Scalar>::from(Scalar::from_repr(repr))
            .ok_or_else(|| Error::MalformedCiphertext("scalar not canonical".into()))
    }

    /// Reduces an arbitrary-length big-endian byte string mod q. Used to
    /// turn PRF output into a scalar (schemes #2, #3, #4).
    pub fn reduce_mod_q(&self, bytes: &[u8]) -> Scalar {
        let n = BigUint::from_bytes_be(bytes) % &*ORDER;
        biguint_to_scalar(&n)
    }

    /// Reduces an arbitrary-length big-endian byte string mod `q-1`, the
    /// modulus for scheme #3's rho exponent-of-exponent arithmetic.
    pub fn reduce_mod_q_minus_one(&self, bytes: &[u8]) -> BigUint {
        BigUint::from_bytes_be(bytes) % &*ORDER_MINUS_ONE
    }

    /// `base^exponent mod q`, where `exponent` is an arbitrary (possibly
    /// `> q`) non-negative integer living in `ℤ_{q-1}` (scheme #3's rho
    /// exponentiation, and scheme #5's Lagrange coefficients).
    pub fn pow_mod_q(&self, base: &Scalar, exponent: &BigUint) -> Scalar {
        let base_int = BigUint::from_bytes_be(&self.serialize_scalar(base));
        let result = base_int.modpow(exponent, &ORDER);
        biguint_to_scalar(&result)
    }

    /// Converts a small non-negative integer (participant index, Bloom-bit
    /// position) to a scalar via double-and-add, mirroring how threshold
    /// signature schemes turn small identifiers into field elements.
    pub fn scalar_from_u64(&self, n: u64) -> Scalar {
        let mut acc = Scalar::ZERO;
        let mut base = Scalar::ONE;
        let mut n = n;
        while n > 0 {
            if n & 1 == 1 {
                acc += base;
            }
            base += base;
            n >>= 1;
        }
        acc
    }
}

fn biguint_to_scalar(n: &BigUint) -> Scalar {
    let mut be = n.to_bytes_be();
    if be.len() > 32 {
        be = be[be.len() - 32..].to_vec();
    }
    let mut padded = [0u8; 32];
    padded[32 - be.len()..].copy_from_slice(&be);
    Option::<Scalar>::from(Scalar::from_repr(GenericArray::clone_from_slice(&padded)))
        .expect("reduced value is always canonically representable")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::thread_rng;

    #[test]
    fn generator_is_not_identity() {
        let g = GroupOps;
        assert_ne!(g.generator(), g.identity());
    }

    #[test]
    fn point_roundtrip() {
        let g = GroupOps;
        let mut rng = thread_rng();
        let p = g.random_point(&mut rng);
        let bytes = g.serialize_point(&p);
        let p2 = g.deserialize_point(&bytes).unwrap();
        assert_eq!(p, p2);
    }

    #[test]
    fn scalar_roundtrip() {
        let g = GroupOps;
        let mut rng = thread_rng();
        let s = g.random_scalar(&mut rng);
        let bytes = g.serialize_scalar(&s);
        let s2 = g.deserialize_scalar(&bytes).unwrap();
        assert_eq!(s, s2);
    }

    #[test]
    fn deserialize_rejects_garbage() {
        let g = GroupOps;
        let bytes = [0xffu8; 33];
        assert!(g.deserialize_point(&bytes).is_err());
    }

    #[test]
    fn hash_to_point_is_deterministic() {
        let g = GroupOps;
        let a = g.hash_to_point(b"hello");
        let b = g.hash_to_point(b"hello");
        let c = g.hash_to_point(b"world");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn reduce_mod_q_is_less_than_order() {
        let g = GroupOps;
        let huge = vec![0xffu8; 64];
        let s = g.reduce_mod_q(&huge);
        let back = BigUint::from_bytes_be(&g.serialize_scalar(&s));
        assert!(back < *g.order());
    }

    #[test]
    fn reduce_mod_q_minus_one_is_less_than_order_minus_one() {
        let g = GroupOps;
        let huge = vec![0xffu8; 64];
        let n = g.reduce_mod_q_minus_one(&huge);
        assert!(n < *g.order_minus_one());
    }

    #[test]
    fn pow_mod_q_composes() {
        let g = GroupOps;
        let mut rng = thread_rng();
        let base = g.random_scalar(&mut rng);
        let e1 = BigUint::from(7u32);
        let e2 = BigUint::from(11u32);
        let lhs = g.pow_mod_q(&g.pow_mod_q(&base, &e1), &e2);
        let rhs = g.pow_mod_q(&base, &(e1 * e2));
        assert_eq!(lhs, rhs);
    }
}
