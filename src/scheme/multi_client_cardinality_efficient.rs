//! Scheme #5: MultiClient-CardinalityEfficient.
//!
//! Replaces scheme #4's exponential Cartesian-product search with a
//! per-bit Bloom-filter test. Keys are Shamir shares of a degree-`n`
//! polynomial `f` with `f(0) = 0`; client `i` holds `(f(i), f(n+i))`.
//! Every bit of every client's set filter is masked by `H(…)^{f(i)}`
//! (random when the bit is unset), and every bit of a candidate
//! element's own filter additionally carries a `g_r^t` factor where `t`
//! is that element's own bit weight. Lagrange-interpolating the masks at
//! `x = 0` across all `n` clients plus one client's element-ciphertext
//! cancels the `H(…)^{f(i)}` terms on bits where every client's set
//! filter (and the element) agree, exposing `g_r^t` for comparison.

use std::collections::HashSet;

use p256::elliptic_curve::Field;
use tracing::debug;

use crate::bloom::BloomFilter;
use crate::error::{Error, Result};
use crate::group::{GroupOps, Point, PointBytes, Scalar, ScalarBytes};
use crate::prf::{self, Gid, PrfKey};
use crate::scheme::random_key;

/// Per-client user secret key. `f_i` and `f_ni` — this client's two
/// Shamir shares — are stored as their canonical byte encodings so
/// dropping the key zeroizes both in place.
#[derive(Clone, zeroize::Zeroize, zeroize::ZeroizeOnDrop)]
pub struct Usk {
    phi_key: PrfKey,
    f_i: ScalarBytes,
    f_ni: ScalarBytes,
}

/// One element's per-bit ciphertext: `(a_ℓ · grho, g_r)` for `ℓ = 0..m`.
pub type ElementCiphertext = Vec<(PointBytes, PointBytes)>;

/// A client's full ciphertext: the set-level Bloom mask plus one
/// [`ElementCiphertext`] per set element.
#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ciphertext {
    /// Serialized masked Bloom filter bits for this client's whole set.
    pub bf_set: Vec<PointBytes>,
    /// Per-element ciphertexts, one [`ElementCiphertext`] per set member.
    pub elements: Vec<ElementCiphertext>,
}

/// MultiClient-CardinalityEfficient scheme instance.
#[derive(Clone, Copy)]
pub struct MultiClientCardinalityEfficient {
    g: GroupOps,
}

impl Default for MultiClientCardinalityEfficient {
    fn default() -> Self {
        MultiClientCardinalityEfficient { g: GroupOps }
    }
}

impl MultiClientCardinalityEfficient {
    fn scalar_pow_u64(&self, base: Scalar, mut exp: u64) -> Scalar {
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

    fn f_i_scalar(&self, usk: &Usk) -> Scalar {
        self.g
            .deserialize_scalar(&usk.f_i)
            .expect("usk f_i share is serialized internally and always canonical")
    }

    fn f_ni_scalar(&self, usk: &Usk) -> Scalar {
        self.g
            .deserialize_scalar(&usk.f_ni)
            .expect("usk f_ni share is serialized internally and always canonical")
    }

    fn hash_index(&self, ell: usize, k: usize, gid: &Gid) -> Point {
        let prefix_len = BloomFilter::index_prefix_len(k);
        let mut buf = vec![0u8; prefix_len + gid.len()];
        crate::bloom::write_be_uint(&mut buf[..prefix_len], ell as u64);
        buf[prefix_len..].copy_from_slice(gid);
        self.g.hash_to_point(&buf)
    }

    /// Generates `n` clients' keys from a degree-`n` polynomial with
    /// `f(0) = 0`. `m` and `k` must match the Bloom-filter parameters
    /// used by every subsequent `encrypt`/`eval` call.
    pub fn setup<R: rand_core::CryptoRng + rand_core::RngCore>(
        &self,
        secpar: u32,
        n: usize,
        rng: &mut R,
    ) -> Result<Vec<Usk>> {
        if n < 2 {
            return Err(Error::InvalidArgument("n must be at least 2".into()));
        }
        let phi_key = random_key(secpar)?;
        let mut phi_key_arr = [0u8; 16];
        phi_key_arr.copy_from_slice(&phi_key);

        let mut coeffs = vec![Scalar::ZERO];
        for _ in 0..n {
            coeffs.push(self.g.random_scalar(rng));
        }

        let f = |x: u64| -> Scalar {
            coeffs
                .iter()
                .enumerate()
                .fold(Scalar::ZERO, |acc, (i, c)| acc + *c * self.scalar_pow_u64(self.g.scalar_from_u64(x), i as u64))
        };

        debug!(n, "multi_client_cardinality_efficient::setup");
        Ok((1..=n as u64)
            .map(|i| Usk {
                phi_key: phi_key_arr,
                f_i: self.g.serialize_scalar(&f(i)),
                f_ni: self.g.serialize_scalar(&f(n as u64 + i)),
            })
            .collect())
    }

    /// Encrypts `pt_set` under `gid` with Bloom-filter parameters `(m, k)`.
    pub fn encrypt<R: rand_core::CryptoRng + rand_core::RngCore>(
        &self,
        usk: &Usk,
        gid: &Gid,
        pt_set: &HashSet<Vec<u8>>,
        m: usize,
        k: usize,
        rng: &mut R,
    ) -> Ciphertext {
        debug!(
            set_size = pt_set.len(),
            m, k, "multi_client_cardinality_efficient::encrypt"
        );
        let mut bf_set = BloomFilter::new(m, k);
        let mapped: Vec<Vec<u8>> = pt_set
            .iter()
            .map(|pt| {
                let ct = prf::prf(&usk.phi_key, gid, pt);
                bf_set.add(&ct);
                ct
            })
            .collect();

        let f_ni = self.f_ni_scalar(usk);
        let mut elements = Vec::with_capacity(mapped.len());
        for ct in &mapped {
            let mut bf = BloomFilter::new(m, k);
            bf.add(ct);
            let t = bf.weight() as u64;

            let mut bits = Vec::with_capacity(m);
            for ell in 0..m {
                let a = self.hash_index(ell, k, gid) * f_ni;
                let gr = self.g.random_point(rng);
                let grho = if bf.bit(ell) {
                    gr * self.g.scalar_from_u64(t)
                } else {
                    self.g.random_point(rng)
                };
                bits.push((
                    self.g.serialize_point(&(a + grho)),
                    self.g.serialize_point(&gr),
                ));
            }
            elements.push(bits);
        }

        let f_i = self.f_i_scalar(usk);
        let mut bf_set_ct = Vec::with_capacity(m);
        for ell in 0..m {
            let mut b = self.hash_index(ell, k, gid) * f_i;
            if !bf_set.bit(ell) {
                b += self.g.random_point(rng);
            }
            bf_set_ct.push(self.g.serialize_point(&b));
        }

        Ciphertext { bf_set: bf_set_ct, elements }
    }

    fn delta(&self, s_indices: &[u64], i: u64) -> Result<Scalar> {
        let mut prod = self.g.scalar_from_u64(1);
        let ii = self.g.scalar_from_u64(i);
        for &j in s_indices {
            if j == i {
                continue;
            }
            let jj = self.g.scalar_from_u64(j);
            let diff = jj - ii;
            let inv = Option::<Scalar>::from(diff.invert())
                .ok_or_else(|| Error::MalformedCiphertext("duplicate Lagrange index".into()))?;
            prod *= jj * inv;
        }
        Ok(prod)
    }

    /// Returns the cardinality of the `n`-way set intersection with
    /// Bloom-filter parameters `(m, k)`.
    pub fn eval(&self, ct_sets: &[Ciphertext], m: usize, k: usize) -> Result<usize> {
        let n = ct_sets.len();
        let (smallest_idx, _) = ct_sets
            .iter()
            .enumerate()
            .min_by_key(|(_, c)| c.elements.len())
            .ok_or_else(|| Error::InvalidArgument("ct_sets must not be empty".into()))?;
        let gamma = (smallest_idx + 1) as u64;

        let s_indices: Vec<u64> = (1..=n as u64).chain(std::iter::once(n as u64 + gamma)).collect();

        let mut a_list = Vec::with_capacity(m);
        for ell in 0..m {
            let mut a = self.g.identity();
            for (idx, ct_set) in ct_sets.iter().enumerate() {
                let i = (idx + 1) as u64;
                let d = self.delta(&s_indices, i)?;
                let p = self.g.deserialize_point(&ct_set.bf_set[ell])?;
                a = a + p * d;
            }
            a_list.push(a);
        }

        let big_delta = self.delta(&s_indices, n as u64 + gamma)?;
        let elements = &ct_sets[smallest_idx].elements;

        let mut cardinality = 0usize;
        for element in elements {
            let mut t: Option<u64> = None;
            let mut identical_count = 0u64;

            'ell_loop: for ell in 0..m {
                let ct0 = self.g.deserialize_point(&element[ell].0)?;
                let ct1 = self.g.deserialize_point(&element[ell].1)?;
                let lhs = ct0 * big_delta + a_list[ell];

                match t {
                    None => {
                        for cand in (1..=k as u64).rev() {
                            let rhs = ct1 * (big_delta * self.g.scalar_from_u64(cand));
                            if lhs == rhs {
                                t = Some(cand);
                                identical_count = 1;
                                break;
                            }
                        }
                    }
                    Some(tt) => {
                        let rhs = ct1 * (big_delta * self.g.scalar_from_u64(tt));
                        if lhs == rhs {
                            identical_count += 1;
                            if tt == identical_count {
                                cardinality += 1;
                                break 'ell_loop;
                            }
                        }
                    }
                }
            }
        }

        debug!(cardinality, "multi_client_cardinality_efficient::eval");
        Ok(cardinality)
    }
}
