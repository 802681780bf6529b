//! Scheme #4: MultiClient-Cardinality.
//!
//! `n` clients share no secret beyond an additive zero-sum split
//! `s_1 + … + s_n = 0 (mod q)`. Each maps its set through
//! `x ↦ H(gid‖x)^{s_i}`; for `x` common to all `n` sets the per-client
//! ciphertexts multiply out to the identity, since the exponents sum to
//! zero. `eval` is a depth-first Cartesian-product search for tuples
//! whose product is the identity, pruning matched candidates so a single
//! element cannot be counted in two different winning tuples.

use std::collections::HashSet;

use p256::elliptic_curve::Field;
use tracing::debug;

use crate::error::Result;
use crate::group::{GroupOps, Point, PointBytes, Scalar, ScalarBytes};
use crate::prf::Gid;
use crate::scheme::require_non_empty;

/// Per-client user secret key: this client's additive share `s_i`,
/// stored as its canonical byte encoding so dropping the key zeroizes
/// the share in place rather than leaving it live in a `Scalar`.
#[derive(Clone, zeroize::Zeroize, zeroize::ZeroizeOnDrop)]
pub struct Usk(ScalarBytes);

/// A set of serialized group elements.
pub type CtSet = HashSet<PointBytes>;

/// MultiClient-Cardinality scheme instance.
#[derive(Clone, Copy)]
pub struct MultiClientCardinality {
    g: GroupOps,
}

impl Default for MultiClientCardinality {
    fn default() -> Self {
        MultiClientCardinality { g: GroupOps }
    }
}

impl MultiClientCardinality {
    /// Draws `n` shares summing to zero mod q.
    pub fn setup<R: rand_core::CryptoRng + rand_core::RngCore>(
        &self,
        n: usize,
        rng: &mut R,
    ) -> Result<Vec<Usk>> {
        if n < 2 {
            return Err(crate::error::Error::InvalidArgument(
                "n must be at least 2".into(),
            ));
        }
        let mut shares = Vec::with_capacity(n);
        let mut running_sum = Scalar::ZERO;
        for _ in 0..n - 1 {
            let s = self.g.random_scalar(rng);
            running_sum += s;
            shares.push(s);
        }
        shares.push(-running_sum);
        debug!(n, "multi_client_cardinality::setup");
        Ok(shares
            .into_iter()
            .map(|s| Usk(self.g.serialize_scalar(&s)))
            .collect())
    }

    fn share_scalar(&self, usk: &Usk) -> Scalar {
        self.g
            .deserialize_scalar(&usk.0)
            .expect("usk share is serialized internally and always canonical")
    }

    fn phi(&self, gid: &Gid, pt: &[u8]) -> Point {
        let mut bytes = Vec::with_capacity(gid.len() + pt.len());
        bytes.extend_from_slice(gid);
        bytes.extend_from_slice(pt);
        self.g.hash_to_point(&bytes)
    }

    /// Encrypts `pt_set` under `gid` using this client's share.
    pub fn encrypt(&self, usk: &Usk, gid: &Gid, pt_set: &HashSet<Vec<u8>>) -> CtSet {
        debug!(set_size = pt_set.len(), "multi_client_cardinality::encrypt");
        let share = self.share_scalar(usk);
        pt_set
            .iter()
            .map(|pt| self.g.serialize_point(&(self.phi(gid, pt) * share)))
            .collect()
    }

    /// Counts the tuples `(c_1, …, c_n)` whose product is the identity.
    pub fn eval(&self, ct_sets: &[CtSet]) -> Result<usize> {
        require_non_empty(ct_sets, "ct_sets")?;
        let mut sets: Vec<HashSet<PointBytes>> = ct_sets.to_vec();
        let count = self.count_recursive(&mut sets, 0, self.g.identity())?;
        debug!(count, clients = sets.len(), "multi_client_cardinality::eval");
        Ok(count)
    }

    fn count_recursive(
        &self,
        sets: &mut [HashSet<PointBytes>],
        depth: usize,
        partial: Point,
    ) -> Result<usize> {
        if depth == sets.len() - 1 {
            let candidates: Vec<PointBytes> = sets[depth].iter().copied().collect();
            for c in candidates {
                let p = self.g.deserialize_point(&c)?;
                if partial + p == self.g.identity() {
                    sets[depth].remove(&c);
                    return Ok(1);
                }
            }
            return Ok(0);
        }

        let candidates: Vec<PointBytes> = sets[depth].iter().copied().collect();
        let mut total = 0;
        for c in candidates {
            let p = self.g.deserialize_point(&c)?;
            let found = self.count_recursive(sets, depth + 1, partial + p)?;
            total += found;
            if found == 1 {
                sets[depth].remove(&c);
            }
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::thread_rng;

    fn set(items: &[&str]) -> HashSet<Vec<u8>> {
        items.iter().map(|s| s.as_bytes().to_vec()).collect()
    }

    #[test]
    fn shares_sum_to_zero() {
        let scheme = MultiClientCardinality::default();
        let mut rng = thread_rng();
        let usks = scheme.setup(4, &mut rng).unwrap();
        let sum: Scalar = usks
            .iter()
            .fold(Scalar::ZERO, |acc, u| acc + scheme.share_scalar(u));
        assert_eq!(sum, Scalar::ZERO);
    }

    #[test]
    fn three_way_intersection() {
        let scheme = MultiClientCardinality::default();
        let mut rng = thread_rng();
        let usks = scheme.setup(3, &mut rng).unwrap();
        let gid = [5u8; 16];

        let s0 = set(&["a", "b", "c"]);
        let s1 = set(&["b", "c", "d"]);
        let s2 = set(&["b", "c", "e"]);

        let c0 = scheme.encrypt(&usks[0], &gid, &s0);
        let c1 = scheme.encrypt(&usks[1], &gid, &s1);
        let c2 = scheme.encrypt(&usks[2], &gid, &s2);

        assert_eq!(scheme.eval(&[c0, c1, c2]).unwrap(), 2);
    }

    #[test]
    fn no_overlap_is_zero() {
        let scheme = MultiClientCardinality::default();
        let mut rng = thread_rng();
        let usks = scheme.setup(2, &mut rng).unwrap();
        let gid = [6u8; 16];

        let s0 = set(&["a", "b"]);
        let s1 = set(&["c", "d"]);

        let c0 = scheme.encrypt(&usks[0], &gid, &s0);
        let c1 = scheme.encrypt(&usks[1], &gid, &s1);

        assert_eq!(scheme.eval(&[c0, c1]).unwrap(), 0);
    }
}
