//! Scheme #1: TwoClient-Cardinality.
//!
//! Both clients share one AES-128 key; each maps its set through the
//! deterministic PRF keyed by `(key, gid)`, so equal elements collide to
//! equal ciphertexts. `eval` is then ordinary set intersection on the
//! ciphertext sets.

use std::collections::HashSet;

use tracing::debug;

use crate::error::Result;
use crate::prf::{self, Gid, PrfKey};
use crate::scheme::random_key;

/// Per-client user secret key: the shared AES-128 key.
#[derive(Clone, zeroize::Zeroize, zeroize::ZeroizeOnDrop)]
pub struct Usk(PrfKey);

/// A set of PRF outputs.
pub type CtSet = HashSet<Vec<u8>>;

/// TwoClient-Cardinality scheme instance.
#[derive(Default, Clone, Copy)]
pub struct TwoClientCardinality;

impl TwoClientCardinality {
    /// Generates the shared key; both clients get an identical `Usk`.
    pub fn setup(&self, secpar: u32) -> Result<(Usk, Usk)> {
        let key_vec = random_key(secpar)?;
        let mut key = [0u8; 16];
        key.copy_from_slice(&key_vec);
        debug!(secpar, "two_client_cardinality::setup");
        Ok((Usk(key), Usk(key)))
    }

    /// Encrypts `pt_set` under `gid` using `usk`.
    pub fn encrypt(&self, usk: &Usk, gid: &Gid, pt_set: &HashSet<Vec<u8>>) -> CtSet {
        debug!(set_size = pt_set.len(), "two_client_cardinality::encrypt");
        pt_set.iter().map(|pt| prf::prf(&usk.0, gid, pt)).collect()
    }

    /// Returns `|C_0 ∩ C_1|`.
    pub fn eval(&self, ct_sets: &[CtSet; 2]) -> usize {
        let count = ct_sets[0].intersection(&ct_sets[1]).count();
        debug!(count, "two_client_cardinality::eval");
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> HashSet<Vec<u8>> {
        items.iter().map(|s| s.as_bytes().to_vec()).collect()
    }

    #[test]
    fn scenario_one_from_spec() {
        let scheme = TwoClientCardinality;
        let (usk0, usk1) = scheme.setup(128).unwrap();
        let mut gid = [0u8; 16];
        gid[15] = 1;

        let s0 = set(&["a", "b", "c"]);
        let s1 = set(&["b", "c", "d"]);

        let c0 = scheme.encrypt(&usk0, &gid, &s0);
        let c1 = scheme.encrypt(&usk1, &gid, &s1);

        assert_eq!(scheme.eval(&[c0, c1]), 2);
    }

    #[test]
    fn encrypt_is_deterministic() {
        let scheme = TwoClientCardinality;
        let (usk0, _) = scheme.setup(128).unwrap();
        let gid = [3u8; 16];
        let s = set(&["x", "y"]);
        assert_eq!(scheme.encrypt(&usk0, &gid, &s), scheme.encrypt(&usk0, &gid, &s));
    }
}
