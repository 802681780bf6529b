//! Property-based tests for Bloom-filter laws and for scheme #1
//! correctness over randomly generated set pairs with controlled overlap.

use std::collections::HashSet;

use proptest::collection::{hash_set, vec};
use proptest::prelude::*;

use nipsi::scheme::TwoClientCardinality;
use nipsi::BloomFilter;

fn word_strategy() -> impl Strategy<Value = Vec<u8>> {
    "[a-z]{1,8}".prop_map(|s| s.into_bytes())
}

proptest! {
    #[test]
    fn bloom_no_false_negatives(elems in vec(word_strategy(), 0..50)) {
        let mut bf = BloomFilter::new(4096, 8);
        for e in &elems {
            bf.add(e);
        }
        for e in &elems {
            prop_assert!(bf.contains(e));
        }
    }

    #[test]
    fn bloom_weight_bounded_by_n_times_k(elems in hash_set(word_strategy(), 0..40)) {
        let mut bf = BloomFilter::new(4096, 6);
        for e in &elems {
            bf.add(e);
        }
        prop_assert!(bf.weight() <= elems.len() * 6);
    }

    #[test]
    fn bloom_union_dominates_either_operand(
        a_elems in hash_set(word_strategy(), 0..20),
        b_elems in hash_set(word_strategy(), 0..20),
    ) {
        let mut a = BloomFilter::new(2048, 5);
        let mut b = BloomFilter::new(2048, 5);
        for e in &a_elems { a.add(e); }
        for e in &b_elems { b.add(e); }
        let u = a.union(&b).unwrap();
        for e in &a_elems { prop_assert!(u.contains(e)); }
        for e in &b_elems { prop_assert!(u.contains(e)); }
    }

    #[test]
    fn scheme_one_cardinality_matches_set_intersection(
        a_elems in hash_set(word_strategy(), 0..30),
        b_elems in hash_set(word_strategy(), 0..30),
    ) {
        let scheme = TwoClientCardinality;
        let (usk0, usk1) = scheme.setup(128).unwrap();
        let gid = [3u8; 16];

        let s0: HashSet<Vec<u8>> = a_elems.clone();
        let s1: HashSet<Vec<u8>> = b_elems.clone();

        let c0 = scheme.encrypt(&usk0, &gid, &s0);
        let c1 = scheme.encrypt(&usk1, &gid, &s1);

        let expected = s0.intersection(&s1).count();
        prop_assert_eq!(scheme.eval(&[c0, c1]), expected);
    }
}
