//! End-to-end scenarios exercising every scheme's full
//! `setup → encrypt → eval` pipeline, plus the cross-client key-sharing
//! invariants each multi-client scheme depends on for correctness.

use std::collections::HashSet;

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use nipsi::scheme::{
    MultiClientCardinality, MultiClientCardinalityEfficient, TwoClientCardinality,
    TwoClientIntersection, TwoClientThreshold,
};
use nipsi::BloomFilter;

fn set(items: &[&str]) -> HashSet<Vec<u8>> {
    items.iter().map(|s| s.as_bytes().to_vec()).collect()
}

fn padded_gid(byte: u8) -> [u8; 16] {
    let mut gid = [0u8; 16];
    gid[15] = byte;
    gid
}

#[test]
fn scenario_1_two_client_cardinality() {
    let scheme = TwoClientCardinality;
    let (usk0, usk1) = scheme.setup(128).unwrap();
    let gid = padded_gid(1);

    let s0 = set(&["a", "b", "c"]);
    let s1 = set(&["b", "c", "d"]);

    let c0 = scheme.encrypt(&usk0, &gid, &s0);
    let c1 = scheme.encrypt(&usk1, &gid, &s1);

    assert_eq!(scheme.eval(&[c0, c1]), 2);
}

#[test]
fn scenario_2_two_client_intersection() {
    let scheme = TwoClientIntersection::default();
    let (usk0, usk1) = scheme.setup(128).unwrap();
    let gid = padded_gid(1);

    let s0 = set(&["a", "b", "c"]);
    let s1 = set(&["b", "c", "d"]);

    let c0 = scheme.encrypt(&usk0, &gid, &s0);
    let c1 = scheme.encrypt(&usk1, &gid, &s1);

    let result = scheme.eval(&[c0, c1]).unwrap();
    assert_eq!(result, set(&["b", "c"]));
}

#[test]
fn scenario_3_two_client_threshold_full_overlap() {
    let scheme = TwoClientThreshold::default();
    let t = 2;
    let (usk0, usk1) = scheme.setup(128, t).unwrap();
    let gid = padded_gid(2);

    let shared = set(&["x", "y", "z"]);
    let c0 = scheme.encrypt(&usk0, &gid, t, &shared);
    let c1 = scheme.encrypt(&usk1, &gid, t, &shared);

    let (cardinality, intersection) = scheme.eval(&[c0, c1], t).unwrap();
    assert_eq!(cardinality, 3);
    assert_eq!(intersection, shared);
}

#[test]
fn scenario_4_two_client_threshold_below_threshold() {
    let scheme = TwoClientThreshold::default();
    let t = 5;
    let (usk0, usk1) = scheme.setup(128, t).unwrap();
    let gid = padded_gid(3);

    let shared = set(&["x", "y", "z"]);
    let mut s0 = shared.clone();
    s0.extend(set(&["p0", "p1"]));
    let mut s1 = shared.clone();
    s1.extend(set(&["q0", "q1"]));

    let c0 = scheme.encrypt(&usk0, &gid, t, &s0);
    let c1 = scheme.encrypt(&usk1, &gid, t, &s1);

    let (cardinality, intersection) = scheme.eval(&[c0, c1], t).unwrap();
    assert_eq!(cardinality, 3);
    assert!(intersection.is_empty());
}

#[test]
fn scenario_5_multi_client_cardinality_full_overlap() {
    let scheme = MultiClientCardinality::default();
    let mut rng = ChaCha20Rng::seed_from_u64(42);
    let usks = scheme.setup(3, &mut rng).unwrap();
    let gid = padded_gid(4);

    let s = set(&["p", "q"]);
    let cts: Vec<_> = usks.iter().map(|u| scheme.encrypt(u, &gid, &s)).collect();

    assert_eq!(scheme.eval(&cts).unwrap(), 2);
}

#[test]
fn scenario_6_multi_client_cardinality_efficient() {
    let scheme = MultiClientCardinalityEfficient::default();
    let mut rng = ChaCha20Rng::seed_from_u64(7);
    let (m, k) = BloomFilter::determine_parameters(100, 0.001);
    let usks = scheme.setup(128, 3, &mut rng).unwrap();
    let gid = padded_gid(5);

    let shared = ["shared-1", "shared-2"];
    let sets: Vec<HashSet<Vec<u8>>> = (0..3)
        .map(|c| {
            let mut s: HashSet<Vec<u8>> = shared.iter().map(|e| e.as_bytes().to_vec()).collect();
            for i in 0..10 {
                s.insert(format!("client{c}-only-{i}").into_bytes());
            }
            s
        })
        .collect();

    let cts: Vec<_> = usks
        .iter()
        .zip(&sets)
        .map(|(u, s)| scheme.encrypt(u, &gid, s, m, k, &mut rng))
        .collect();

    let cardinality = scheme.eval(&cts, m, k).unwrap();
    assert_eq!(cardinality, shared.len());
}

#[test]
fn multi_client_cardinality_shares_sum_to_zero() {
    let scheme = MultiClientCardinality::default();
    let mut rng = ChaCha20Rng::seed_from_u64(11);
    let usks = scheme.setup(5, &mut rng).unwrap();

    let gid = padded_gid(9);
    let s = set(&["z"]);
    // Indirect check: if shares truly sum to zero, a singleton set shared by
    // every client must be recoverable by eval regardless of which client
    // encrypts which copy.
    let cts: Vec<_> = usks.iter().map(|u| scheme.encrypt(u, &gid, &s)).collect();
    assert_eq!(scheme.eval(&cts).unwrap(), 1);
}

#[test]
fn two_client_threshold_sigma_shares_combine_to_one() {
    // Not directly observable from outside, but scenario 3 above already
    // exercises the full chain (phi(sigma) recombination via ct3); this test
    // pins the field-arithmetic identity the scheme relies on.
    use nipsi::GroupOps;
    let g = GroupOps;
    let mut rng = rand::thread_rng();
    let sigma = g.random_scalar(&mut rng);
    let one = g.scalar_from_u64(1);
    let share = one - sigma;
    assert_eq!(sigma + share, one);
}
