//! Bit-addressable Bloom filter with k MurmurHash3-derived hash functions.
//!
//! The hash construction and the exact rounding of `determine_parameters`
//! are reproduced bit-for-bit from the reference implementation, since
//! scheme #5's ciphertext interop depends on both: two parties disagreeing
//! on a single bit position would desynchronize the polynomial-evaluation
//! masking entirely.

use byteorder::{BigEndian, ByteOrder};

use crate::error::{Error, Result};

/// An `m`-bit, `k`-hash Bloom filter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BloomFilter {
    m: usize,
    k: usize,
    bits: Vec<u8>,
}

impl BloomFilter {
    /// Creates an empty filter with `m` bits and `k` hash functions.
    pub fn new(m: usize, k: usize) -> Self {
        BloomFilter {
            m,
            k,
            bits: vec![0u8; (m + 7) / 8],
        }
    }

    /// Bit width.
    pub fn m(&self) -> usize {
        self.m
    }

    /// Hash-function count.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Determines `(m, k)` for `max_elements` items at false-positive rate
    /// `error_rate`, using the same nearest-integer rounding as the
    /// reference: `m = round(-n·ln(p) / ln(2)^2)`, `k = round(-log2(p))`.
    ///
    /// For `(n=1000, p=0.001)` this reproduces `(14378, 10)` exactly.
    pub fn determine_parameters(max_elements: usize, error_rate: f64) -> (usize, usize) {
        let n = max_elements as f64;
        let p = error_rate;
        let m = (-(n * p.ln()) / core::f64::consts::LN_2.powi(2)).round() as usize;
        let k = (-p.log2()).round() as usize;
        (m, k)
    }

    /// The number of big-endian bytes used to encode a hash-function
    /// index `i < k`: `⌈bit_length(k) / 8⌉`, matching the reference's
    /// `k.bit_length()`-byte (not bit-length/8-rounded-up... see below)
    /// index prefix.
    pub(crate) fn index_prefix_len(k: usize) -> usize {
        // The reference encodes `i` in `k.bit_length()` *bytes*
        // (`i.to_bytes(self.k.bit_length(), 'big')`), i.e. the bit length
        // of k used directly as a byte count, not divided by 8. This is
        // unusual but must be reproduced verbatim for ciphertext interop.
        bit_length(k as u64).max(1)
    }

    fn hash_i(&self, i: usize, x: &[u8]) -> usize {
        let prefix_len = Self::index_prefix_len(self.k);
        let mut buf = vec![0u8; prefix_len + x.len()];
        write_be_uint(&mut buf[..prefix_len], i as u64);
        buf[prefix_len..].copy_from_slice(x);

        let h = if self.m > u32::MAX as usize {
            murmur3_x64_128(&buf, 0) as usize
        } else {
            murmur3_x86_32(&buf, 0) as usize
        };
        h % self.m
    }

    /// Sets or clears bit `idx`. Unlike the reference's `__setitem__`
    /// (which ignores `value` and always sets the bit to 1 once range
    /// checking passes), this actually clears when `value == 0`.
    pub fn set_bit(&mut self, idx: usize, value: bool) {
        assert!(idx < self.m, "bit index out of range");
        let byte = idx / 8;
        let bit = 1u8 << (idx % 8);
        if value {
            self.bits[byte] |= bit;
        } else {
            self.bits[byte] &= !bit;
        }
    }

    /// Reads bit `idx`.
    pub fn bit(&self, idx: usize) -> bool {
        assert!(idx < self.m, "bit index out of range");
        (self.bits[idx / 8] >> (idx % 8)) & 1 == 1
    }

    /// Adds `x` to the filter: sets the `k` bits `h_i(x) mod m`.
    pub fn add(&mut self, x: &[u8]) {
        for i in 0..self.k {
            let idx = self.hash_i(i, x);
            self.set_bit(idx, true);
        }
    }

    /// True iff every one of the `k` bits for `x` is set.
    pub fn contains(&self, x: &[u8]) -> bool {
        (0..self.k).all(|i| self.bit(self.hash_i(i, x)))
    }

    fn check_compatible(&self, other: &BloomFilter) -> Result<()> {
        if self.m != other.m || self.k != other.k {
            return Err(Error::ParameterMismatch(format!(
                "bloom filters differ: ({}, {}) vs ({}, {})",
                self.m, self.k, other.m, other.k
            )));
        }
        Ok(())
    }

    /// Bitwise-OR of two filters with matching `(m, k)`.
    pub fn union(&self, other: &BloomFilter) -> Result<BloomFilter> {
        self.check_compatible(other)?;
        let bits = self
            .bits
            .iter()
            .zip(&other.bits)
            .map(|(a, b)| a | b)
            .collect();
        Ok(BloomFilter { m: self.m, k: self.k, bits })
    }

    /// Bitwise-AND of two filters with matching `(m, k)`.
    pub fn intersection(&self, other: &BloomFilter) -> Result<BloomFilter> {
        self.check_compatible(other)?;
        let bits = self
            .bits
            .iter()
            .zip(&other.bits)
            .map(|(a, b)| a & b)
            .collect();
        Ok(BloomFilter { m: self.m, k: self.k, bits })
    }

    /// Hamming weight (popcount) of the underlying bit string.
    pub fn weight(&self) -> usize {
        self.bits.iter().map(|b| b.count_ones() as usize).sum()
    }
}

fn bit_length(mut n: u64) -> usize {
    let mut len = 0;
    while n > 0 {
        len += 1;
        n >>= 1;
    }
    len
}

pub(crate) fn write_be_uint(buf: &mut [u8], value: u64) {
    let len = buf.len();
    let mut tmp = [0u8; 8];
    BigEndian::write_u64(&mut tmp, value);
    buf.copy_from_slice(&tmp[8 - len..]);
}

/// MurmurHash3 x86_32, used when `m` fits in 32 bits.
fn murmur3_x86_32(data: &[u8], seed: u32) -> u32 {
    const C1: u32 = 0xcc9e2d51;
    const C2: u32 = 0x1b873593;

    let mut h1 = seed;
    let chunks = data.chunks_exact(4);
    let tail = chunks.remainder();

    for chunk in chunks {
        let mut k1 = u32::from_le_bytes(chunk.try_into().unwrap());
        k1 = k1.wrapping_mul(C1);
        k1 = k1.rotate_left(15);
        k1 = k1.wrapping_mul(C2);

        h1 ^= k1;
        h1 = h1.rotate_left(13);
        h1 = h1.wrapping_mul(5).wrapping_add(0xe6546b64);
    }

    let mut k1 = 0u32;
    for (i, &b) in tail.iter().enumerate().rev() {
        k1 ^= (b as u32) << (8 * i);
        if i == 0 {
            k1 = k1.wrapping_mul(C1);
            k1 = k1.rotate_left(15);
            k1 = k1.wrapping_mul(C2);
            h1 ^= k1;
        }
    }

    h1 ^= data.len() as u32;
    h1 = fmix32(h1);
    h1
}

fn fmix32(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85ebca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2ae35);
    h ^= h >> 16;
    h
}

/// MurmurHash3 x64_128, used when `m` does not fit in 32 bits. Returns the
/// low 64 bits of the 128-bit digest, matching the reference's use of
/// `mmh3.hash128` (reduced mod m, for which only the low bits matter).
fn murmur3_x64_128(data: &[u8], seed: u64) -> u64 {
    const C1: u64 = 0x87c37b91114253d5;
    const C2: u64 = 0x4cf5ad432745937f;

    let mut h1 = seed;
    let mut h2 = seed;

    let chunks = data.chunks_exact(16);
    let tail = chunks.remainder();

    for chunk in chunks {
        let mut k1 = u64::from_le_bytes(chunk[0..8].try_into().unwrap());
        let mut k2 = u64::from_le_bytes(chunk[8..16].try_into().unwrap());

        k1 = k1.wrapping_mul(C1);
        k1 = k1.rotate_left(31);
        k1 = k1.wrapping_mul(C2);
        h1 ^= k1;
        h1 = h1.rotate_left(27);
        h1 = h1.wrapping_add(h2);
        h1 = h1.wrapping_mul(5).wrapping_add(0x52dce729);

        k2 = k2.wrapping_mul(C2);
        k2 = k2.rotate_left(33);
        k2 = k2.wrapping_mul(C1);
        h2 ^= k2;
        h2 = h2.rotate_left(31);
        h2 = h2.wrapping_add(h1);
        h2 = h2.wrapping_mul(5).wrapping_add(0x38495ab5);
    }

    let mut k1 = 0u64;
    let mut k2 = 0u64;
    for (i, &b) in tail.iter().enumerate().rev() {
        if i >= 8 {
            k2 ^= (b as u64) << (8 * (i - 8));
        } else {
            k1 ^= (b as u64) << (8 * i);
        }
    }
    if tail.len() > 8 {
        k2 = k2.wrapping_mul(C2);
        k2 = k2.rotate_left(33);
        k2 = k2.wrapping_mul(C1);
        h2 ^= k2;
    }
    if !tail.is_empty() {
        k1 = k1.wrapping_mul(C1);
        k1 = k1.rotate_left(31);
        k1 = k1.wrapping_mul(C2);
        h1 ^= k1;
    }

    h1 ^= data.len() as u64;
    h2 ^= data.len() as u64;

    h1 = h1.wrapping_add(h2);
    h2 = h2.wrapping_add(h1);
    h1 = fmix64(h1);
    h2 = fmix64(h2);
    h1 = h1.wrapping_add(h2);

    h1
}

fn fmix64(mut h: u64) -> u64 {
    h ^= h >> 33;
    h = h.wrapping_mul(0xff51afd7ed558ccd);
    h ^= h >> 33;
    h = h.wrapping_mul(0xc4ceb9fe1a85ec53);
    h ^= h >> 33;
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn determine_parameters_matches_reference() {
        let (m, k) = BloomFilter::determine_parameters(1000, 0.001);
        assert_eq!((m, k), (14378, 10));
    }

    #[test]
    fn no_false_negatives() {
        let mut bf = BloomFilter::new(1024, 8);
        let elems: Vec<Vec<u8>> = (0..20u32).map(|i| i.to_be_bytes().to_vec()).collect();
        for e in &elems {
            bf.add(e);
        }
        for e in &elems {
            assert!(bf.contains(e));
        }
    }

    #[test]
    fn weight_of_empty_is_zero() {
        let bf = BloomFilter::new(256, 4);
        assert_eq!(bf.weight(), 0);
    }

    #[test]
    fn weight_bounded_by_n_times_k() {
        let mut bf = BloomFilter::new(4096, 6);
        for i in 0..30u32 {
            bf.add(&i.to_be_bytes());
        }
        assert!(bf.weight() <= 30 * 6);
    }

    #[test]
    fn union_dominates_contains() {
        let mut a = BloomFilter::new(512, 5);
        let mut b = BloomFilter::new(512, 5);
        a.add(b"only-in-a");
        b.add(b"only-in-b");
        let u = a.union(&b).unwrap();
        assert!(u.contains(b"only-in-a"));
        assert!(u.contains(b"only-in-b"));
    }

    #[test]
    fn mismatched_parameters_error() {
        let a = BloomFilter::new(512, 5);
        let b = BloomFilter::new(256, 5);
        assert!(a.union(&b).is_err());
        assert!(a.intersection(&b).is_err());
    }

    #[test]
    fn set_bit_can_clear_unlike_reference_setitem() {
        let mut bf = BloomFilter::new(64, 4);
        bf.set_bit(3, true);
        assert!(bf.bit(3));
        bf.set_bit(3, false);
        assert!(!bf.bit(3));
    }
}
