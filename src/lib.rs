#![warn(missing_docs)]

//! Non-interactive private set intersection under functional-encryption-style
//! key distribution.
//!
//! A trusted setup authority issues per-client user secret keys via each
//! scheme's `setup`. Clients independently `encrypt` a set under a shared
//! group identifier (`gid`); any party holding every client's ciphertext for
//! that `gid` can `eval` the scheme's fixed functionality and learns nothing
//! else. Five schemes are provided, each with a different functionality and
//! trust model: see [`scheme`].
#![doc = document_features::document_features!()]

pub mod aead;
pub mod bloom;
pub mod error;
pub mod group;
pub mod prf;
pub mod scheme;

pub use bloom::BloomFilter;
pub use error::{Error, Result};
pub use group::GroupOps;
pub use scheme::{
    MultiClientCardinality, MultiClientCardinalityEfficient, TwoClientCardinality,
    TwoClientIntersection, TwoClientThreshold,
};
