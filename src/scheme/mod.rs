//! The five NI-PSI schemes, each exposing a uniform `setup` / `encrypt` /
//! `eval` contract but with distinct internal algebra.

pub mod multi_client_cardinality;
pub mod multi_client_cardinality_efficient;
pub mod two_client_cardinality;
pub mod two_client_intersection;
pub mod two_client_threshold;

pub use multi_client_cardinality::MultiClientCardinality;
pub use multi_client_cardinality_efficient::MultiClientCardinalityEfficient;
pub use two_client_cardinality::TwoClientCardinality;
pub use two_client_intersection::TwoClientIntersection;
pub use two_client_threshold::TwoClientThreshold;

use crate::error::{Error, Result};

/// Draws `secpar / 8` bytes from the system CSPRNG. Shared by every
/// scheme's `setup`.
pub(crate) fn random_key(secpar: u32) -> Result<Vec<u8>> {
    if secpar % 8 != 0 {
        return Err(Error::InvalidArgument(format!(
            "secpar must be a multiple of 8, got {secpar}"
        )));
    }
    use rand_core::RngCore;
    let mut key = vec![0u8; (secpar / 8) as usize];
    rand_core::OsRng.fill_bytes(&mut key);
    Ok(key)
}

pub(crate) fn require_non_empty<T>(sets: &[T], what: &str) -> Result<()> {
    if sets.is_empty() {
        return Err(Error::InvalidArgument(format!("{what} must not be empty")));
    }
    Ok(())
}
