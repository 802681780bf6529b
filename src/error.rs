//! Error types shared by every NI-PSI scheme.

use thiserror::Error;

/// Everything that can go wrong inside a scheme's `setup`/`encrypt`/`eval`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A ciphertext, key, or wire value failed to deserialize: bad length,
    /// bad encoding, or a curve point not actually on the curve.
    #[error("malformed ciphertext: {0}")]
    MalformedCiphertext(String),

    /// Two containers that must share parameters (e.g. two Bloom filters,
    /// or the ciphertext sets handed to `eval`) do not.
    #[error("parameter mismatch: {0}")]
    ParameterMismatch(String),

    /// AEAD tag verification failed: tampered or wrong-key ciphertext.
    #[error("AEAD authentication failed")]
    AuthFail,

    /// A caller-supplied argument violates a precondition (secpar not a
    /// multiple of 8, threshold of zero, empty input where non-empty is
    /// required, and so on).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Convenience alias for `Result<T, Error>`.
pub type Result<T> = core::result::Result<T, Error>;
