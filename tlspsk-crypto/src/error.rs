//! Provider error type.

use std::fmt;

/// Result type for provider operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures a provider reports back to the PSK core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The provider has no implementation of this algorithm.
    Unsupported(&'static str),

    /// A ticket key or HKDF pseudorandom key has the wrong length.
    InvalidKeyLength {
        /// Length the algorithm requires
        expected: usize,
        /// Length that was passed in
        actual: usize,
    },

    /// A ticket nonce has the wrong length.
    InvalidNonceLength {
        /// Length the algorithm requires
        expected: usize,
        /// Length that was passed in
        actual: usize,
    },

    /// HKDF-Expand was asked for more than 255 hash blocks.
    OutputTooLong(usize),

    /// The ticket plaintext could not be sealed.
    SealFailed,

    /// A sealed ticket failed authentication.
    AuthenticationFailed,

    /// The operating system RNG is unavailable.
    RandomUnavailable,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Unsupported(alg) => write!(f, "{} not supported by provider", alg),
            Error::InvalidKeyLength { expected, actual } => {
                write!(f, "key length {} (expected {})", actual, expected)
            },
            Error::InvalidNonceLength { expected, actual } => {
                write!(f, "nonce length {} (expected {})", actual, expected)
            },
            Error::OutputTooLong(len) => write!(f, "HKDF output of {} bytes too long", len),
            Error::SealFailed => write!(f, "ticket sealing failed"),
            Error::AuthenticationFailed => write!(f, "ticket authentication failed"),
            Error::RandomUnavailable => write!(f, "OS random generator unavailable"),
        }
    }
}

impl std::error::Error for Error {}
