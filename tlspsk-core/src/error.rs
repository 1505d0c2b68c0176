//! Error types for the PSK extension subsystem.

use core::fmt;

/// Result type for PSK operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors that can occur while building or processing the PSK extension.
///
/// Soft outcomes (stale tickets, unknown identities, nothing to offer) are
/// not errors; they surface as [`crate::ExtensionOutcome::NotApplicable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A credential set cannot be used, e.g. it has no binder hash configured
    /// or the server has no credential store for an external identity.
    InsufficientCredentials(String),

    /// Invalid configuration
    InvalidConfig(String),

    /// An external PSK identity is empty or longer than 65535 bytes.
    InvalidIdentity(usize),

    /// Malformed extension contents or inconsistent lengths.
    IllegalParameter(String),

    /// The extension arrived in a context where it is not allowed.
    IllegalExtension(String),

    /// The extension payload could not be parsed.
    DecodeError(String),

    /// A received binder did not match the recomputed value.
    BinderMismatch,

    /// Key derivation could not produce a binder key.
    DerivationError(String),

    /// Buffer allocation failed while growing the outgoing message.
    MemoryError,

    /// Cryptographic provider failure
    CryptoError(String),

    /// Internal error
    InternalError(String),
}

impl Error {
    /// Alert the enclosing handshake should send for this error.
    pub fn alert(&self) -> AlertDescription {
        match self {
            Error::IllegalParameter(_) | Error::BinderMismatch => {
                AlertDescription::IllegalParameter
            },
            Error::IllegalExtension(_) => AlertDescription::UnsupportedExtension,
            Error::DecodeError(_) => AlertDescription::DecodeError,
            Error::InsufficientCredentials(_) | Error::InvalidIdentity(_) => {
                AlertDescription::HandshakeFailure
            },
            Error::InvalidConfig(_)
            | Error::DerivationError(_)
            | Error::MemoryError
            | Error::CryptoError(_)
            | Error::InternalError(_) => AlertDescription::InternalError,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InsufficientCredentials(msg) => write!(f, "Insufficient credentials: {}", msg),
            Error::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            Error::InvalidIdentity(len) => {
                write!(f, "Invalid PSK identity length: {} bytes", len)
            },
            Error::IllegalParameter(msg) => write!(f, "Illegal parameter: {}", msg),
            Error::IllegalExtension(msg) => write!(f, "Illegal extension: {}", msg),
            Error::DecodeError(msg) => write!(f, "Decode error: {}", msg),
            Error::BinderMismatch => write!(f, "PSK binder verification failed"),
            Error::DerivationError(msg) => write!(f, "Key derivation error: {}", msg),
            Error::MemoryError => write!(f, "Memory allocation failed"),
            Error::CryptoError(msg) => write!(f, "Cryptographic error: {}", msg),
            Error::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<tlspsk_crypto::Error> for Error {
    fn from(e: tlspsk_crypto::Error) -> Self {
        Error::CryptoError(e.to_string())
    }
}

impl From<std::collections::TryReserveError> for Error {
    fn from(_: std::collections::TryReserveError) -> Self {
        Error::MemoryError
    }
}

/// TLS alert descriptions (RFC 8446 Section 6) raised by this subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AlertDescription {
    /// Handshake failure
    HandshakeFailure = 40,
    /// Illegal parameter
    IllegalParameter = 47,
    /// Decode error
    DecodeError = 50,
    /// Internal error
    InternalError = 80,
    /// Unsupported extension
    UnsupportedExtension = 110,
}

impl AlertDescription {
    /// Convert to u8.
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}
