//! Hashes a PSK can be bound to.

/// Hash function of a PSK, its binder and the HKDF that derives from it.
///
/// TLS 1.3 only defines cipher suites over SHA-256 and SHA-384.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    /// SHA-256 (32 bytes output)
    Sha256,
    /// SHA-384 (48 bytes output)
    Sha384,
}

impl HashAlgorithm {
    /// Digest length in bytes; also the length of every binder and secret.
    pub const fn output_size(self) -> usize {
        match self {
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
        }
    }

    /// Name for log lines.
    pub const fn name(self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "SHA256",
            HashAlgorithm::Sha384 => "SHA384",
        }
    }

    /// Wire identifier used inside encrypted session tickets.
    pub const fn to_u8(self) -> u8 {
        match self {
            HashAlgorithm::Sha256 => 4,
            HashAlgorithm::Sha384 => 5,
        }
    }

    /// Inverse of [`HashAlgorithm::to_u8`].
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            4 => Some(HashAlgorithm::Sha256),
            5 => Some(HashAlgorithm::Sha384),
            _ => None,
        }
    }
}

/// Incremental hash, used for the transcript and the binder's truncated
/// ClientHello.
pub trait Hash: Send {
    /// Feed more data.
    fn update(&mut self, data: &[u8]);

    /// Consume the state and return the digest.
    fn finalize(self: Box<Self>) -> Vec<u8>;
}
