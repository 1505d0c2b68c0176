//! AEAD interface for sealing session tickets.

use crate::Result;

/// AEAD used to protect tickets issued by this server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AeadAlgorithm {
    /// AES-256-GCM
    Aes256Gcm,
}

impl AeadAlgorithm {
    /// Key size in bytes.
    pub const fn key_size(self) -> usize {
        match self {
            AeadAlgorithm::Aes256Gcm => 32,
        }
    }

    /// Nonce size in bytes.
    pub const fn nonce_size(self) -> usize {
        12
    }

    /// Authentication tag size in bytes.
    pub const fn tag_size(self) -> usize {
        16
    }

    /// Name for log lines.
    pub const fn name(self) -> &'static str {
        match self {
            AeadAlgorithm::Aes256Gcm => "AES-256-GCM",
        }
    }
}

/// One-shot seal/open of a ticket payload.
///
/// A nonce must never repeat under the same ticket key.
pub trait Aead: Send + Sync {
    /// Encrypt `plaintext`; the tag is appended to the returned ciphertext.
    fn seal(&self, key: &[u8], nonce: &[u8], aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Decrypt and authenticate; `AuthenticationFailed` on any mismatch.
    fn open(&self, key: &[u8], nonce: &[u8], aad: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>>;
}
