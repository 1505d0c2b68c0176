//! # tlspsk cryptographic provider interface
//!
//! The primitives the TLS 1.3 pre-shared-key machinery needs, behind one
//! object-safe [`CryptoProvider`]. Concrete backends live in their own
//! crates.
//!
//! ```text
//! CryptoProvider
//! ├── Kdf     HKDF extract / expand (early secret, binder key)
//! ├── Hmac    binder MAC
//! ├── Hash    transcript hash (SHA-256, SHA-384)
//! ├── Aead    session ticket sealing (AES-256-GCM)
//! └── Random  ticket keys, nonces, age_add
//! ```
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use tlspsk_crypto::{CryptoProvider, HashAlgorithm};
//!
//! let provider = SomeProvider::new();
//! let kdf = provider.kdf(HashAlgorithm::Sha256)?;
//! let early_secret = kdf.extract(&[0u8; 32], psk);
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    unused_qualifications,
    missing_debug_implementations
)]

pub mod aead;
pub mod error;
pub mod hash;
pub mod hmac;
pub mod kdf;
pub mod random;

pub use aead::{Aead, AeadAlgorithm};
pub use error::{Error, Result};
pub use hash::{Hash, HashAlgorithm};
pub use hmac::Hmac;
pub use kdf::Kdf;
pub use random::Random;

/// The main cryptographic provider trait.
///
/// Providers are shared read-only between independent handshakes, so all
/// implementations must be `Send + Sync`.
pub trait CryptoProvider: Send + Sync + 'static {
    /// Create a new instance of the crypto provider.
    fn new() -> Self
    where
        Self: Sized;

    /// AEAD for sealing session tickets.
    fn aead(&self, algorithm: AeadAlgorithm) -> Result<Box<dyn Aead>>;

    /// Fresh hash state.
    fn hash(&self, algorithm: HashAlgorithm) -> Result<Box<dyn Hash>>;

    /// HMAC keyed with `key`.
    fn hmac(&self, algorithm: HashAlgorithm, key: &[u8]) -> Result<Box<dyn Hmac>>;

    /// HKDF over `algorithm`.
    fn kdf(&self, algorithm: HashAlgorithm) -> Result<Box<dyn Kdf>>;

    /// The random number generator.
    fn random(&self) -> &dyn Random;
}
