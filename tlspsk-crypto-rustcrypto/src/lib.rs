//! # RustCrypto-based provider for tlspsk
//!
//! Implements [`tlspsk_crypto::CryptoProvider`] on top of the RustCrypto
//! crates (`sha2`, `hmac`, `hkdf`, `aes-gcm`) with the operating system RNG
//! from `rand`.
//!
//! ## Supported Algorithms
//!
//! - **Hash / HMAC / HKDF**: SHA-256, SHA-384
//! - **Ticket AEAD**: AES-256-GCM
//! - **RNG**: `OsRng`
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use tlspsk_crypto::CryptoProvider;
//! use tlspsk_crypto_rustcrypto::RustCryptoProvider;
//!
//! let provider = RustCryptoProvider::new();
//! ```

#![deny(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    unused_qualifications,
    missing_debug_implementations
)]

use tlspsk_crypto::{
    Aead, AeadAlgorithm, CryptoProvider, Hash, HashAlgorithm, Hmac, Kdf, Random, Result,
};

pub mod aead;
pub mod hash;
pub mod hkdf;
pub mod hmac;
pub mod random;

use random::OsRandom;

/// Cryptography provider using the RustCrypto implementations.
///
/// # Thread Safety
///
/// This provider is `Send + Sync` and can be safely shared across threads.
#[derive(Debug, Clone, Copy)]
pub struct RustCryptoProvider {
    random: OsRandom,
}

impl Default for RustCryptoProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CryptoProvider for RustCryptoProvider {
    fn new() -> Self {
        Self { random: OsRandom }
    }

    fn aead(&self, algorithm: AeadAlgorithm) -> Result<Box<dyn Aead>> {
        aead::create_aead(algorithm)
    }

    fn hash(&self, algorithm: HashAlgorithm) -> Result<Box<dyn Hash>> {
        hash::create_hash(algorithm)
    }

    fn hmac(&self, algorithm: HashAlgorithm, key: &[u8]) -> Result<Box<dyn Hmac>> {
        hmac::create_hmac(algorithm, key)
    }

    fn kdf(&self, algorithm: HashAlgorithm) -> Result<Box<dyn Kdf>> {
        hkdf::create_kdf(algorithm)
    }

    fn random(&self) -> &dyn Random {
        &self.random
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_covers_both_tls13_hashes() {
        let provider = RustCryptoProvider::new();
        for alg in [HashAlgorithm::Sha256, HashAlgorithm::Sha384] {
            assert!(provider.hash(alg).is_ok(), "{}", alg.name());
            assert!(provider.hmac(alg, b"key").is_ok());
            assert_eq!(provider.kdf(alg).unwrap().hash_output_size(), alg.output_size());
        }
        assert!(provider.aead(AeadAlgorithm::Aes256Gcm).is_ok());
    }
}
