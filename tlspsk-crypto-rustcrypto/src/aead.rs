//! AES-256-GCM from `aes-gcm`.

use aes_gcm::aead::{Aead as _, KeyInit, Payload};
use aes_gcm::Aes256Gcm;
use tlspsk_crypto::{Aead, AeadAlgorithm, Error, Result};

/// Create an AEAD instance for the specified algorithm.
pub fn create_aead(algorithm: AeadAlgorithm) -> Result<Box<dyn Aead>> {
    match algorithm {
        AeadAlgorithm::Aes256Gcm => Ok(Box::new(AesGcmTicketCipher)),
    }
}

#[derive(Debug, Clone, Copy)]
struct AesGcmTicketCipher;

impl AesGcmTicketCipher {
    const ALGORITHM: AeadAlgorithm = AeadAlgorithm::Aes256Gcm;

    fn cipher(key: &[u8], nonce: &[u8]) -> Result<Aes256Gcm> {
        if nonce.len() != Self::ALGORITHM.nonce_size() {
            return Err(Error::InvalidNonceLength {
                expected: Self::ALGORITHM.nonce_size(),
                actual: nonce.len(),
            });
        }
        Aes256Gcm::new_from_slice(key).map_err(|_| Error::InvalidKeyLength {
            expected: Self::ALGORITHM.key_size(),
            actual: key.len(),
        })
    }
}

impl Aead for AesGcmTicketCipher {
    fn seal(&self, key: &[u8], nonce: &[u8], aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
        Self::cipher(key, nonce)?
            .encrypt(nonce.into(), Payload { msg: plaintext, aad })
            .map_err(|_| Error::SealFailed)
    }

    fn open(&self, key: &[u8], nonce: &[u8], aad: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
        Self::cipher(key, nonce)?
            .decrypt(nonce.into(), Payload { msg: ciphertext, aad })
            .map_err(|_| Error::AuthenticationFailed)
    }
}
