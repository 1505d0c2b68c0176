//! HMAC over SHA-256 and SHA-384.

use hmac::{Mac, SimpleHmac};
use sha2::{Sha256, Sha384};
use tlspsk_crypto::{Error, HashAlgorithm, Hmac, Result};

/// Create an HMAC instance for the specified hash algorithm.
pub fn create_hmac(algorithm: HashAlgorithm, key: &[u8]) -> Result<Box<dyn Hmac>> {
    match algorithm {
        HashAlgorithm::Sha256 => Ok(Box::new(HmacImpl::<Sha256>::new(algorithm, key)?)),
        HashAlgorithm::Sha384 => Ok(Box::new(HmacImpl::<Sha384>::new(algorithm, key)?)),
    }
}

struct HmacImpl<D: sha2::Digest + hmac::digest::core_api::BlockSizeUser>(SimpleHmac<D>);

impl<D> HmacImpl<D>
where
    D: sha2::Digest + hmac::digest::core_api::BlockSizeUser,
{
    fn new(algorithm: HashAlgorithm, key: &[u8]) -> Result<Self> {
        <SimpleHmac<D> as hmac::digest::KeyInit>::new_from_slice(key)
            .map(Self)
            .map_err(|_| Error::InvalidKeyLength {
                expected: algorithm.output_size(),
                actual: key.len(),
            })
    }
}

impl<D> Hmac for HmacImpl<D>
where
    D: sha2::Digest + hmac::digest::core_api::BlockSizeUser + Send,
{
    fn update(&mut self, data: &[u8]) {
        Mac::update(&mut self.0, data);
    }

    fn finalize(self: Box<Self>) -> Vec<u8> {
        self.0.finalize().into_bytes().to_vec()
    }
}
