//! HKDF built on the `hkdf` crate.

use hkdf::SimpleHkdf;
use sha2::{Sha256, Sha384};
use tlspsk_crypto::{Error, HashAlgorithm, Kdf, Result};

/// Create an HKDF instance over `algorithm`.
pub fn create_kdf(algorithm: HashAlgorithm) -> Result<Box<dyn Kdf>> {
    match algorithm {
        HashAlgorithm::Sha256 => Ok(Box::new(HkdfSha256Impl)),
        HashAlgorithm::Sha384 => Ok(Box::new(HkdfSha384Impl)),
    }
}

macro_rules! hkdf_impl {
    ($name:ident, $digest:ty, $alg:expr) => {
        #[derive(Debug, Clone, Copy)]
        struct $name;

        impl Kdf for $name {
            fn extract(&self, salt: &[u8], ikm: &[u8]) -> Vec<u8> {
                let (prk, _) = SimpleHkdf::<$digest>::extract(Some(salt), ikm);
                prk.to_vec()
            }

            fn expand(&self, prk: &[u8], info: &[u8], length: usize) -> Result<Vec<u8>> {
                let hkdf =
                    SimpleHkdf::<$digest>::from_prk(prk).map_err(|_| Error::InvalidKeyLength {
                        expected: self.hash_output_size(),
                        actual: prk.len(),
                    })?;
                let mut output = vec![0u8; length];
                hkdf.expand(info, &mut output)
                    .map_err(|_| Error::OutputTooLong(length))?;
                Ok(output)
            }

            fn hash_output_size(&self) -> usize {
                $alg.output_size()
            }
        }
    };
}

hkdf_impl!(HkdfSha256Impl, Sha256, HashAlgorithm::Sha256);
hkdf_impl!(HkdfSha384Impl, Sha384, HashAlgorithm::Sha384);
