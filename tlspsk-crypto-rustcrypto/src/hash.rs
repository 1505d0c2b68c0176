//! SHA-2 hash functions.

use sha2::{Digest, Sha256, Sha384};
use tlspsk_crypto::{Hash, HashAlgorithm, Result};

/// Create a hash instance for the specified algorithm.
pub fn create_hash(algorithm: HashAlgorithm) -> Result<Box<dyn Hash>> {
    match algorithm {
        HashAlgorithm::Sha256 => Ok(Box::new(Sha2Hash(Sha256::new()))),
        HashAlgorithm::Sha384 => Ok(Box::new(Sha2Hash(Sha384::new()))),
    }
}

#[derive(Debug, Clone)]
struct Sha2Hash<D>(D);

impl<D: Digest + Send> Hash for Sha2Hash<D> {
    fn update(&mut self, data: &[u8]) {
        Digest::update(&mut self.0, data);
    }

    fn finalize(self: Box<Self>) -> Vec<u8> {
        self.0.finalize().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_empty() {
        let hash = create_hash(HashAlgorithm::Sha256).unwrap();
        assert_eq!(
            hex::encode(hash.finalize()),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        for alg in [HashAlgorithm::Sha256, HashAlgorithm::Sha384] {
            let mut a = create_hash(alg).unwrap();
            a.update(b"hello ");
            a.update(b"world");
            let mut b = create_hash(alg).unwrap();
            b.update(b"hello world");
            let (a, b) = (a.finalize(), b.finalize());
            assert_eq!(a, b);
            assert_eq!(a.len(), alg.output_size());
        }
    }
}
