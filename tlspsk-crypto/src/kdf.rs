//! HKDF interface (RFC 5869).

use crate::Result;

/// HKDF over the hash the provider was asked for.
///
/// The key schedule builds `HKDF-Expand-Label` and `Derive-Secret` on top
/// of these two primitives.
///
/// # Example
///
/// ```rust,no_run
/// use tlspsk_crypto::Kdf;
///
/// fn early_secret(kdf: &dyn Kdf, psk: &[u8]) -> Vec<u8> {
///     let salt = vec![0u8; kdf.hash_output_size()];
///     kdf.extract(&salt, psk)
/// }
/// ```
pub trait Kdf: Send + Sync {
    /// `HKDF-Extract(salt, ikm)`; the result is `hash_output_size` bytes.
    fn extract(&self, salt: &[u8], ikm: &[u8]) -> Vec<u8>;

    /// `HKDF-Expand(prk, info, length)`.
    ///
    /// # Errors
    ///
    /// `OutputTooLong` past 255 hash blocks, `InvalidKeyLength` when `prk`
    /// is shorter than the hash output.
    fn expand(&self, prk: &[u8], info: &[u8], length: usize) -> Result<Vec<u8>>;

    /// Output size of the underlying hash.
    fn hash_output_size(&self) -> usize;
}
