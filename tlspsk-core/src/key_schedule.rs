//! TLS 1.3 key-schedule primitives (RFC 8446 Section 7.1).
//!
//! Only the early-secret branch matters for PSK negotiation:
//! ```text
//!              0
//!              |
//!              v
//!   PSK ->  HKDF-Extract = Early Secret
//!              |
//!              +-----> Derive-Secret(., "ext binder" | "res binder", "")
//!              |                     = binder_key
//!              |
//!              +-----> Derive-Secret(., "c e traffic", ClientHello)
//!              |                     = client_early_traffic_secret
//!              |
//!              +-----> Derive-Secret(., "e exp master", ClientHello)
//!              |                     = early_exporter_master_secret
//!              v
//!        Derive-Secret(., "derived", "")
//!              |
//!              v
//!   (EC)DHE -> HKDF-Extract = Handshake Secret
//! ```
//!
//! All functions take the pseudorandom function as a [`HashAlgorithm`] and
//! a `&dyn CryptoProvider`, so PSKs bound to different hashes can coexist in
//! one session.

use crate::binder::BinderMode;
use crate::error::{Error, Result};
use crate::session::BinderSlot;
use tlspsk_crypto::{CryptoProvider, HashAlgorithm, Kdf};
use zeroize::Zeroizing;

const LABEL_PREFIX: &[u8] = b"tls13 ";

fn kdf_for(provider: &dyn CryptoProvider, prf: HashAlgorithm) -> Result<Box<dyn Kdf>> {
    provider
        .kdf(prf)
        .map_err(|e| Error::CryptoError(format!("KDF init failed: {}", e)))
}

/// Output length of `prf` as reported by the provider.
pub fn prf_output_size(provider: &dyn CryptoProvider, prf: HashAlgorithm) -> Result<usize> {
    Ok(kdf_for(provider, prf)?.hash_output_size())
}

/// Encode the `HkdfLabel` structure.
///
/// ```text
/// struct {
///     uint16 length = Length;
///     opaque label<7..255> = "tls13 " + Label;
///     opaque context<0..255> = Context;
/// } HkdfLabel;
/// ```
pub fn hkdf_label(label: &[u8], context: &[u8], length: usize) -> Result<Vec<u8>> {
    let full_label_len = LABEL_PREFIX.len() + label.len();
    if full_label_len > 255 || context.len() > 255 || length > 0xffff {
        return Err(Error::InternalError("HkdfLabel field too long".into()));
    }

    let mut info = Vec::new();
    info.try_reserve_exact(4 + full_label_len + context.len())?;
    info.extend_from_slice(&(length as u16).to_be_bytes());
    info.push(full_label_len as u8);
    info.extend_from_slice(LABEL_PREFIX);
    info.extend_from_slice(label);
    info.push(context.len() as u8);
    info.extend_from_slice(context);
    Ok(info)
}

/// `HKDF-Extract(salt, ikm)`; a missing salt is a string of zeros of the
/// hash length.
pub fn extract(
    provider: &dyn CryptoProvider,
    prf: HashAlgorithm,
    salt: Option<&[u8]>,
    ikm: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    let kdf = kdf_for(provider, prf)?;
    let zeros;
    let salt = match salt {
        Some(s) => s,
        None => {
            zeros = vec![0u8; kdf.hash_output_size()];
            &zeros
        },
    };
    Ok(Zeroizing::new(kdf.extract(salt, ikm)))
}

/// `HKDF-Expand-Label(secret, label, context, length)`.
pub fn expand_label(
    provider: &dyn CryptoProvider,
    prf: HashAlgorithm,
    secret: &[u8],
    label: &[u8],
    context: &[u8],
    length: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    let kdf = kdf_for(provider, prf)?;
    let info = hkdf_label(label, context, length)?;
    kdf.expand(secret, &info, length)
        .map(Zeroizing::new)
        .map_err(|e| Error::CryptoError(format!("HKDF-Expand failed: {}", e)))
}

/// `Hash(messages)`.
pub fn transcript_hash(
    provider: &dyn CryptoProvider,
    prf: HashAlgorithm,
    messages: &[u8],
) -> Result<Vec<u8>> {
    let mut hash = provider.hash(prf)?;
    hash.update(messages);
    Ok(hash.finalize())
}

/// `HKDF-Expand-Label(secret, label, transcript_hash, Hash.length)` for a
/// context that has already been hashed.
pub fn derive_secret_from_hash(
    provider: &dyn CryptoProvider,
    prf: HashAlgorithm,
    secret: &[u8],
    label: &[u8],
    transcript_hash: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    let length = prf_output_size(provider, prf)?;
    expand_label(provider, prf, secret, label, transcript_hash, length)
}

/// `Derive-Secret(secret, label, messages)`.
pub fn derive_secret(
    provider: &dyn CryptoProvider,
    prf: HashAlgorithm,
    secret: &[u8],
    label: &[u8],
    messages: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    let context = transcript_hash(provider, prf, messages)?;
    derive_secret_from_hash(provider, prf, secret, label, &context)
}

/// Finished-MAC over a raw transcript.
///
/// ```text
/// finished_key = HKDF-Expand-Label(base_key, "finished", "", Hash.length)
/// mac          = HMAC(finished_key, Transcript-Hash(transcript))
/// ```
pub fn finished_mac(
    provider: &dyn CryptoProvider,
    prf: HashAlgorithm,
    base_key: &[u8],
    transcript: &[u8],
) -> Result<Vec<u8>> {
    let length = prf_output_size(provider, prf)?;
    let finished_key = expand_label(provider, prf, base_key, b"finished", &[], length)?;
    let hash = transcript_hash(provider, prf, transcript)?;

    let mut hmac = provider.hmac(prf, &finished_key)?;
    hmac.update(&hash);
    Ok(hmac.finalize())
}

/// Early secret of the PSK that won negotiation.
///
/// Built from binder slot 0 once selection is final, this is where the rest
/// of the handshake picks up the PSK.
pub struct EarlySecret {
    prf: HashAlgorithm,
    secret: Zeroizing<Vec<u8>>,
}

impl std::fmt::Debug for EarlySecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EarlySecret")
            .field("prf", &self.prf)
            .finish_non_exhaustive()
    }
}

impl EarlySecret {
    /// `HKDF-Extract(0, psk)`.
    pub fn from_psk(provider: &dyn CryptoProvider, prf: HashAlgorithm, psk: &[u8]) -> Result<Self> {
        Ok(Self {
            prf,
            secret: extract(provider, prf, None, psk)?,
        })
    }

    /// Early secret of a negotiated binder slot.
    pub fn from_slot(provider: &dyn CryptoProvider, slot: &BinderSlot) -> Result<Self> {
        Self::from_psk(provider, slot.prf, &slot.psk)
    }

    /// Early secret when no PSK is in use (all-zero IKM).
    pub fn without_psk(provider: &dyn CryptoProvider, prf: HashAlgorithm) -> Result<Self> {
        let zeros = vec![0u8; prf_output_size(provider, prf)?];
        Self::from_psk(provider, prf, &zeros)
    }

    /// Hash the secret is bound to.
    pub fn prf(&self) -> HashAlgorithm {
        self.prf
    }

    /// Raw early secret.
    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    /// `Derive-Secret(early_secret, label, "")`.
    pub fn derive(&self, provider: &dyn CryptoProvider, label: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        derive_secret(provider, self.prf, &self.secret, label, &[])
    }

    /// Binder key of this PSK for `mode`.
    pub fn binder_key(
        &self,
        provider: &dyn CryptoProvider,
        mode: BinderMode,
    ) -> Result<Zeroizing<Vec<u8>>> {
        self.derive(provider, mode.label())
    }

    /// `client_early_traffic_secret` for 0-RTT data.
    pub fn client_early_traffic_secret(
        &self,
        provider: &dyn CryptoProvider,
        client_hello_hash: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>> {
        derive_secret_from_hash(provider, self.prf, &self.secret, b"c e traffic", client_hello_hash)
    }

    /// `early_exporter_master_secret`.
    pub fn early_exporter_master_secret(
        &self,
        provider: &dyn CryptoProvider,
        client_hello_hash: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>> {
        derive_secret_from_hash(provider, self.prf, &self.secret, b"e exp master", client_hello_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tlspsk_crypto_rustcrypto::RustCryptoProvider;

    #[test]
    fn test_hkdf_label_layout() {
        let info = hkdf_label(b"finished", &[], 32).unwrap();
        assert_eq!(&info[..2], &[0x00, 0x20]);
        assert_eq!(info[2] as usize, b"tls13 finished".len());
        assert_eq!(&info[3..17], b"tls13 finished");
        assert_eq!(info[17], 0);
        assert_eq!(info.len(), 18);
    }

    #[test]
    fn test_hkdf_label_rejects_long_context() {
        assert!(hkdf_label(b"x", &[0u8; 256], 32).is_err());
    }

    #[test]
    fn test_early_secret_without_psk_rfc8448() {
        let provider = RustCryptoProvider::new();
        let early = EarlySecret::without_psk(&provider, HashAlgorithm::Sha256).unwrap();
        assert_eq!(
            hex::encode(early.secret()),
            "33ad0a1c607ec03b09e6cd9893680ce210adf300aa1f2660e1b22e10f170f92a"
        );
    }

    #[test]
    fn test_binder_key_matches_binder_module() {
        let provider = RustCryptoProvider::new();
        let prf = HashAlgorithm::Sha256;
        let psk = [9u8; 32];
        let early = EarlySecret::from_psk(&provider, prf, &psk).unwrap();
        for mode in [BinderMode::Resumption, BinderMode::External] {
            assert_eq!(
                *early.binder_key(&provider, mode).unwrap(),
                *crate::binder::derive_binder_key(&provider, prf, &psk, mode).unwrap()
            );
        }
    }

    #[test]
    fn test_finished_mac_is_hash_sized() {
        let provider = RustCryptoProvider::new();
        for prf in [HashAlgorithm::Sha256, HashAlgorithm::Sha384] {
            let key = vec![1u8; prf.output_size()];
            let mac = finished_mac(&provider, prf, &key, b"transcript").unwrap();
            assert_eq!(mac.len(), prf.output_size());
        }
    }

    #[test]
    fn test_derive_secret_hashes_messages() {
        let provider = RustCryptoProvider::new();
        let prf = HashAlgorithm::Sha256;
        let secret = [3u8; 32];
        let hash = transcript_hash(&provider, prf, b"hello").unwrap();
        assert_eq!(
            *derive_secret(&provider, prf, &secret, b"label", b"hello").unwrap(),
            *derive_secret_from_hash(&provider, prf, &secret, b"label", &hash).unwrap()
        );
    }
}
